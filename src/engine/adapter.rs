use crate::geofile::feature::{Feature, FeatureId};
use crate::geometry::bbox::WgsBoundingBox;
use crate::overlay::descriptor::LayerDescriptor;

/// Handle returned when subscribing to engine events, used to unsubscribe on teardown.
pub type ListenerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    SimpleSelect,
    DirectSelect,
    DrawPolygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    DrawCreate,
    DrawUpdate,
    DrawDelete,
    DrawSelectionChange,
    Load,
    Error,
}

/// An event delivered by the engine or its draw plugin.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    DrawCreate(Vec<Feature>),
    DrawUpdate(Vec<Feature>),
    DrawDelete(Vec<Feature>),
    DrawSelectionChange(Vec<FeatureId>),
    Load,
    Error(String),
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::DrawCreate(_) => EventKind::DrawCreate,
            EngineEvent::DrawUpdate(_) => EventKind::DrawUpdate,
            EngineEvent::DrawDelete(_) => EventKind::DrawDelete,
            EngineEvent::DrawSelectionChange(_) => EventKind::DrawSelectionChange,
            EngineEvent::Load => EventKind::Load,
            EngineEvent::Error(_) => EventKind::Error,
        }
    }
}

/// Interactive editing surface and its in-memory feature store.
pub trait DrawPlugin {
    fn get_all(&self) -> Vec<Feature>;
    fn get(&self, id: &FeatureId) -> Option<Feature>;
    /// Replace every feature.
    fn set(&mut self, features: &[Feature]) -> anyhow::Result<()>;
    /// Add a feature, replacing the one with the same id if present.
    fn add(&mut self, feature: &Feature) -> anyhow::Result<()>;
    fn delete(&mut self, id: &FeatureId) -> anyhow::Result<()>;
    fn get_selected_ids(&self) -> Vec<FeatureId>;
    fn change_mode(&mut self, mode: DrawMode) -> anyhow::Result<()>;
}

/// The operations the styling core needs from a map engine. Sources and layers are keyed by string ids, and
/// layers are ordered bottom to top.
pub trait MapEngine {
    type Draw: DrawPlugin;

    fn draw(&self) -> &Self::Draw;
    fn draw_mut(&mut self) -> &mut Self::Draw;

    fn fly_to(&mut self, center: geo::Coord, zoom: Option<f64>) -> anyhow::Result<()>;
    fn zoom_in(&mut self) -> anyhow::Result<()>;
    fn zoom_out(&mut self) -> anyhow::Result<()>;
    fn set_fullscreen(&mut self, fullscreen: bool) -> anyhow::Result<()>;
    fn is_fullscreen(&self) -> bool;
    fn fit_bounds(&mut self, bbox: &WgsBoundingBox, padding: f64) -> anyhow::Result<()>;

    fn add_source(&mut self, id: &str, data: geojson::FeatureCollection) -> anyhow::Result<()>;
    fn remove_source(&mut self, id: &str) -> anyhow::Result<()>;
    fn has_source(&self, id: &str) -> bool;

    /// Add a layer below `before`, or on top when `before` is `None`.
    fn add_layer(&mut self, layer: &LayerDescriptor, before: Option<&str>) -> anyhow::Result<()>;
    fn remove_layer(&mut self, id: &str) -> anyhow::Result<()>;
    fn has_layer(&self, id: &str) -> bool;
    /// Move a layer below `before`, or to the top when `before` is `None`.
    fn move_layer(&mut self, id: &str, before: Option<&str>) -> anyhow::Result<()>;

    fn subscribe(&mut self, kind: EventKind) -> anyhow::Result<ListenerId>;
    fn unsubscribe(&mut self, listener: ListenerId) -> anyhow::Result<()>;
}
