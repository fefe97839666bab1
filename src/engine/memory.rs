use anyhow::anyhow;
use serde_json::{json, Map, Value};

use super::adapter::{DrawMode, DrawPlugin, EventKind, ListenerId, MapEngine};
use crate::geofile::feature::{Feature, FeatureId};
use crate::geometry::bbox::WgsBoundingBox;
use crate::labels::tiers::MAX_ZOOM;
use crate::overlay::descriptor::LayerDescriptor;

/// Headless draw plugin holding features and a selection in memory.
#[derive(Debug)]
pub struct InMemoryDraw {
    features: Vec<Feature>,
    selected: Vec<FeatureId>,
    mode: DrawMode,
    failing: Vec<FeatureId>,
}

impl Default for InMemoryDraw {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            selected: Vec::new(),
            mode: DrawMode::SimpleSelect,
            failing: Vec::new(),
        }
    }
}

impl InMemoryDraw {
    /// Select the given features. Ids that are not present are ignored.
    pub fn select(&mut self, ids: &[FeatureId]) {
        self.selected = ids
            .iter()
            .filter(|id| self.features.iter().any(|feature| &feature.id == *id))
            .cloned()
            .collect();
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    /// Make `add` and `delete` fail for this feature, to exercise error containment.
    pub fn fail_on(&mut self, id: FeatureId) {
        self.failing.push(id);
    }

    fn check(&self, id: &FeatureId) -> anyhow::Result<()> {
        if self.failing.contains(id) {
            return Err(anyhow!("Draw plugin rejected feature {:?}", id));
        }
        Ok(())
    }
}

impl DrawPlugin for InMemoryDraw {
    fn get_all(&self) -> Vec<Feature> {
        self.features.clone()
    }

    fn get(&self, id: &FeatureId) -> Option<Feature> {
        self.features.iter().find(|feature| &feature.id == id).cloned()
    }

    fn set(&mut self, features: &[Feature]) -> anyhow::Result<()> {
        self.features = features.to_vec();
        let features = &self.features;
        self.selected
            .retain(|id| features.iter().any(|feature| &feature.id == id));
        Ok(())
    }

    fn add(&mut self, feature: &Feature) -> anyhow::Result<()> {
        self.check(&feature.id)?;
        match self
            .features
            .iter()
            .position(|stored| stored.id == feature.id)
        {
            Some(index) => self.features[index] = feature.clone(),
            None => self.features.push(feature.clone()),
        }
        Ok(())
    }

    fn delete(&mut self, id: &FeatureId) -> anyhow::Result<()> {
        self.check(id)?;
        self.features.retain(|feature| &feature.id != id);
        self.selected.retain(|selected| selected != id);
        Ok(())
    }

    fn get_selected_ids(&self) -> Vec<FeatureId> {
        self.selected.clone()
    }

    fn change_mode(&mut self, mode: DrawMode) -> anyhow::Result<()> {
        log::debug!("Draw mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        Ok(())
    }
}

/// Headless map engine that records its sources, layer stack, viewport and listeners.
#[derive(Debug)]
pub struct InMemoryMap {
    center: geo::Coord,
    zoom: f64,
    fullscreen: bool,
    sources: Vec<(String, geojson::FeatureCollection)>,
    // Bottom to top.
    layers: Vec<LayerDescriptor>,
    listeners: Vec<(ListenerId, EventKind)>,
    next_listener: ListenerId,
    draw: InMemoryDraw,
}

impl Default for InMemoryMap {
    fn default() -> Self {
        Self {
            center: geo::Coord { x: 0.0, y: 0.0 },
            zoom: 2.0,
            fullscreen: false,
            sources: Vec::new(),
            layers: Vec::new(),
            listeners: Vec::new(),
            next_listener: 0,
            draw: InMemoryDraw::default(),
        }
    }
}

impl InMemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn center(&self) -> geo::Coord {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|layer| layer.id.clone()).collect()
    }

    pub fn layer(&self, id: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn source(&self, id: &str) -> Option<&geojson::FeatureCollection> {
        self.sources
            .iter()
            .find(|(source_id, _)| source_id == id)
            .map(|(_, data)| data)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn layer_index(&self, id: &str) -> anyhow::Result<usize> {
        self.layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or_else(|| anyhow!("No layer {}", id))
    }

    /// Index a layer should be inserted at to end up below `before`, or on top.
    fn insertion_index(&self, before: Option<&str>) -> anyhow::Result<usize> {
        match before {
            Some(before) => self.layer_index(before),
            None => Ok(self.layers.len()),
        }
    }

    /// The rendered overlay state as a MapLibre style document.
    pub fn style_document(&self) -> anyhow::Result<Value> {
        let mut sources = Map::new();
        for (id, data) in self.sources.iter() {
            sources.insert(
                id.clone(),
                json!({
                    "type": "geojson",
                    "data": serde_json::to_value(data)?,
                }),
            );
        }
        Ok(json!({
            "version": 8,
            "center": [self.center.x, self.center.y],
            "zoom": self.zoom,
            "sources": sources,
            "layers": serde_json::to_value(&self.layers)?,
        }))
    }
}

impl MapEngine for InMemoryMap {
    type Draw = InMemoryDraw;

    fn draw(&self) -> &InMemoryDraw {
        &self.draw
    }

    fn draw_mut(&mut self) -> &mut InMemoryDraw {
        &mut self.draw
    }

    fn fly_to(&mut self, center: geo::Coord, zoom: Option<f64>) -> anyhow::Result<()> {
        self.center = center;
        if let Some(zoom) = zoom {
            self.zoom = zoom.clamp(0.0, MAX_ZOOM);
        }
        Ok(())
    }

    fn zoom_in(&mut self) -> anyhow::Result<()> {
        self.zoom = (self.zoom + 1.0).min(MAX_ZOOM);
        Ok(())
    }

    fn zoom_out(&mut self) -> anyhow::Result<()> {
        self.zoom = (self.zoom - 1.0).max(0.0);
        Ok(())
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> anyhow::Result<()> {
        self.fullscreen = fullscreen;
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn fit_bounds(&mut self, bbox: &WgsBoundingBox, padding: f64) -> anyhow::Result<()> {
        self.center = bbox.center();
        // Treat the padding as a fraction of the extent, and cap the zoom for single points.
        let extent = bbox.width().max(bbox.height()) * (1.0 + padding.max(0.0));
        self.zoom = if extent > 0.0 {
            (360.0 / extent).log2().clamp(0.0, 20.0)
        } else {
            20.0
        };
        Ok(())
    }

    fn add_source(&mut self, id: &str, data: geojson::FeatureCollection) -> anyhow::Result<()> {
        if self.has_source(id) {
            return Err(anyhow!("Source {} already exists", id));
        }
        log::debug!("Adding source {} with {} features", id, data.features.len());
        self.sources.push((id.to_string(), data));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> anyhow::Result<()> {
        if self.layers.iter().any(|layer| layer.source == id) {
            return Err(anyhow!("Source {} is still used by a layer", id));
        }
        let index = self
            .sources
            .iter()
            .position(|(source_id, _)| source_id == id)
            .ok_or_else(|| anyhow!("No source {}", id))?;
        self.sources.remove(index);
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.iter().any(|(source_id, _)| source_id == id)
    }

    fn add_layer(&mut self, layer: &LayerDescriptor, before: Option<&str>) -> anyhow::Result<()> {
        if self.has_layer(&layer.id) {
            return Err(anyhow!("Layer {} already exists", layer.id));
        }
        if !self.has_source(&layer.source) {
            return Err(anyhow!(
                "Layer {} refers to missing source {}",
                layer.id,
                layer.source
            ));
        }
        let index = self.insertion_index(before)?;
        log::debug!("Adding layer {} at {}", layer.id, index);
        self.layers.insert(index, layer.clone());
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> anyhow::Result<()> {
        let index = self.layer_index(id)?;
        self.layers.remove(index);
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|layer| layer.id == id)
    }

    fn move_layer(&mut self, id: &str, before: Option<&str>) -> anyhow::Result<()> {
        if before == Some(id) {
            return Ok(());
        }
        let index = self.layer_index(id)?;
        let layer = self.layers.remove(index);
        match self.insertion_index(before) {
            Ok(index) => {
                self.layers.insert(index, layer);
                Ok(())
            }
            Err(err) => {
                self.layers.push(layer);
                Err(err)
            }
        }
    }

    fn subscribe(&mut self, kind: EventKind) -> anyhow::Result<ListenerId> {
        self.next_listener += 1;
        self.listeners.push((self.next_listener, kind));
        Ok(self.next_listener)
    }

    fn unsubscribe(&mut self, listener: ListenerId) -> anyhow::Result<()> {
        let index = self
            .listeners
            .iter()
            .position(|(id, _)| *id == listener)
            .ok_or_else(|| anyhow!("No listener {}", listener))?;
        self.listeners.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geojson::{Geometry, Value};

    use super::{InMemoryDraw, InMemoryMap};
    use crate::engine::adapter::{DrawPlugin, EventKind, MapEngine};
    use crate::geofile::feature::{Feature, FeatureId};
    use crate::overlay::descriptor::LayerDescriptor;

    fn point(id: &str) -> Feature {
        Feature::new(
            FeatureId::String(id.to_string()),
            Geometry::new(Value::Point(vec![1.0, 2.0])),
        )
    }

    fn empty() -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: None,
            features: vec![],
            foreign_members: None,
        }
    }

    fn add_fill(map: &mut InMemoryMap) {
        map.add_source("custom-fill-source", empty()).unwrap();
        map.add_layer(&LayerDescriptor::fill(), None).unwrap();
    }

    #[test]
    fn test_layers_need_their_source() {
        let mut map = InMemoryMap::new();
        assert!(map.add_layer(&LayerDescriptor::fill(), None).is_err());
        add_fill(&mut map);
        assert!(map.add_layer(&LayerDescriptor::fill(), None).is_err());
        assert!(map.remove_source("custom-fill-source").is_err());
        map.remove_layer("custom-fill-layer").unwrap();
        map.remove_source("custom-fill-source").unwrap();
        assert_eq!(0, map.source_count());
    }

    #[test]
    fn test_move_layer() {
        let mut map = InMemoryMap::new();
        add_fill(&mut map);
        map.add_source("custom-stroke-source", empty()).unwrap();
        map.add_layer(&LayerDescriptor::stroke(), None).unwrap();
        assert_eq!(vec!["custom-fill-layer", "custom-stroke-layer"], map.layer_ids());

        map.move_layer("custom-stroke-layer", Some("custom-fill-layer"))
            .unwrap();
        assert_eq!(vec!["custom-stroke-layer", "custom-fill-layer"], map.layer_ids());
        map.move_layer("custom-stroke-layer", None).unwrap();
        assert_eq!(vec!["custom-fill-layer", "custom-stroke-layer"], map.layer_ids());
        assert!(map.move_layer("missing", None).is_err());
        assert!(map.move_layer("custom-fill-layer", Some("missing")).is_err());
        assert_eq!(2, map.layer_ids().len());
    }

    #[test]
    fn test_listeners() {
        let mut map = InMemoryMap::new();
        let first = map.subscribe(EventKind::DrawCreate).unwrap();
        let second = map.subscribe(EventKind::Load).unwrap();
        assert_ne!(first, second);
        map.unsubscribe(first).unwrap();
        assert!(map.unsubscribe(first).is_err());
        assert_eq!(1, map.listener_count());
    }

    #[test]
    fn test_draw_selection_and_failures() {
        let mut draw = InMemoryDraw::default();
        draw.set(&[point("a"), point("b")]).unwrap();
        draw.select(&[
            FeatureId::String("b".to_string()),
            FeatureId::String("missing".to_string()),
        ]);
        assert_eq!(vec![FeatureId::String("b".to_string())], draw.get_selected_ids());

        draw.fail_on(FeatureId::String("a".to_string()));
        assert!(draw.delete(&FeatureId::String("a".to_string())).is_err());
        draw.delete(&FeatureId::String("b".to_string())).unwrap();
        assert!(draw.get_selected_ids().is_empty());
        assert_eq!(vec![point("a")], draw.get_all());
        assert!(draw.get(&FeatureId::String("b".to_string())).is_none());
    }
}
