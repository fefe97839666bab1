use std::path::{Path, PathBuf};

use crate::engine::adapter::{DrawMode, DrawPlugin, EngineEvent, EventKind, ListenerId, MapEngine};
use crate::geofile::geojson::{
    read_feature_collection_from_file, to_feature_collection, write_features_to_geojson,
    EXPORT_FILENAME,
};
use crate::labels::tiers::TierSet;
use crate::overlay::sync::{LayerSynchronizer, SyncReport};
use crate::style::store::{FeatureStore, StyleChange, Target};

/// Padding passed to the engine when fitting the view to the drawings.
pub const FIT_PADDING: f64 = 0.1;

const SUBSCRIBED_EVENTS: [EventKind; 6] = [
    EventKind::DrawCreate,
    EventKind::DrawUpdate,
    EventKind::DrawDelete,
    EventKind::DrawSelectionChange,
    EventKind::Load,
    EventKind::Error,
];

/// Result of a command that acts on features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command touched this many features.
    Applied(usize),
    /// No feature qualified. Nothing changed and no overlay was rebuilt.
    NoSelection,
    /// The map is not mounted. Nothing happened.
    NotReady,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub fit_bounds: bool,
}

struct Session<E> {
    engine: E,
    listeners: Vec<ListenerId>,
}

enum SessionState<E> {
    Unmounted,
    Ready(Session<E>),
    Failed(String),
}

/// Command surface of the map.
///
/// Owns the feature collection and drives the engine as a rendering sink: every change goes into the store first,
/// then the draw plugin and the overlays are brought in line with it. Commands issued while the map is not mounted
/// are silent no-ops.
pub struct MapController<E: MapEngine> {
    state: SessionState<E>,
    store: FeatureStore,
    synchronizer: LayerSynchronizer,
    on_error: Option<Box<dyn FnMut(&str)>>,
    last_report: Option<SyncReport>,
    sync_passes: u64,
}

impl<E: MapEngine> MapController<E> {
    pub fn new(tiers: TierSet) -> Self {
        Self {
            state: SessionState::Unmounted,
            store: FeatureStore::new(),
            synchronizer: LayerSynchronizer::new(tiers),
            on_error: None,
            last_report: None,
            sync_passes: 0,
        }
    }

    /// Called once with a message when the engine fails to initialize.
    pub fn with_error_callback(mut self, callback: impl FnMut(&str) + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    pub fn init_error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn engine(&self) -> Option<&E> {
        match &self.state {
            SessionState::Ready(session) => Some(&session.engine),
            _ => None,
        }
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        match &mut self.state {
            SessionState::Ready(session) => Some(&mut session.engine),
            _ => None,
        }
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn last_report(&self) -> Option<&SyncReport> {
        self.last_report.as_ref()
    }

    /// Number of overlay rebuilds so far.
    pub fn sync_passes(&self) -> u64 {
        self.sync_passes
    }

    /// Construct the engine and subscribe to its events.
    ///
    /// A failure is reported once through the error callback and kept as the controller's state. It is not retried.
    pub fn mount(&mut self, init: impl FnOnce() -> anyhow::Result<E>) {
        if self.is_ready() {
            log::warn!("Map is already mounted");
            return;
        }
        let mut engine = match init() {
            Ok(engine) => engine,
            Err(err) => {
                let message = format!("{:#}", err);
                log::error!("Map failed to initialize: {}", message);
                if let Some(callback) = self.on_error.as_mut() {
                    callback(&message);
                }
                self.state = SessionState::Failed(message);
                return;
            }
        };

        let mut listeners = Vec::with_capacity(SUBSCRIBED_EVENTS.len());
        for kind in SUBSCRIBED_EVENTS {
            match engine.subscribe(kind) {
                Ok(listener) => listeners.push(listener),
                Err(err) => log::warn!("Could not subscribe to {:?}: {:#}", kind, err),
            }
        }
        log::info!("Map mounted with {} listeners", listeners.len());
        self.state = SessionState::Ready(Session { engine, listeners });
    }

    /// Remove every overlay and listener, then hand the engine back to be destroyed.
    pub fn unmount(&mut self) -> Option<E> {
        let mut session = match std::mem::replace(&mut self.state, SessionState::Unmounted) {
            SessionState::Ready(session) => session,
            other => {
                self.state = other;
                return None;
            }
        };
        self.synchronizer.teardown(&mut session.engine);
        for listener in session.listeners.drain(..) {
            if let Err(err) = session.engine.unsubscribe(listener) {
                log::warn!("Could not unsubscribe listener {}: {:#}", listener, err);
            }
        }
        log::info!("Map unmounted");
        Some(session.engine)
    }

    /// Handle an event from the engine or its draw plugin.
    pub fn dispatch(&mut self, event: EngineEvent) {
        if !self.is_ready() {
            log::debug!("Ignoring {:?} event, map is not mounted", event.kind());
            return;
        }
        match event {
            EngineEvent::DrawCreate(features) | EngineEvent::DrawUpdate(features) => {
                for feature in features {
                    self.store.upsert(feature);
                }
                self.resync();
            }
            EngineEvent::DrawDelete(features) => {
                for feature in features {
                    self.store.remove(&feature.id);
                }
                self.resync();
            }
            EngineEvent::DrawSelectionChange(ids) => {
                log::debug!("{} features selected", ids.len());
            }
            EngineEvent::Load => self.resync(),
            EngineEvent::Error(message) => log::warn!("Map error: {}", message),
        }
    }

    fn resync(&mut self) {
        let SessionState::Ready(session) = &mut self.state else {
            return;
        };
        self.store.refresh_derived();
        let report = self
            .synchronizer
            .synchronize(&mut session.engine, self.store.features());
        self.sync_passes += 1;
        self.last_report = Some(report);
    }

    fn with_engine(&mut self, command: &str, run: impl FnOnce(&mut E) -> anyhow::Result<()>) {
        match self.engine_mut() {
            Some(engine) => {
                if let Err(err) = run(engine) {
                    log::warn!("{} failed: {:#}", command, err);
                }
            }
            None => log::debug!("Ignoring {}, map is not mounted", command),
        }
    }

    pub fn fly_to(&mut self, lng: f64, lat: f64, zoom: Option<f64>) {
        self.with_engine("fly_to", |engine| {
            engine.fly_to(geo::Coord { x: lng, y: lat }, zoom)
        });
    }

    pub fn zoom_in(&mut self) {
        self.with_engine("zoom_in", |engine| engine.zoom_in());
    }

    pub fn zoom_out(&mut self) {
        self.with_engine("zoom_out", |engine| engine.zoom_out());
    }

    pub fn enter_fullscreen(&mut self) {
        self.with_engine("enter_fullscreen", |engine| engine.set_fullscreen(true));
    }

    pub fn exit_fullscreen(&mut self) {
        self.with_engine("exit_fullscreen", |engine| engine.set_fullscreen(false));
    }

    pub fn toggle_fullscreen(&mut self) {
        self.with_engine("toggle_fullscreen", |engine| {
            let fullscreen = engine.is_fullscreen();
            engine.set_fullscreen(!fullscreen)
        });
    }

    pub fn start_draw_polygon(&mut self) {
        self.with_engine("start_draw_polygon", |engine| {
            engine.draw_mut().change_mode(DrawMode::DrawPolygon)
        });
    }

    /// Fit the view to every drawn coordinate. Does nothing when there are no drawings.
    pub fn fit_to_drawings(&mut self) {
        let Some(bbox) = self.store.bounds() else {
            log::debug!("Nothing to fit, no drawings");
            return;
        };
        self.with_engine("fit_to_drawings", |engine| engine.fit_bounds(&bbox, FIT_PADDING));
    }

    /// The current collection, with styling properties, ready for export.
    pub fn get_draw_data(&self) -> geojson::FeatureCollection {
        to_feature_collection(self.store.features())
    }

    /// Replace the collection with `features`, push it to the draw plugin and rebuild the overlays.
    pub fn load_geojson(
        &mut self,
        features: Vec<geojson::Feature>,
        options: LoadOptions,
    ) -> Outcome {
        if !self.is_ready() {
            log::debug!("Ignoring load_geojson, map is not mounted");
            return Outcome::NotReady;
        }
        self.store.replace_all(features);
        self.store.refresh_derived();
        self.push_to_draw();
        self.resync();
        log::info!("Loaded {} features", self.store.len());
        if options.fit_bounds {
            self.fit_to_drawings();
        }
        Outcome::Applied(self.store.len())
    }

    /// Read, validate and load a GeoJSON file. Invalid files leave the collection untouched.
    pub fn import_file(
        &mut self,
        filepath: &Path,
        options: LoadOptions,
    ) -> anyhow::Result<Outcome> {
        let features = read_feature_collection_from_file(filepath)?;
        Ok(self.load_geojson(features, options))
    }

    /// Write the collection as indented GeoJSON into `output_dir`, returning the file path.
    pub fn export_file(&self, output_dir: &Path) -> anyhow::Result<PathBuf> {
        let filepath = output_dir.join(EXPORT_FILENAME);
        write_features_to_geojson(self.store.features(), &filepath)?;
        Ok(filepath)
    }

    pub fn clear_drawings(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.store.clear();
        self.push_to_draw();
        self.resync();
    }

    fn push_to_draw(&mut self) {
        let features = self.store.features();
        if let SessionState::Ready(session) = &mut self.state {
            if let Err(err) = session.engine.draw_mut().set(features) {
                log::warn!("Could not update draw plugin: {:#}", err);
            }
        }
    }

    /// Delete the features selected in the draw plugin. A feature the plugin refuses to delete is kept, and the
    /// remaining ones are still deleted.
    pub fn delete_selected(&mut self) -> Outcome {
        let SessionState::Ready(session) = &mut self.state else {
            return Outcome::NotReady;
        };
        let selected = session.engine.draw().get_selected_ids();
        if selected.is_empty() {
            return Outcome::NoSelection;
        }
        let mut deleted = 0;
        for id in selected.iter() {
            match session.engine.draw_mut().delete(id) {
                Ok(()) => {
                    self.store.remove(id);
                    deleted += 1;
                }
                Err(err) => log::warn!("Could not delete feature {:?}: {:#}", id, err),
            }
        }
        self.resync();
        Outcome::Applied(deleted)
    }

    fn selected_target(&self) -> Option<Target> {
        self.engine()
            .map(|engine| Target::Selected(engine.draw().get_selected_ids()))
    }

    /// Apply a styling change to the store, mirror the touched features into the draw plugin, and rebuild.
    pub fn apply_style(&mut self, target: &Target, change: &StyleChange) -> Outcome {
        let SessionState::Ready(session) = &mut self.state else {
            return Outcome::NotReady;
        };
        let affected = self.store.apply(target, change);
        if affected.is_empty() {
            log::info!("No polygon qualifies for {:?}", change);
            return Outcome::NoSelection;
        }
        let draw = session.engine.draw_mut();
        for feature in affected.iter().filter_map(|id| self.store.get(id)) {
            if let Err(err) = draw.add(feature) {
                log::warn!("Could not replace feature {:?} in draw plugin: {:#}", feature.id, err);
            }
        }
        self.resync();
        Outcome::Applied(affected.len())
    }

    fn apply_to_selected(&mut self, change: StyleChange) -> Outcome {
        match self.selected_target() {
            Some(target) => self.apply_style(&target, &change),
            None => Outcome::NotReady,
        }
    }

    pub fn change_selected_fill(&mut self, color: &str, opacity: f64) -> Outcome {
        self.apply_to_selected(StyleChange::Fill {
            color: color.to_string(),
            opacity,
        })
    }

    pub fn change_all_fill(&mut self, color: &str, opacity: f64) -> Outcome {
        self.apply_style(
            &Target::AllPolygons,
            &StyleChange::Fill {
                color: color.to_string(),
                opacity,
            },
        )
    }

    pub fn clear_selected_fill(&mut self) -> Outcome {
        self.apply_to_selected(StyleChange::ClearFill)
    }

    pub fn clear_all_fill(&mut self) -> Outcome {
        self.apply_style(&Target::AllPolygons, &StyleChange::ClearFill)
    }

    pub fn change_selected_stroke(&mut self, color: &str, width: f64) -> Outcome {
        self.apply_to_selected(StyleChange::Stroke {
            color: color.to_string(),
            width,
        })
    }

    pub fn change_all_stroke(&mut self, color: &str, width: f64) -> Outcome {
        self.apply_style(
            &Target::AllPolygons,
            &StyleChange::Stroke {
                color: color.to_string(),
                width,
            },
        )
    }

    pub fn clear_selected_stroke(&mut self) -> Outcome {
        self.apply_to_selected(StyleChange::ClearStroke)
    }

    pub fn clear_all_stroke(&mut self) -> Outcome {
        self.apply_style(&Target::AllPolygons, &StyleChange::ClearStroke)
    }

    pub fn set_selected_text(&mut self, text: &str) -> Outcome {
        self.apply_to_selected(StyleChange::Label(text.to_string()))
    }

    pub fn set_all_text(&mut self, text: &str) -> Outcome {
        self.apply_style(&Target::AllPolygons, &StyleChange::Label(text.to_string()))
    }

    pub fn clear_selected_text(&mut self) -> Outcome {
        self.apply_to_selected(StyleChange::ClearLabel)
    }

    pub fn clear_all_text(&mut self) -> Outcome {
        self.apply_style(&Target::AllPolygons, &StyleChange::ClearLabel)
    }
}

impl<E: MapEngine> Drop for MapController<E> {
    fn drop(&mut self) {
        self.unmount();
    }
}
