use geojson::{Geometry, JsonObject, Value};
use serde_json::json;

use super::descriptor::{
    coordinate_source_id, LayerDescriptor, ANGLE_PROPERTY, FILL_LAYER, FILL_SOURCE,
    LABEL_PROPERTY, STROKE_LAYER, STROKE_SOURCE, TEXT_LAYER, TEXT_SOURCE,
};
use crate::engine::adapter::MapEngine;
use crate::geofile::feature::{keys, Feature};
use crate::geometry::centroid::polygon_centroid;
use crate::labels::tiers::TierSet;
use crate::labels::vertex::extract_vertices;

/// One overlay: a GeoJSON source and the layer drawing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub source_id: String,
    pub data: geojson::FeatureCollection,
    pub layer: LayerDescriptor,
}

impl Overlay {
    pub fn len(&self) -> usize {
        self.data.features.len()
    }
}

/// Every overlay derived from one snapshot of the collection. Empty overlays are omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPlan {
    pub fill: Option<Overlay>,
    pub stroke: Option<Overlay>,
    pub text: Option<Overlay>,
    /// One entry per tier, farthest zoom first.
    pub coordinate_labels: Vec<Option<Overlay>>,
}

impl OverlayPlan {
    /// Overlays in the order they are stacked, bottom to top.
    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        [&self.fill, &self.stroke, &self.text]
            .into_iter()
            .chain(self.coordinate_labels.iter())
            .flatten()
    }
}

/// Counts of what a synchronization pass rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub fill: usize,
    pub stroke: usize,
    pub text: usize,
    pub coordinate_labels: Vec<usize>,
    /// Engine operations that failed and were skipped.
    pub errors: usize,
}

fn collection(features: Vec<geojson::Feature>) -> Option<geojson::FeatureCollection> {
    if features.is_empty() {
        return None;
    }
    Some(features.into_iter().collect())
}

fn point_feature(coord: geo::Coord, properties: JsonObject) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![coord.x, coord.y]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn polygons_with<'a>(
    features: &'a [Feature],
    predicate: impl Fn(&Feature) -> bool + 'a,
) -> impl Iterator<Item = &'a Feature> + 'a {
    features
        .iter()
        .filter(move |feature| feature.is_polygon() && predicate(*feature))
}

/// Derive every overlay from the collection. Does not touch the engine.
pub fn build_overlays(features: &[Feature], tiers: &TierSet) -> OverlayPlan {
    let fill = collection(
        polygons_with(features, |feature| feature.has_property(keys::FILL_COLOR))
            .map(geojson::Feature::from)
            .collect(),
    )
    .map(|data| Overlay {
        source_id: FILL_SOURCE.to_string(),
        data,
        layer: LayerDescriptor::fill(),
    });

    let stroke = collection(
        polygons_with(features, |feature| {
            feature.has_property(keys::STROKE_COLOR) || feature.has_property(keys::STROKE_WIDTH)
        })
        .map(geojson::Feature::from)
        .collect(),
    )
    .map(|data| Overlay {
        source_id: STROKE_SOURCE.to_string(),
        data,
        layer: LayerDescriptor::stroke(),
    });

    let text = collection(
        polygons_with(features, |feature| feature.has_property(keys::LABEL_TEXT))
            .filter_map(|feature| {
                let centroid = polygon_centroid(feature.value()?)?;
                let text = feature.properties.get(keys::LABEL_TEXT)?.clone();
                let mut properties = JsonObject::new();
                properties.insert(keys::LABEL_TEXT.to_string(), text);
                Some(point_feature(centroid, properties))
            })
            .collect(),
    )
    .map(|data| Overlay {
        source_id: TEXT_SOURCE.to_string(),
        data,
        layer: LayerDescriptor::text(),
    });

    let vertices = extract_vertices(features);
    let coordinate_labels = tiers
        .sample(&vertices)
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            collection(
                sample
                    .vertices
                    .iter()
                    .map(|entry| {
                        let mut properties = JsonObject::new();
                        properties.insert(LABEL_PROPERTY.to_string(), json!(entry.label()));
                        properties.insert(ANGLE_PROPERTY.to_string(), json!(entry.angle));
                        point_feature(entry.coordinate, properties)
                    })
                    .collect(),
            )
            .map(|data| Overlay {
                source_id: coordinate_source_id(index),
                data,
                layer: LayerDescriptor::coordinate_labels(index, sample),
            })
        })
        .collect();

    OverlayPlan {
        fill,
        stroke,
        text,
        coordinate_labels,
    }
}

/// Keeps the engine's overlay layers in step with the feature collection.
///
/// Every pass tears down all overlays it knows about and rebuilds them from the snapshot it is given, so the
/// rendered state can never drift from the collection.
#[derive(Debug)]
pub struct LayerSynchronizer {
    tiers: TierSet,
    // (layer id, source id) of everything added by earlier passes, bottom to top.
    installed: Vec<(String, String)>,
}

impl LayerSynchronizer {
    pub fn new(tiers: TierSet) -> Self {
        Self {
            tiers,
            installed: Vec::new(),
        }
    }

    pub fn tiers(&self) -> &TierSet {
        &self.tiers
    }

    pub fn synchronize<M: MapEngine>(
        &mut self,
        engine: &mut M,
        features: &[Feature],
    ) -> SyncReport {
        let plan = build_overlays(features, &self.tiers);
        let mut report = SyncReport {
            fill: plan.fill.as_ref().map_or(0, Overlay::len),
            stroke: plan.stroke.as_ref().map_or(0, Overlay::len),
            text: plan.text.as_ref().map_or(0, Overlay::len),
            coordinate_labels: plan
                .coordinate_labels
                .iter()
                .map(|overlay| overlay.as_ref().map_or(0, Overlay::len))
                .collect(),
            errors: 0,
        };

        report.errors += self.teardown(engine);
        for overlay in plan.overlays() {
            report.errors += install(engine, overlay);
            self.installed
                .push((overlay.layer.id.clone(), overlay.source_id.clone()));
        }
        report.errors += self.assert_z_order(engine, &plan);

        log::debug!("Synchronized overlays: {:?}", report);
        report
    }

    /// Remove every overlay layer and source. Returns the number of engine errors encountered.
    pub fn teardown<M: MapEngine>(&mut self, engine: &mut M) -> usize {
        let mut errors = 0;
        let mut stale = std::mem::take(&mut self.installed);
        // Also catch overlays left behind by another synchronizer on the same engine.
        for (layer_id, source_id) in [
            (FILL_LAYER, FILL_SOURCE),
            (STROKE_LAYER, STROKE_SOURCE),
            (TEXT_LAYER, TEXT_SOURCE),
        ] {
            if !stale.iter().any(|(layer, _)| layer == layer_id) {
                stale.push((layer_id.to_string(), source_id.to_string()));
            }
        }

        for (layer_id, source_id) in stale.iter().rev() {
            if engine.has_layer(layer_id) {
                if let Err(err) = engine.remove_layer(layer_id) {
                    log::warn!("Could not remove layer {}: {:#}", layer_id, err);
                    errors += 1;
                }
            }
            if engine.has_source(source_id) {
                if let Err(err) = engine.remove_source(source_id) {
                    log::warn!("Could not remove source {}: {:#}", source_id, err);
                    errors += 1;
                }
            }
        }
        errors
    }

    /// Stack fill, stroke and text below the coordinate labels, and the coordinate labels on top in tier order.
    fn assert_z_order<M: MapEngine>(&self, engine: &mut M, plan: &OverlayPlan) -> usize {
        let mut errors = 0;
        let label_layers: Vec<&str> = plan
            .coordinate_labels
            .iter()
            .flatten()
            .map(|overlay| overlay.layer.id.as_str())
            .collect();
        for layer_id in label_layers.iter() {
            if let Err(err) = engine.move_layer(layer_id, None) {
                log::warn!("Could not raise layer {}: {:#}", layer_id, err);
                errors += 1;
            }
        }
        let lowest_label = label_layers.first().copied();
        for overlay in [&plan.fill, &plan.stroke, &plan.text].into_iter().flatten() {
            if let Err(err) = engine.move_layer(&overlay.layer.id, lowest_label) {
                log::warn!("Could not lower layer {}: {:#}", overlay.layer.id, err);
                errors += 1;
            }
        }
        errors
    }
}

fn install<M: MapEngine>(engine: &mut M, overlay: &Overlay) -> usize {
    if let Err(err) = engine.add_source(&overlay.source_id, overlay.data.clone()) {
        log::warn!("Could not add source {}: {:#}", overlay.source_id, err);
        return 1;
    }
    if let Err(err) = engine.add_layer(&overlay.layer, None) {
        log::warn!("Could not add layer {}: {:#}", overlay.layer.id, err);
        return 1;
    }
    0
}
