use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::geofile::feature::keys;
use crate::labels::tiers::TierSample;
use crate::style::store::{DEFAULT_FILL_OPACITY, DEFAULT_STROKE_WIDTH};

pub const FILL_SOURCE: &str = "custom-fill-source";
pub const FILL_LAYER: &str = "custom-fill-layer";
pub const STROKE_SOURCE: &str = "custom-stroke-source";
pub const STROKE_LAYER: &str = "custom-stroke-layer";
pub const TEXT_SOURCE: &str = "custom-text-source";
pub const TEXT_LAYER: &str = "custom-text-layer";

pub const DEFAULT_STROKE_COLOR: &str = "#3388ff";

/// Property names carried by coordinate-label points.
pub const LABEL_PROPERTY: &str = "label";
pub const ANGLE_PROPERTY: &str = "angle";

pub fn coordinate_source_id(tier_index: usize) -> String {
    format!("coordinate-labels-source-{}", tier_index)
}

pub fn coordinate_layer_id(tier_index: usize) -> String {
    format!("coordinate-labels-layer-{}", tier_index)
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Fill,
    Line,
    Symbol,
}

/// A renderable layer, serialized the way MapLibre style documents spell it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub source: String,
    #[serde(rename = "minzoom", skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<f64>,
    #[serde(rename = "maxzoom", skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<f64>,
    pub layout: Map<String, Value>,
    pub paint: Map<String, Value>,
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl LayerDescriptor {
    pub fn fill() -> Self {
        Self {
            id: FILL_LAYER.to_string(),
            kind: LayerKind::Fill,
            source: FILL_SOURCE.to_string(),
            min_zoom: None,
            max_zoom: None,
            layout: Map::new(),
            paint: object(json!({
                "fill-color": ["get", keys::FILL_COLOR],
                "fill-opacity": ["coalesce", ["get", keys::FILL_OPACITY], DEFAULT_FILL_OPACITY],
            })),
        }
    }

    pub fn stroke() -> Self {
        Self {
            id: STROKE_LAYER.to_string(),
            kind: LayerKind::Line,
            source: STROKE_SOURCE.to_string(),
            min_zoom: None,
            max_zoom: None,
            layout: object(json!({
                "line-join": "round",
                "line-cap": "round",
            })),
            paint: object(json!({
                "line-color": ["coalesce", ["get", keys::STROKE_COLOR], DEFAULT_STROKE_COLOR],
                "line-width": ["coalesce", ["get", keys::STROKE_WIDTH], DEFAULT_STROKE_WIDTH],
            })),
        }
    }

    pub fn text() -> Self {
        Self {
            id: TEXT_LAYER.to_string(),
            kind: LayerKind::Symbol,
            source: TEXT_SOURCE.to_string(),
            min_zoom: None,
            max_zoom: None,
            layout: object(json!({
                "text-field": ["get", keys::LABEL_TEXT],
                "text-size": 14,
                "text-anchor": "center",
                "text-allow-overlap": true,
            })),
            paint: object(json!({
                "text-color": "#000000",
                "text-halo-color": "#ffffff",
                "text-halo-width": 2,
            })),
        }
    }

    /// Symbol layer for one coordinate-label tier. Text grows linearly across the tier's zoom bracket.
    pub fn coordinate_labels(tier_index: usize, sample: &TierSample) -> Self {
        let (min_size, max_size) = sample.tier.text_size;
        Self {
            id: coordinate_layer_id(tier_index),
            kind: LayerKind::Symbol,
            source: coordinate_source_id(tier_index),
            min_zoom: Some(sample.tier.min_zoom),
            max_zoom: Some(sample.max_zoom),
            layout: object(json!({
                "text-field": ["get", LABEL_PROPERTY],
                "text-size": [
                    "interpolate", ["linear"], ["zoom"],
                    sample.tier.min_zoom, min_size,
                    sample.max_zoom, max_size
                ],
                "text-rotate": ["get", ANGLE_PROPERTY],
                "text-offset": [0, -1],
                "text-allow-overlap": sample.allow_overlap,
                "text-ignore-placement": sample.allow_overlap,
            })),
            paint: object(json!({
                "text-color": "#333333",
                "text-halo-color": "#ffffff",
                "text-halo-width": 1,
            })),
        }
    }
}
