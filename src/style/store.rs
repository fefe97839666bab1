use serde_json::{json, Value};

use super::color::fill_rgb;
use crate::geofile::feature::{keys, Feature, FeatureId};
use crate::geometry::bbox::WgsBoundingBox;

pub const DEFAULT_FILL_OPACITY: f64 = 0.5;
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// Which features a styling change applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// The given features, if they are polygons.
    Selected(Vec<FeatureId>),
    /// Every Polygon and MultiPolygon in the collection.
    AllPolygons,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleChange {
    Fill { color: String, opacity: f64 },
    ClearFill,
    Stroke { color: String, width: f64 },
    ClearStroke,
    /// Empty or whitespace-only text clears the label.
    Label(String),
    ClearLabel,
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

impl StyleChange {
    fn apply_to(&self, feature: &mut Feature) {
        let properties = &mut feature.properties;
        match self {
            StyleChange::Fill { color, opacity } => {
                let opacity = finite_or(*opacity, DEFAULT_FILL_OPACITY).clamp(0.0, 1.0);
                properties.insert(keys::FILL_COLOR.to_string(), json!(color));
                properties.insert(keys::FILL_OPACITY.to_string(), json!(opacity));
                properties.insert(keys::FILL_RGB.to_string(), json!(fill_rgb(color)));
            }
            StyleChange::ClearFill => {
                properties.remove(keys::FILL_COLOR);
                properties.remove(keys::FILL_OPACITY);
                properties.remove(keys::FILL_RGB);
            }
            StyleChange::Stroke { color, width } => {
                let width = finite_or(*width, DEFAULT_STROKE_WIDTH).max(0.0);
                properties.insert(keys::STROKE_COLOR.to_string(), json!(color));
                properties.insert(keys::STROKE_WIDTH.to_string(), json!(width));
            }
            StyleChange::ClearStroke => {
                properties.remove(keys::STROKE_COLOR);
                properties.remove(keys::STROKE_WIDTH);
            }
            StyleChange::Label(text) if !text.trim().is_empty() => {
                properties.insert(keys::LABEL_TEXT.to_string(), json!(text));
            }
            StyleChange::Label(_) | StyleChange::ClearLabel => {
                properties.remove(keys::LABEL_TEXT);
            }
        }
    }
}

/// Owns the feature collection and is the only writer of the reserved styling properties.
#[derive(Debug, Default)]
pub struct FeatureStore {
    features: Vec<Feature>,
    next_id: u64,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.iter().find(|feature| &feature.id == id)
    }

    pub fn bounds(&self) -> Option<WgsBoundingBox> {
        WgsBoundingBox::from_features(&self.features)
    }

    /// A `feature-<n>` id not used by any feature in the store nor listed in `reserved`.
    fn fresh_id(&mut self, reserved: &[FeatureId]) -> FeatureId {
        loop {
            self.next_id += 1;
            let id = FeatureId::String(format!("feature-{}", self.next_id));
            if self.get(&id).is_none() && !reserved.contains(&id) {
                return id;
            }
        }
    }

    /// Apply a styling change and return the ids of the features it was applied to.
    ///
    /// Only polygons qualify. When the returned list is empty nothing was touched.
    pub fn apply(&mut self, target: &Target, change: &StyleChange) -> Vec<FeatureId> {
        let mut affected = Vec::new();
        for feature in self.features.iter_mut() {
            let targeted = match target {
                Target::AllPolygons => true,
                Target::Selected(ids) => ids.contains(&feature.id),
            };
            if !targeted || !feature.is_polygon() {
                continue;
            }
            change.apply_to(feature);
            affected.push(feature.id.clone());
        }
        affected
    }

    /// Bring every `fillRgb` in line with its `fillColor`, and drop it where there is no `fillColor`.
    /// Returns the number of features that changed.
    pub fn refresh_derived(&mut self) -> usize {
        let mut changed = 0;
        for feature in self.features.iter_mut() {
            let expected = feature.property_str(keys::FILL_COLOR).map(fill_rgb);
            let current = feature.properties.get(keys::FILL_RGB);
            match expected {
                Some(rgb) if current.and_then(Value::as_str) != Some(rgb.as_str()) => {
                    feature
                        .properties
                        .insert(keys::FILL_RGB.to_string(), json!(rgb));
                    changed += 1;
                }
                None if current.is_some() => {
                    feature.properties.remove(keys::FILL_RGB);
                    changed += 1;
                }
                _ => {}
            }
        }
        if changed > 0 {
            log::debug!("Refreshed fillRgb on {} features", changed);
        }
        changed
    }

    /// Insert a new feature or replace the one with the same id.
    ///
    /// Styling properties already stored for the feature survive when the incoming version does not carry them,
    /// since the draw plugin only round-trips geometry.
    pub fn upsert(&mut self, mut feature: Feature) {
        match self
            .features
            .iter()
            .position(|stored| stored.id == feature.id)
        {
            Some(index) => {
                let stored = &self.features[index];
                for key in keys::RESERVED {
                    if feature.properties.contains_key(key) {
                        continue;
                    }
                    if let Some(value) = stored.properties.get(key) {
                        feature.properties.insert(key.to_string(), value.clone());
                    }
                }
                self.features[index] = feature;
            }
            None => self.features.push(feature),
        }
    }

    pub fn remove(&mut self, id: &FeatureId) -> Option<Feature> {
        let index = self.features.iter().position(|feature| &feature.id == id)?;
        Some(self.features.remove(index))
    }

    /// Replace the whole collection. The first feature carrying an id keeps it. Features without an id, or repeating
    /// an id seen earlier in the input, get a fresh one that no input feature claims.
    pub fn replace_all(&mut self, features: Vec<geojson::Feature>) {
        self.features.clear();
        let mut claimed: Vec<FeatureId> = Vec::new();
        let kept: Vec<Option<FeatureId>> = features
            .iter()
            .map(|feature| match &feature.id {
                Some(id) if !claimed.contains(id) => {
                    claimed.push(id.clone());
                    Some(id.clone())
                }
                Some(id) => {
                    log::warn!("Duplicate feature id {:?}, assigning a new one", id);
                    None
                }
                None => None,
            })
            .collect();

        for (geojson_feature, id) in features.into_iter().zip(kept) {
            let id = match id {
                Some(id) => id,
                None => self.fresh_id(&claimed),
            };
            let feature = Feature::from_geojson(
                geojson::Feature {
                    id: None,
                    ..geojson_feature
                },
                id,
            );
            self.features.push(feature);
        }
    }

    pub fn clear(&mut self) {
        self.features.clear();
    }
}
