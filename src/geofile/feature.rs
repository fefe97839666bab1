use geojson::JsonObject;

/// Identifier of a feature, unique within a collection. Either a string or a number, as in GeoJSON.
pub type FeatureId = geojson::feature::Id;

/// Property keys owned by the styling layer. Everything else in a feature's properties is passed through untouched.
pub mod keys {
    pub const FILL_COLOR: &str = "fillColor";
    pub const FILL_OPACITY: &str = "fillOpacity";
    pub const FILL_RGB: &str = "fillRgb";
    pub const STROKE_COLOR: &str = "strokeColor";
    pub const STROKE_WIDTH: &str = "strokeWidth";
    pub const LABEL_TEXT: &str = "labelText";

    pub const RESERVED: [&str; 6] = [
        FILL_COLOR,
        FILL_OPACITY,
        FILL_RGB,
        STROKE_COLOR,
        STROKE_WIDTH,
        LABEL_TEXT,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    // Imported features may carry a null geometry. They are kept but never rendered.
    pub geometry: Option<geojson::Geometry>,
    pub properties: JsonObject,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: geojson::Geometry) -> Self {
        Self {
            id,
            geometry: Some(geometry),
            properties: JsonObject::new(),
        }
    }

    /// Build a feature from its GeoJSON form, using `fallback_id` when the input has no id.
    pub fn from_geojson(feature: geojson::Feature, fallback_id: FeatureId) -> Self {
        Self {
            id: feature.id.unwrap_or(fallback_id),
            geometry: feature.geometry,
            properties: feature.properties.unwrap_or_default(),
        }
    }

    pub fn value(&self) -> Option<&geojson::Value> {
        self.geometry.as_ref().map(|geometry| &geometry.value)
    }

    /// Only Polygon and MultiPolygon features can carry fill, stroke and label styling.
    pub fn is_polygon(&self) -> bool {
        matches!(
            self.value(),
            Some(geojson::Value::Polygon(_)) | Some(geojson::Value::MultiPolygon(_))
        )
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|value| value.as_str())
    }

    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(|value| value.as_f64())
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties
            .get(key)
            .map_or(false, |value| !value.is_null())
    }
}

impl From<Feature> for geojson::Feature {
    fn from(value: Feature) -> Self {
        Self {
            bbox: None,
            geometry: value.geometry,
            id: Some(value.id),
            properties: Some(value.properties),
            foreign_members: None,
        }
    }
}

impl From<&Feature> for geojson::Feature {
    fn from(value: &Feature) -> Self {
        value.clone().into()
    }
}
