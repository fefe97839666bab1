use anyhow::{anyhow, Context};
use std::{fs, path::Path};

use super::feature::Feature;

/// File name offered for exported drawings.
pub const EXPORT_FILENAME: &str = "desenhos.geojson";

pub fn to_feature_collection(features: &[Feature]) -> geojson::FeatureCollection {
    features.iter().map(geojson::Feature::from).collect()
}

/// Parse text into the features of a FeatureCollection.
///
/// The top-level object must have `"type": "FeatureCollection"` and a `features` array. Anything else is rejected
/// as a whole, nothing is partially loaded.
pub fn parse_feature_collection(contents: &str) -> anyhow::Result<Vec<geojson::Feature>> {
    let value: serde_json::Value =
        serde_json::from_str(contents).context("Parsing GeoJSON contents")?;
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("Expected a JSON object at the top level"))?;
    match object.get("type").and_then(|kind| kind.as_str()) {
        Some("FeatureCollection") => {}
        Some(other) => return Err(anyhow!("Expected a FeatureCollection, found {}", other)),
        None => return Err(anyhow!("Missing \"type\" member, expected a FeatureCollection")),
    }
    if !object
        .get("features")
        .map_or(false, |features| features.is_array())
    {
        return Err(anyhow!("FeatureCollection has no \"features\" list"));
    }

    let feature_collection: geojson::FeatureCollection =
        serde_json::from_value(value).context("Decoding FeatureCollection")?;
    Ok(feature_collection.features)
}

pub fn read_feature_collection_from_file(filepath: &Path) -> anyhow::Result<Vec<geojson::Feature>> {
    let contents = fs::read_to_string(filepath)
        .with_context(|| format!("Reading GeoJSON file {:?}", filepath))?;
    let features = parse_feature_collection(&contents)
        .with_context(|| format!("Importing {:?}", filepath))?;
    log::info!("Read {} features from {:?}", features.len(), filepath);
    Ok(features)
}

/// Serialize features as an indented FeatureCollection.
pub fn features_to_geojson_string(features: &[Feature]) -> anyhow::Result<String> {
    serde_json::to_string_pretty(&to_feature_collection(features))
        .context("Serializing FeatureCollection")
}

pub fn write_features_to_geojson(
    features: &[Feature],
    output_filepath: &Path,
) -> anyhow::Result<()> {
    let contents = features_to_geojson_string(features)?;
    fs::write(output_filepath, contents)
        .with_context(|| format!("Writing GeoJSON to {:?}", output_filepath))?;
    log::info!("Wrote {} features to {:?}", features.len(), output_filepath);
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;
    use testdir::testdir;

    use super::{
        parse_feature_collection, read_feature_collection_from_file, write_features_to_geojson,
        EXPORT_FILENAME,
    };
    use crate::geofile::feature::{keys, Feature, FeatureId};

    #[rstest]
    #[case("not json at all")]
    #[case("[1, 2, 3]")]
    #[case(r#"{"type": "Feature", "geometry": null, "properties": {}}"#)]
    #[case(r#"{"features": []}"#)]
    #[case(r#"{"type": "FeatureCollection"}"#)]
    #[case(r#"{"type": "FeatureCollection", "features": {}}"#)]
    fn test_parse_rejects_invalid_input(#[case] contents: &str) {
        assert!(parse_feature_collection(contents).is_err());
    }

    #[test]
    fn test_parse_feature_collection() {
        let contents = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "a",
                "geometry": {"type": "Point", "coordinates": [10.0, 20.0]},
                "properties": {"labelText": "hello"}
            }]
        })
        .to_string();
        let features = parse_feature_collection(&contents).unwrap();
        assert_eq!(1, features.len());
        assert_eq!(
            Some(FeatureId::String("a".to_string())),
            features[0].id.clone()
        );
    }

    #[test]
    fn test_export_import_round_trip_preserves_styling() {
        let mut feature = Feature::new(
            FeatureId::String("lot-1".to_string()),
            geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![-46.633308, -23.55052],
                vec![-46.632, -23.551],
                vec![-46.631, -23.549],
                vec![-46.633308, -23.55052],
            ]])),
        );
        let styling = [
            (keys::FILL_COLOR, json!("#1a2B3c")),
            (keys::FILL_OPACITY, json!(0.35)),
            (keys::FILL_RGB, json!("26,43,60")),
            (keys::STROKE_COLOR, json!("#000000")),
            (keys::STROKE_WIDTH, json!(3)),
            (keys::LABEL_TEXT, json!("Lote 1")),
        ];
        for (key, value) in styling.iter() {
            feature.properties.insert(key.to_string(), value.clone());
        }

        let test_dir = testdir!();
        let filepath = test_dir.join(EXPORT_FILENAME);
        write_features_to_geojson(&[feature.clone()], &filepath).unwrap();

        let features = read_feature_collection_from_file(&filepath).unwrap();
        assert_eq!(1, features.len());
        let properties = features[0].properties.as_ref().unwrap();
        for (key, value) in styling.iter() {
            assert_eq!(Some(value), properties.get(*key), "property {}", key);
        }
        assert_eq!(feature.geometry, features[0].geometry);
    }
}
