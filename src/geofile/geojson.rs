use anyhow::anyhow;
use std::collections::HashSet;
use std::{fs, path::Path};

use crate::crs::crs_utils::WGS84;

use super::feature::{AttributeValue, Attributes, Feature, FeatureLayer};

/// Read a GeoJSON FeatureCollection without going through GDAL.
///
/// GeoJSON coordinates are always WGS84 (RFC 7946). The layer schema is the union of all
/// property names in order of first appearance. Numeric feature ids are kept and must be unique.
/// Features without one are numbered in file order, starting after the largest numeric id.
pub fn read_features_from_geojson(filepath: &Path) -> anyhow::Result<FeatureLayer> {
    let contents = fs::read_to_string(filepath)?;
    let geojson: geojson::GeoJson = contents.parse()?;
    let collection = geojson::FeatureCollection::try_from(geojson)?;

    let mut field_names: Vec<String> = Vec::new();
    let mut features = Vec::with_capacity(collection.features.len());
    let mut explicit_ids = HashSet::new();
    let mut unnumbered = Vec::new();
    for geojson_feature in collection.features {
        let id = match &geojson_feature.id {
            Some(geojson::feature::Id::Number(number)) => {
                let id = number.as_u64().ok_or_else(|| {
                    anyhow!("Feature id {} is not a non-negative integer", number)
                })?;
                if !explicit_ids.insert(id) {
                    return Err(anyhow!("Duplicate feature id {} in {:?}", id, filepath));
                }
                id
            }
            _ => {
                unnumbered.push(features.len());
                0
            }
        };
        let geometry = match geojson_feature.geometry {
            Some(geometry) => Some(geo::Geometry::<f64>::try_from(geometry.value)?),
            None => None,
        };
        let attributes: Attributes = geojson_feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, json_to_attribute(value)))
            .collect();
        for (name, _) in &attributes {
            if !field_names.contains(name) {
                field_names.push(name.clone());
            }
        }
        features.push(Feature {
            id,
            geometry,
            attributes,
        });
    }
    let first_free_id = explicit_ids.iter().max().map_or(0, |id| id + 1);
    for (offset, index) in unnumbered.into_iter().enumerate() {
        features[index].id = first_free_id + offset as u64;
    }
    log::info!("Read {} features from {:?}", features.len(), filepath);
    Ok(FeatureLayer::new(features, WGS84, field_names))
}

fn json_to_attribute(value: serde_json::Value) -> AttributeValue {
    match value {
        serde_json::Value::Null => AttributeValue::Null,
        serde_json::Value::Bool(value) => AttributeValue::Boolean(value),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(value) => AttributeValue::Integer(value),
            None => number
                .as_f64()
                .map_or(AttributeValue::Null, AttributeValue::Real),
        },
        serde_json::Value::String(value) => AttributeValue::String(value),
        other => AttributeValue::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use testdir::testdir;

    use crate::geofile::feature::AttributeValue;

    use super::read_features_from_geojson;

    /// Point features carrying the given `id` members, e.g. `[{"id": 1}, {}]`.
    fn collection_with_ids(ids: &str) -> String {
        let ids: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(ids).unwrap();
        let features: Vec<serde_json::Value> = ids
            .into_iter()
            .map(|mut feature| {
                feature.insert("type".to_string(), "Feature".into());
                feature.insert("properties".to_string(), serde_json::json!({}));
                feature.insert(
                    "geometry".to_string(),
                    serde_json::json!({"type": "Point", "coordinates": [0.0, 0.0]}),
                );
                serde_json::Value::Object(feature)
            })
            .collect();
        serde_json::json!({"type": "FeatureCollection", "features": features}).to_string()
    }

    #[test]
    fn test_read_features_from_geojson() {
        let contents = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": 17,
                    "properties": {"zeta": "first", "alpha": 1},
                    "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}
                },
                {
                    "type": "Feature",
                    "properties": {"alpha": 2.5, "extra": true, "tags": ["a"]},
                    "geometry": null
                }
            ]
        }"#;
        let test_dir = testdir!();
        let filepath = test_dir.join("lines.geojson");
        fs::write(&filepath, contents).unwrap();

        let layer = read_features_from_geojson(&filepath).unwrap();

        assert_eq!(layer.crs, 4326);
        // Property order of the file is kept, new names are appended.
        assert_eq!(layer.field_names, vec!["zeta", "alpha", "extra", "tags"]);

        let first = &layer.features[0];
        assert_eq!(first.id, 17);
        assert!(matches!(first.geometry, Some(geo::Geometry::LineString(_))));
        assert_eq!(first.attribute("alpha"), Some(&AttributeValue::Integer(1)));
        assert_eq!(first.attribute("extra"), Some(&AttributeValue::Null));

        let second = &layer.features[1];
        assert_eq!(second.id, 18);
        assert!(second.geometry.is_none());
        assert_eq!(second.attribute("zeta"), Some(&AttributeValue::Null));
        assert_eq!(second.attribute("alpha"), Some(&AttributeValue::Real(2.5)));
        assert_eq!(second.attribute("extra"), Some(&AttributeValue::Boolean(true)));
        assert_eq!(
            second.attribute("tags"),
            Some(&AttributeValue::String("[\"a\"]".to_string()))
        );
    }

    #[rstest]
    #[case(r#"[{"id": 1}, {}, {}]"#, vec![1, 2, 3])]
    #[case(r#"[{}, {"id": 0}]"#, vec![1, 0])]
    #[case(r#"[{}, {"id": 5}, {}]"#, vec![6, 5, 7])]
    #[case(r#"[{}, {}]"#, vec![0, 1])]
    fn test_fallback_ids_do_not_collide(#[case] ids: &str, #[case] expected: Vec<u64>) {
        let test_dir = testdir!();
        let filepath = test_dir.join("ids.geojson");
        fs::write(&filepath, collection_with_ids(ids)).unwrap();

        let layer = read_features_from_geojson(&filepath).unwrap();

        let ids: Vec<u64> = layer.features.iter().map(|feature| feature.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let test_dir = testdir!();
        let filepath = test_dir.join("ids.geojson");
        fs::write(&filepath, collection_with_ids(r#"[{"id": 3}, {"id": 3}]"#)).unwrap();

        assert!(read_features_from_geojson(&filepath).is_err());
    }

    #[test]
    fn test_rejects_non_collection() {
        let test_dir = testdir!();
        let filepath = test_dir.join("point.geojson");
        fs::write(&filepath, r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#).unwrap();

        assert!(read_features_from_geojson(&filepath).is_err());
    }
}
