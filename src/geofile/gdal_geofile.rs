use anyhow::{anyhow, Context};
use gdal::vector::LayerAccess;
use std::path::Path;

use crate::crs::crs_utils::spatial_ref_to_epsg;

use super::feature::{AttributeValue, Feature, FeatureLayer};

/// Read all features of a layer from a GDAL vector dataset.
///
/// If `layer_name` is not given the dataset must contain exactly one layer. Features without a
/// fid are numbered by their position in the layer.
pub fn read_features_from_geofile(
    filepath: &Path,
    layer_name: Option<&str>,
) -> anyhow::Result<FeatureLayer> {
    gdal::DriverManager::register_all();
    let mut open_options = gdal::DatasetOptions::default();
    open_options.open_flags = gdal::GdalOpenFlags::GDAL_OF_VECTOR;
    let dataset = gdal::Dataset::open_ex(filepath, open_options)
        .with_context(|| format!("Opening vector dataset {:?}", filepath))?;

    let mut layer = match layer_name {
        Some(layer_name) => dataset
            .layer_by_name(layer_name)
            .with_context(|| format!("Layer '{}' not found in {:?}", layer_name, filepath))?,
        None => {
            let layer_count = dataset.layer_count();
            if 0 == layer_count || 1 < layer_count {
                return Err(anyhow!(
                    "Found {} layers, only one layer is supported when no layer name is given.",
                    layer_count
                ));
            }
            dataset.layer(0)?
        }
    };

    let spatial_ref = layer
        .spatial_ref()
        .ok_or_else(|| anyhow!("Layer in {:?} has no spatial reference", filepath))?;
    let crs = spatial_ref_to_epsg(&spatial_ref)?;
    let field_names: Vec<String> = layer.defn().fields().map(|field| field.name()).collect();
    log::debug!(
        "Layer has CRS EPSG:{} and fields {:?}",
        crs,
        field_names
    );

    let mut features = Vec::new();
    for (index, gdal_feature) in layer.features().enumerate() {
        let id = gdal_feature.fid().unwrap_or(index as u64);
        let geometry = read_geometry(&gdal_feature)
            .with_context(|| format!("Reading geometry of feature {}", id))?;
        let attributes = gdal_feature
            .fields()
            .map(|(name, value)| {
                let value = value.map_or(AttributeValue::Null, field_value_to_attribute);
                (name, value)
            })
            .collect();
        features.push(Feature {
            id,
            geometry,
            attributes,
        });
    }
    log::info!("Read {} features from {:?}", features.len(), filepath);
    Ok(FeatureLayer::new(features, crs, field_names))
}

/// Convert the geometry of a GDAL feature to a `geo` geometry. Missing and empty geometries
/// yield `None`.
fn read_geometry(gdal_feature: &gdal::vector::Feature) -> anyhow::Result<Option<geo::Geometry>> {
    let is_empty = unsafe {
        let c_geometry = gdal_sys::OGR_F_GetGeometryRef(gdal_feature.c_feature());
        c_geometry.is_null() || gdal_sys::OGR_G_IsEmpty(c_geometry) != 0
    };
    if is_empty {
        return Ok(None);
    }
    let wkb = gdal_feature.geometry().wkb()?;
    let geometry = wkb::wkb_to_geom(&mut wkb.as_slice())
        .map_err(|err| anyhow!("Could not read geometry from WKB, {:?}", err))?;
    Ok(Some(geometry))
}

fn field_value_to_attribute(value: gdal::vector::FieldValue) -> AttributeValue {
    use gdal::vector::FieldValue::*;
    match value {
        IntegerValue(value) => AttributeValue::Integer(value as i64),
        Integer64Value(value) => AttributeValue::Integer(value),
        RealValue(value) => AttributeValue::Real(value),
        StringValue(value) => AttributeValue::String(value),
        other => other
            .into_string()
            .map_or(AttributeValue::Null, AttributeValue::String),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use testdir::testdir;

    use crate::geofile::feature::AttributeValue;

    use super::read_features_from_geofile;

    const PARCELS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "north", "status": "Active", "area": 12.5},
                "geometry": {"type": "Point", "coordinates": [8.54, 47.37]}
            },
            {
                "type": "Feature",
                "properties": {"name": "south", "status": "closed", "area": 3.0},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_read_features_from_geofile() {
        let test_dir = testdir!();
        let filepath = test_dir.join("parcels.geojson");
        fs::write(&filepath, PARCELS).unwrap();

        let layer = read_features_from_geofile(&filepath, None).unwrap();

        assert_eq!(layer.crs, 4326);
        assert_eq!(layer.field_names, vec!["name", "status", "area"]);
        assert_eq!(layer.features.len(), 2);

        let first = &layer.features[0];
        assert_eq!(
            first.geometry,
            Some(geo::Geometry::Point(geo::Point::new(8.54, 47.37)))
        );
        assert_eq!(
            first.attribute("status"),
            Some(&AttributeValue::String("Active".to_string()))
        );
        assert_eq!(first.attribute("area"), Some(&AttributeValue::Real(12.5)));

        let second = &layer.features[1];
        assert_ne!(first.id, second.id);
        assert!(second.geometry.is_none());
    }

    #[test]
    fn test_missing_layer_name() {
        let test_dir = testdir!();
        let filepath = test_dir.join("parcels.geojson");
        fs::write(&filepath, PARCELS).unwrap();

        assert!(read_features_from_geofile(&filepath, Some("no_such_layer")).is_err());
    }
}
