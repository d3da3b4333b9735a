pub mod feature;
pub mod gdal_geofile;
pub mod geojson;

use std::path::Path;

use self::feature::FeatureLayer;

/// Read a vector layer, using the native GeoJSON reader for `.geojson`/`.json` files and GDAL
/// for everything else.
pub fn read_feature_layer(
    filepath: &Path,
    layer_name: Option<&str>,
) -> anyhow::Result<FeatureLayer> {
    let extension = filepath
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase());
    match extension.as_deref() {
        Some("geojson") | Some("json") if layer_name.is_none() => {
            self::geojson::read_features_from_geojson(filepath)
        }
        _ => gdal_geofile::read_features_from_geofile(filepath, layer_name),
    }
}
