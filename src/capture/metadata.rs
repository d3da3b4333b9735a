use geo::dimensions::HasDimensions;

use crate::crs::crs_utils::{EpsgCode, WGS84};
use crate::crs::transform::GeometryTransformer;
use crate::error::{CaptureError, Result};
use crate::geofile::feature::{Attributes, Feature};
use crate::geometry::representative::representative_point;
use crate::geometry::wkt::geometry_to_wkt;

/// Location and attributes of one captured feature.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub feature_id: u64,
    /// WGS84 longitude of the representative point, in degrees.
    pub lon: f64,
    /// WGS84 latitude of the representative point, in degrees.
    pub lat: f64,
    pub attributes: Attributes,
    /// WKT of the untransformed feature geometry, if geometries are saved.
    pub geometry: Option<String>,
}

/// Build the metadata row for `feature`.
///
/// Returns `Ok(None)` for features without geometry. `to_wgs84` must transform from the
/// feature's CRS to WGS84.
pub fn extract_metadata(
    feature: &Feature,
    to_wgs84: &GeometryTransformer,
    save_geometry: bool,
) -> Result<Option<MetadataRow>> {
    let geometry = match &feature.geometry {
        Some(geometry) if !geometry.is_empty() => geometry,
        _ => return Ok(None),
    };
    let point = representative_point(geometry).ok_or_else(|| {
        CaptureError::Geometry(format!("No representative point for feature {}", feature.id))
    })?;
    let location = to_wgs84.transform_point(point)?;
    let geometry = if save_geometry {
        Some(geometry_to_wkt(geometry)?)
    } else {
        None
    };
    Ok(Some(MetadataRow {
        feature_id: feature.id,
        lon: location.x(),
        lat: location.y(),
        attributes: feature.attributes.clone(),
        geometry,
    }))
}

/// Accumulates metadata rows over a capture run.
///
/// With `continue_on_error`, a feature whose metadata cannot be derived is logged and skipped
/// so that one malformed feature does not stop the batch. Otherwise the error is returned.
pub struct MetadataCollector {
    to_wgs84: GeometryTransformer,
    save_geometry: bool,
    continue_on_error: bool,
    rows: Vec<MetadataRow>,
    skipped: usize,
}

impl MetadataCollector {
    pub fn new(
        source_crs: EpsgCode,
        save_geometry: bool,
        continue_on_error: bool,
    ) -> Result<Self> {
        Ok(Self {
            to_wgs84: GeometryTransformer::new(source_crs, WGS84)?,
            save_geometry,
            continue_on_error,
            rows: Vec::new(),
            skipped: 0,
        })
    }

    pub fn collect(&mut self, feature: &Feature) -> Result<()> {
        match extract_metadata(feature, &self.to_wgs84, self.save_geometry) {
            Ok(Some(row)) => self.rows.push(row),
            Ok(None) => self.skipped += 1,
            Err(err) if self.continue_on_error => {
                log::warn!("Metadata error on feature {}: {}", feature.id, err);
                self.skipped += 1;
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    pub fn rows(&self) -> &[MetadataRow] {
        &self.rows
    }

    /// Number of features that did not yield a row.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
