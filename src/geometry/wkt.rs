use crate::error::{CaptureError, Result};

/// Serialize a geometry to well-known text, going through WKB into GDAL's OGR geometry.
pub fn geometry_to_wkt(geometry: &geo::Geometry) -> Result<String> {
    let wkb = wkb::geom_to_wkb(geometry).map_err(|err| {
        CaptureError::Geometry(format!("Could not write geometry to WKB, {:?}", err))
    })?;
    let gdal_geometry = gdal::vector::Geometry::from_wkb(&wkb)?;
    Ok(gdal_geometry.wkt()?)
}
