use anyhow::anyhow;

pub type EpsgCode = u32;

/// Projected CRS with metric units used for buffering and rendering (Web Mercator).
pub const WEB_MERCATOR: EpsgCode = 3857;

/// Geographic CRS used for the lon/lat columns of the metadata file.
pub const WGS84: EpsgCode = 4326;

pub fn epsg_code_to_authority_string(code: EpsgCode) -> String {
    format!("EPSG:{}", code)
}

/// Resolve the EPSG authority code of a GDAL spatial reference.
pub fn spatial_ref_to_epsg(
    spatial_ref: &gdal::spatial_ref::SpatialRef,
) -> anyhow::Result<EpsgCode> {
    let code = spatial_ref
        .auth_code()
        .map_err(|err| anyhow!("Spatial reference has no EPSG authority code, {}", err))?;
    EpsgCode::try_from(code).map_err(|_| anyhow!("Invalid EPSG code {}", code))
}
