use crate::crs::crs_utils::{epsg_code_to_authority_string, EpsgCode};
use crate::error::{CaptureError, Result};

use super::{Basemap, ImageSize};

/// Basemap fetched from an OGC Web Map Service with GetMap (WMS 1.3.0).
pub struct WmsBasemap {
    url: String,
    layers: String,
    style: String,
    format: String,
    client: reqwest::blocking::Client,
}

impl WmsBasemap {
    pub fn new(
        url: &str,
        layers: &str,
        style: Option<&str>,
        format: Option<&str>,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("patch-capture")
            .build()
            .map_err(|err| CaptureError::Render(format!("Could not build HTTP client, {}", err)))?;
        Ok(Self {
            url: url.to_string(),
            layers: layers.to_string(),
            style: style.unwrap_or_default().to_string(),
            format: format.unwrap_or("image/png").to_string(),
            client,
        })
    }

    pub fn get_map_url(
        &self,
        extent: &geo::Rect,
        crs: EpsgCode,
        size: ImageSize,
    ) -> Result<reqwest::Url> {
        // WMS 1.3.0 uses the axis order of the CRS, which for projected CRS is x/y.
        let bbox = format!(
            "{},{},{},{}",
            extent.min().x,
            extent.min().y,
            extent.max().x,
            extent.max().y
        );
        reqwest::Url::parse_with_params(
            &self.url,
            &[
                ("SERVICE", "WMS"),
                ("VERSION", "1.3.0"),
                ("REQUEST", "GetMap"),
                ("LAYERS", self.layers.as_str()),
                ("STYLES", self.style.as_str()),
                ("CRS", epsg_code_to_authority_string(crs).as_str()),
                ("BBOX", bbox.as_str()),
                ("WIDTH", size.width.to_string().as_str()),
                ("HEIGHT", size.height.to_string().as_str()),
                ("FORMAT", self.format.as_str()),
                ("TRANSPARENT", "TRUE"),
            ],
        )
        .map_err(|err| CaptureError::Render(format!("Invalid WMS URL '{}', {}", self.url, err)))
    }
}

impl Basemap for WmsBasemap {
    fn name(&self) -> &str {
        &self.layers
    }

    fn render(
        &self,
        extent: &geo::Rect,
        crs: EpsgCode,
        size: ImageSize,
    ) -> Result<image::RgbaImage> {
        let url = self.get_map_url(extent, crs, size)?;
        log::debug!("Requesting {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| CaptureError::Render(format!("WMS request failed, {}", err)))?;
        let bytes = response
            .bytes()
            .map_err(|err| CaptureError::Render(format!("No WMS response body, {}", err)))?;
        let image = image::load_from_memory(&bytes).map_err(|err| {
            CaptureError::Render(format!("Could not decode WMS response, {}", err))
        })?;
        Ok(image.to_rgba8())
    }
}
