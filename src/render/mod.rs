pub mod gdal_raster;
pub mod patch;
pub mod wms;

use serde::Deserialize;

use crate::crs::crs_utils::EpsgCode;
use crate::error::Result;

/// Output image size in pixels.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

/// A layer that can be drawn as the sole content of a map image.
pub trait Basemap {
    fn name(&self) -> &str;

    /// Render the view `extent`, given in `crs`, into an image of exactly `size` pixels.
    /// Blocks until the image is complete.
    fn render(&self, extent: &geo::Rect, crs: EpsgCode, size: ImageSize)
        -> Result<image::RgbaImage>;
}
