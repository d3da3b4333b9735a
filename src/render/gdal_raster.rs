use anyhow::{anyhow, Context};
use std::path::Path;

use crate::crs::crs_utils::{spatial_ref_to_epsg, EpsgCode};
use crate::error::{CaptureError, Result};

use super::{Basemap, ImageSize};

/// Basemap backed by a north-up GDAL raster (e.g. a GeoTIFF of aerial imagery).
///
/// The raster is not warped: it can only be rendered in its own CRS. One band is drawn as gray,
/// two as gray + alpha, three as RGB and four as RGBA. Map areas outside the raster stay
/// transparent.
pub struct GdalRasterBasemap {
    name: String,
    dataset: gdal::Dataset,
    crs: EpsgCode,
    geo_transform: [f64; 6],
    raster_size: (usize, usize),
    band_count: isize,
}

impl GdalRasterBasemap {
    pub fn open(filepath: &Path) -> anyhow::Result<Self> {
        let dataset = gdal::Dataset::open(filepath)
            .with_context(|| format!("Opening basemap raster {:?}", filepath))?;
        let crs = spatial_ref_to_epsg(&dataset.spatial_ref()?)?;
        let geo_transform = dataset.geo_transform()?;
        if geo_transform[2] != 0.0 || geo_transform[4] != 0.0 {
            return Err(anyhow!("Rotated rasters are not supported as basemap"));
        }
        let band_count = dataset.raster_count();
        if band_count < 1 {
            return Err(anyhow!("Basemap raster {:?} has no bands", filepath));
        }
        let raster_size = dataset.raster_size();
        log::info!(
            "Opened basemap {:?}: {}x{} pixels, {} bands, EPSG:{}",
            filepath,
            raster_size.0,
            raster_size.1,
            band_count,
            crs
        );
        Ok(Self {
            name: filepath.display().to_string(),
            dataset,
            crs,
            geo_transform,
            raster_size,
            band_count,
        })
    }

    fn read_band(&self, index: isize, window: &PixelWindow) -> Result<Vec<u8>> {
        let band = self.dataset.rasterband(index)?;
        let buffer = band.read_as::<u8>(
            window.source_offset,
            window.source_size,
            window.buffer_size,
            Some(gdal::raster::ResampleAlg::Bilinear),
        )?;
        Ok(buffer.data)
    }
}

impl Basemap for GdalRasterBasemap {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(
        &self,
        extent: &geo::Rect,
        crs: EpsgCode,
        size: ImageSize,
    ) -> Result<image::RgbaImage> {
        if crs != self.crs {
            return Err(CaptureError::Render(format!(
                "Basemap '{}' is in EPSG:{} and cannot be rendered in EPSG:{}",
                self.name, self.crs, crs
            )));
        }
        let mut image = image::RgbaImage::new(size.width, size.height);
        let window = match pixel_window(&self.geo_transform, self.raster_size, extent, size) {
            Some(window) => window,
            None => {
                log::debug!("Extent {:?} does not overlap basemap '{}'", extent, self.name);
                return Ok(image);
            }
        };

        let bands = (1..=self.band_count.min(4))
            .map(|index| self.read_band(index, &window))
            .collect::<Result<Vec<Vec<u8>>>>()?;

        for y in 0..size.height {
            for x in 0..size.width {
                let i = match window.buffer_index(x, y) {
                    Some(i) => i,
                    None => continue,
                };
                let pixel = match bands.as_slice() {
                    [gray] => [gray[i], gray[i], gray[i], 255],
                    [gray, alpha] => [gray[i], gray[i], gray[i], alpha[i]],
                    [red, green, blue] => [red[i], green[i], blue[i], 255],
                    [red, green, blue, alpha, ..] => [red[i], green[i], blue[i], alpha[i]],
                    [] => [0, 0, 0, 0],
                };
                image.put_pixel(x, y, image::Rgba(pixel));
            }
        }
        Ok(image)
    }
}

/// Part of a raster to read for one map image, and how output pixels sample it.
///
/// The window is read at most at its native resolution. Extents smaller than the raster
/// resolution are upsampled while sampling, so the read buffer never outgrows the source window.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelWindow {
    /// Top-left source pixel (column, row).
    pub source_offset: (isize, isize),
    /// Source window size in pixels.
    pub source_size: (usize, usize),
    /// Size the source window is read at.
    pub buffer_size: (usize, usize),
    /// Buffer position of the top-left corner of the output image, in buffer pixels.
    pub origin: (f64, f64),
    /// Buffer pixels per output pixel.
    pub step: (f64, f64),
}

impl PixelWindow {
    /// Index into the read buffer for the center of output pixel (x, y), `None` if it falls
    /// outside the raster.
    pub fn buffer_index(&self, x: u32, y: u32) -> Option<usize> {
        let column = (self.origin.0 + (x as f64 + 0.5) * self.step.0).floor();
        let row = (self.origin.1 + (y as f64 + 0.5) * self.step.1).floor();
        if column < 0.0
            || row < 0.0
            || column >= self.buffer_size.0 as f64
            || row >= self.buffer_size.1 as f64
        {
            return None;
        }
        Some(row as usize * self.buffer_size.0 + column as usize)
    }
}

/// Map `extent` onto the pixel grid of a north-up raster.
///
/// Returns `None` if the extent does not overlap the raster.
pub fn pixel_window(
    geo_transform: &[f64; 6],
    raster_size: (usize, usize),
    extent: &geo::Rect,
    size: ImageSize,
) -> Option<PixelWindow> {
    let [origin_x, pixel_width, _, origin_y, _, pixel_height] = *geo_transform;

    // Extent in fractional raster pixel coordinates. Rows grow southwards.
    let col_min = (extent.min().x - origin_x) / pixel_width;
    let col_max = (extent.max().x - origin_x) / pixel_width;
    let row_min = (extent.max().y - origin_y) / pixel_height;
    let row_max = (extent.min().y - origin_y) / pixel_height;
    if !(col_max > col_min && row_max > row_min) {
        return None;
    }

    // Whole source pixels covering the part of the extent inside the raster.
    let first_col = col_min.max(0.0).floor();
    let last_col = col_max.min(raster_size.0 as f64).ceil();
    let first_row = row_min.max(0.0).floor();
    let last_row = row_max.min(raster_size.1 as f64).ceil();
    if last_col <= first_col || last_row <= first_row {
        return None;
    }
    let source_width = last_col - first_col;
    let source_height = last_row - first_row;

    // Output pixels per source pixel. GDAL only downsamples, upsampling happens when sampling.
    let scale_x = size.width as f64 / (col_max - col_min);
    let scale_y = size.height as f64 / (row_max - row_min);
    let buffer_width = (source_width * scale_x.min(1.0)).round().max(1.0);
    let buffer_height = (source_height * scale_y.min(1.0)).round().max(1.0);
    let buffer_per_source_x = buffer_width / source_width;
    let buffer_per_source_y = buffer_height / source_height;

    Some(PixelWindow {
        source_offset: (first_col as isize, first_row as isize),
        source_size: (source_width as usize, source_height as usize),
        buffer_size: (buffer_width as usize, buffer_height as usize),
        origin: (
            (col_min - first_col) * buffer_per_source_x,
            (row_min - first_row) * buffer_per_source_y,
        ),
        step: (
            buffer_per_source_x / scale_x,
            buffer_per_source_y / scale_y,
        ),
    })
}
