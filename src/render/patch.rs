use std::io::{Cursor, Write};
use std::path::Path;

use crate::crs::crs_utils::EpsgCode;
use crate::error::{CaptureError, Result};

use super::{Basemap, ImageSize};

/// Render `extent` from the basemap and save it as a PNG at `out_path`, replacing any
/// existing file.
///
/// The image is rendered and encoded in memory first, so a failed render never leaves a file
/// behind.
pub fn render_patch(
    extent: &geo::Rect,
    crs: EpsgCode,
    size: ImageSize,
    basemap: Option<&dyn Basemap>,
    out_path: &Path,
) -> Result<()> {
    let basemap =
        basemap.ok_or_else(|| CaptureError::Render("No basemap layer provided".to_string()))?;
    let image = basemap.render(extent, crs, size)?;
    if image.dimensions() != (size.width, size.height) {
        return Err(CaptureError::Render(format!(
            "Basemap '{}' returned a {}x{} image, expected {}x{}",
            basemap.name(),
            image.width(),
            image.height(),
            size.width,
            size.height
        )));
    }
    write_png(&image, out_path)
}

/// Encode `image` as PNG and atomically move it into place: the bytes go to a temporary file
/// in the target directory, which is then renamed over `out_path`.
pub fn write_png(image: &image::RgbaImage, out_path: &Path) -> Result<()> {
    let mut encoded = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
        .map_err(|err| CaptureError::Render(format!("Could not encode PNG, {}", err)))?;

    let directory = match out_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(directory)?;
    file.write_all(&encoded)?;
    file.persist(out_path).map_err(|err| CaptureError::Io(err.error))?;
    log::debug!("Wrote {:?}", out_path);
    Ok(())
}
