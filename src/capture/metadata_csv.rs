use std::path::{Path, PathBuf};

use crate::error::{CaptureError, Result};

use super::metadata::MetadataRow;

pub const METADATA_FILENAME: &str = "screenshot_metadata.csv";

/// Write all rows to `<output_dir>/screenshot_metadata.csv`, replacing any previous file.
///
/// The header is `feature_id, lon, lat`, the attribute names of the first row, and `geometry`
/// if the first row carries one. Every row must have the same attribute names and geometry
/// presence as the first; the schema is checked before anything is written. Nothing is
/// written for an empty slice.
pub fn write_metadata_csv(rows: &[MetadataRow], output_dir: &Path) -> Result<Option<PathBuf>> {
    let first = match rows.first() {
        Some(first) => first,
        None => return Ok(None),
    };
    let field_names: Vec<String> = first.attributes.iter().map(|(name, _)| name.clone()).collect();
    let with_geometry = first.geometry.is_some();
    for row in rows {
        check_schema(row, &field_names, with_geometry)?;
    }

    let mut header = vec!["feature_id", "lon", "lat"];
    header.extend(field_names.iter().map(String::as_str));
    if with_geometry {
        header.push("geometry");
    }

    let filepath = output_dir.join(METADATA_FILENAME);
    let mut writer = csv::Writer::from_writer(tempfile::NamedTempFile::new_in(output_dir)?);
    writer.write_record(&header)?;
    for row in rows {
        let mut record = vec![
            row.feature_id.to_string(),
            row.lon.to_string(),
            row.lat.to_string(),
        ];
        record.extend(row.attributes.iter().map(|(_, value)| value.to_string()));
        if let Some(geometry) = &row.geometry {
            record.push(geometry.clone());
        }
        writer.write_record(&record)?;
    }
    let file = writer
        .into_inner()
        .map_err(|err| CaptureError::Io(err.into_error()))?;
    file.persist(&filepath)
        .map_err(|err| CaptureError::Io(err.error))?;
    log::info!("Wrote {} metadata rows to {:?}", rows.len(), filepath);
    Ok(Some(filepath))
}

fn check_schema(row: &MetadataRow, field_names: &[String], with_geometry: bool) -> Result<()> {
    let matches = row.geometry.is_some() == with_geometry
        && row.attributes.len() == field_names.len()
        && row
            .attributes
            .iter()
            .zip(field_names)
            .all(|((name, _), expected)| name == expected);
    if matches {
        return Ok(());
    }
    let describe = |names: Vec<String>, geometry: bool| {
        let mut names = names;
        if geometry {
            names.push("geometry".to_string());
        }
        names
    };
    Err(CaptureError::SchemaMismatch {
        feature_id: row.feature_id,
        expected: describe(field_names.to_vec(), with_geometry),
        found: describe(
            row.attributes.iter().map(|(name, _)| name.clone()).collect(),
            row.geometry.is_some(),
        ),
    })
}
