//! Error types for the capture pipeline.

use thiserror::Error;

use crate::crs::crs_utils::EpsgCode;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// Missing or invalid run parameters. Raised before any work is done.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid filter expression at position {position}: {message}")]
    FilterSyntax { position: usize, message: String },

    #[error("Could not reproject from EPSG:{from} to EPSG:{to}: {reason}")]
    Reprojection {
        from: EpsgCode,
        to: EpsgCode,
        reason: String,
    },

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Geometry is empty")]
    EmptyGeometry,

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Metadata row for feature {feature_id} has fields {found:?}, expected {expected:?}")]
    SchemaMismatch {
        feature_id: u64,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

impl CaptureError {
    pub(crate) fn filter_syntax(position: usize, message: impl Into<String>) -> Self {
        CaptureError::FilterSyntax {
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
