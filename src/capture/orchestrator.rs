use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use geo::dimensions::HasDimensions;
use indicatif::ProgressBar;

use crate::error::{CaptureError, Result};
use crate::filter::select::select_features;
use crate::geometry::extent::BufferExtentCalculator;
use crate::render::patch::render_patch;

use super::config::CaptureConfig;
use super::metadata::MetadataCollector;
use super::metadata_csv::write_metadata_csv;

/// Cooperative cancellation, checked before each feature.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Features matching the filter and limit.
    pub selected_features: usize,
    /// Features with a geometry that went through the buffer loop.
    pub feature_count: usize,
    /// Features skipped for a missing or empty geometry.
    pub skipped_features: usize,
    pub patches_written: usize,
    pub patches_failed: usize,
    pub metadata_rows: usize,
    pub metadata_skipped: usize,
    pub cancelled: bool,
}

/// Name of the patch for one feature and buffer distance, e.g. `feature_12_50m.png`.
pub fn patch_filename(feature_id: u64, buffer_meters: f64) -> String {
    format!("feature_{}_{}m.png", feature_id, buffer_meters)
}

/// Render patches for every selected feature at every buffer distance.
///
/// The run fails before touching the output directory if the config is incomplete, and before
/// any render if the filter expression is invalid. Collected metadata is written once at the
/// end, also when the run was cancelled.
pub fn run_capture(config: &CaptureConfig, cancel: &CancelFlag) -> Result<CaptureSummary> {
    config.validate()?;
    let (layer, basemap) = match (config.layer, config.basemap) {
        (Some(layer), Some(basemap)) => (layer, basemap),
        _ => return Err(CaptureError::Config("Layer and basemap are required".to_string())),
    };
    fs::create_dir_all(&config.output_dir)?;

    let features = select_features(layer, &config.filter_expression, config.feature_limit)?;
    let calculator = BufferExtentCalculator::new(layer.crs)?;
    let mut collector = if config.save_metadata {
        Some(MetadataCollector::new(
            layer.crs,
            config.save_geometry,
            config.continue_on_metadata_error,
        )?)
    } else {
        None
    };

    let mut summary = CaptureSummary {
        selected_features: features.len(),
        ..Default::default()
    };
    log::info!(
        "Capturing {} features at buffers {:?} from basemap '{}'",
        features.len(),
        config.buffer_distances,
        basemap.name()
    );
    let bar = ProgressBar::new(features.len() as u64);
    for feature in features {
        if cancel.is_cancelled() {
            log::warn!("Capture cancelled");
            summary.cancelled = true;
            break;
        }
        bar.inc(1);
        let geometry = match &feature.geometry {
            Some(geometry) if !geometry.is_empty() => geometry,
            _ => {
                log::debug!("Skipping feature {} without geometry", feature.id);
                summary.skipped_features += 1;
                continue;
            }
        };
        if let Some(collector) = collector.as_mut() {
            collector.collect(feature)?;
        }

        for &buffer in &config.buffer_distances {
            let extent = calculator.extent(geometry, buffer)?;
            let out_path = config.output_dir.join(patch_filename(feature.id, buffer));
            match render_patch(
                &extent,
                calculator.crs(),
                config.image_size,
                Some(basemap),
                &out_path,
            ) {
                Ok(()) => summary.patches_written += 1,
                Err(err) if config.continue_on_render_error => {
                    log::warn!("Could not render {:?}: {}", out_path, err);
                    summary.patches_failed += 1;
                }
                Err(err) => return Err(err),
            }
            thread::yield_now();
            if !config.throttle.is_zero() {
                thread::sleep(config.throttle);
            }
        }
        summary.feature_count += 1;
    }
    bar.finish();

    if let Some(collector) = collector {
        write_metadata_csv(collector.rows(), &config.output_dir)?;
        summary.metadata_rows = collector.rows().len();
        summary.metadata_skipped = collector.skipped();
    }
    log::info!(
        "Wrote {} patches for {} features to {:?}",
        summary.patches_written,
        summary.feature_count,
        config.output_dir
    );
    Ok(summary)
}
