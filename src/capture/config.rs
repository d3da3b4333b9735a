use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CaptureError, Result};
use crate::geofile::feature::FeatureLayer;
use crate::render::{Basemap, ImageSize};

/// Pause after each render, to keep the rendering backend from being flooded.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(300);

/// Parameters of one capture run. Built once and read-only afterwards.
pub struct CaptureConfig<'a> {
    pub layer: Option<&'a FeatureLayer>,
    pub basemap: Option<&'a dyn Basemap>,
    pub output_dir: PathBuf,
    /// Buffer distances in meters, rendered in this order.
    pub buffer_distances: Vec<f64>,
    pub image_size: ImageSize,
    /// Filter expression, empty for no filtering.
    pub filter_expression: String,
    /// Maximum number of selected features, `None` for unlimited.
    pub feature_limit: Option<usize>,
    pub save_metadata: bool,
    pub save_geometry: bool,
    /// Log and skip features whose metadata cannot be derived instead of failing the run.
    pub continue_on_metadata_error: bool,
    /// Log and count failed renders instead of failing the run.
    pub continue_on_render_error: bool,
    pub throttle: Duration,
}

impl<'a> CaptureConfig<'a> {
    pub fn new(
        layer: &'a FeatureLayer,
        basemap: &'a dyn Basemap,
        output_dir: impl Into<PathBuf>,
        buffer_distances: Vec<f64>,
    ) -> Self {
        Self {
            layer: Some(layer),
            basemap: Some(basemap),
            output_dir: output_dir.into(),
            buffer_distances,
            image_size: ImageSize::default(),
            filter_expression: String::new(),
            feature_limit: None,
            save_metadata: false,
            save_geometry: false,
            continue_on_metadata_error: true,
            continue_on_render_error: false,
            throttle: DEFAULT_THROTTLE,
        }
    }

    /// Check that everything a run needs is present.
    pub fn validate(&self) -> Result<()> {
        if self.layer.is_none() {
            return Err(CaptureError::Config("No input layer set".to_string()));
        }
        if self.basemap.is_none() {
            return Err(CaptureError::Config("No basemap layer set".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(CaptureError::Config("No output directory set".to_string()));
        }
        if self.buffer_distances.is_empty() {
            return Err(CaptureError::Config(
                "At least one buffer distance is required".to_string(),
            ));
        }
        if let Some(distance) = self
            .buffer_distances
            .iter()
            .find(|distance| !distance.is_finite() || **distance <= 0.0)
        {
            return Err(CaptureError::Config(format!(
                "Buffer distances must be positive, got {}",
                distance
            )));
        }
        if self.image_size.width == 0 || self.image_size.height == 0 {
            return Err(CaptureError::Config(format!(
                "Image size must be positive, got {}x{}",
                self.image_size.width, self.image_size.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::crs::crs_utils::{EpsgCode, WGS84};
    use crate::error::{CaptureError, Result};
    use crate::geofile::feature::FeatureLayer;
    use crate::render::{Basemap, ImageSize};

    use super::CaptureConfig;

    struct NullBasemap;

    impl Basemap for NullBasemap {
        fn name(&self) -> &str {
            "null"
        }

        fn render(&self, _: &geo::Rect, _: EpsgCode, size: ImageSize) -> Result<image::RgbaImage> {
            Ok(image::RgbaImage::new(size.width, size.height))
        }
    }

    fn empty_layer() -> FeatureLayer {
        FeatureLayer::new(vec![], WGS84, vec![])
    }

    #[test]
    fn test_defaults() {
        let layer = empty_layer();
        let config = CaptureConfig::new(&layer, &NullBasemap, "out", vec![50.0]);
        assert_eq!(config.image_size, ImageSize::default());
        assert_eq!(config.feature_limit, None);
        assert!(config.continue_on_metadata_error);
        assert!(!config.continue_on_render_error);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![50.0, 0.0])]
    #[case(vec![-10.0])]
    #[case(vec![f64::NAN])]
    fn test_invalid_buffer_distances(#[case] buffer_distances: Vec<f64>) {
        let layer = empty_layer();
        let config = CaptureConfig::new(&layer, &NullBasemap, "out", buffer_distances);
        assert!(matches!(config.validate(), Err(CaptureError::Config(_))));
    }

    #[test]
    fn test_missing_parameters() {
        let layer = empty_layer();

        let mut config = CaptureConfig::new(&layer, &NullBasemap, "out", vec![50.0]);
        config.layer = None;
        assert!(matches!(config.validate(), Err(CaptureError::Config(_))));

        let mut config = CaptureConfig::new(&layer, &NullBasemap, "out", vec![50.0]);
        config.basemap = None;
        assert!(matches!(config.validate(), Err(CaptureError::Config(_))));

        let config = CaptureConfig::new(&layer, &NullBasemap, "", vec![50.0]);
        assert!(matches!(config.validate(), Err(CaptureError::Config(_))));

        let mut config = CaptureConfig::new(&layer, &NullBasemap, "out", vec![50.0]);
        config.image_size.height = 0;
        assert!(matches!(config.validate(), Err(CaptureError::Config(_))));
    }
}
