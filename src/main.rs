extern crate log;
pub mod capture;
pub mod crs;
pub mod error;
pub mod filter;
pub mod geofile;
pub mod geometry;
pub mod render;
use crate::capture::config::CaptureConfig;
use crate::capture::orchestrator::{run_capture, CancelFlag};
use crate::filter::simple::compile_simple_filter;
use crate::geofile::read_feature_layer;
use crate::render::gdal_raster::GdalRasterBasemap;
use crate::render::wms::WmsBasemap;
use crate::render::{Basemap, ImageSize};
use anyhow::anyhow;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use std::{fs::read_to_string, path::Path};

/// Render basemap patches around the features of a vector layer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input config file.
    #[arg(short, long)]
    config_filepath: String,
}

#[derive(Deserialize, Debug)]
struct LayerConfig {
    filepath: PathBuf,
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
enum BasemapConfig {
    Raster {
        filepath: PathBuf,
    },
    Wms {
        url: String,
        layers: String,
        style: Option<String>,
        format: Option<String>,
    },
}

#[derive(Deserialize, Debug)]
struct Config {
    layer: LayerConfig,
    basemap: BasemapConfig,
    output_dir: PathBuf,
    buffer_distances: Vec<f64>,
    /// Comma separated `field=value` pairs.
    #[serde(default)]
    filter: String,
    #[serde(default)]
    filter_expression: String,
    /// 0 for no limit.
    #[serde(default)]
    feature_limit: usize,
    #[serde(default)]
    save_metadata: bool,
    #[serde(default)]
    save_geometry: bool,
    #[serde(default)]
    image_size: ImageSize,
    #[serde(default = "default_throttle_ms")]
    throttle_ms: u64,
    #[serde(default = "default_true")]
    continue_on_metadata_error: bool,
    #[serde(default)]
    continue_on_render_error: bool,
}

fn default_throttle_ms() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Config {
    /// The `filter` pairs and the `filter_expression`, combined with AND.
    fn combined_filter_expression(&self) -> String {
        let compiled = compile_simple_filter(&self.filter);
        match (compiled.is_empty(), self.filter_expression.trim().is_empty()) {
            (true, _) => self.filter_expression.clone(),
            (false, true) => compiled,
            (false, false) => format!("{} AND ({})", compiled, self.filter_expression),
        }
    }
}

fn open_basemap(config: &BasemapConfig) -> anyhow::Result<Box<dyn Basemap>> {
    Ok(match config {
        BasemapConfig::Raster { filepath } => Box::new(GdalRasterBasemap::open(filepath)?),
        BasemapConfig::Wms {
            url,
            layers,
            style,
            format,
        } => Box::new(WmsBasemap::new(
            url,
            layers,
            style.as_deref(),
            format.as_deref(),
        )?),
    })
}

fn try_main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();

    let args = Args::try_parse()?;
    if !Path::new(&args.config_filepath).exists() {
        return Err(anyhow!("Config file {} not found", &args.config_filepath));
    }
    let config_contents = read_to_string(args.config_filepath)?;
    let config: Config = serde_yaml::from_str(&config_contents)?;

    log::info!("Reading features from {:?}", config.layer.filepath);
    let layer = read_feature_layer(&config.layer.filepath, config.layer.name.as_deref())?;
    log::info!(
        "Read {} features in EPSG:{}",
        layer.features.len(),
        layer.crs
    );
    let basemap = open_basemap(&config.basemap)?;

    let mut capture_config = CaptureConfig::new(
        &layer,
        basemap.as_ref(),
        &config.output_dir,
        config.buffer_distances.clone(),
    );
    capture_config.image_size = config.image_size;
    capture_config.filter_expression = config.combined_filter_expression();
    capture_config.feature_limit = match config.feature_limit {
        0 => None,
        limit => Some(limit),
    };
    capture_config.save_metadata = config.save_metadata;
    capture_config.save_geometry = config.save_geometry;
    capture_config.continue_on_metadata_error = config.continue_on_metadata_error;
    capture_config.continue_on_render_error = config.continue_on_render_error;
    capture_config.throttle = Duration::from_millis(config.throttle_ms);

    let summary = run_capture(&capture_config, &CancelFlag::new())?;
    log::info!("Saved patches for {} features", summary.feature_count);
    if summary.skipped_features > 0 {
        log::info!("Skipped {} features without geometry", summary.skipped_features);
    }
    if summary.patches_failed > 0 {
        log::warn!("{} patches could not be rendered", summary.patches_failed);
    }
    if summary.metadata_skipped > 0 {
        log::warn!("No metadata for {} features", summary.metadata_skipped);
    }
    Ok(())
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
