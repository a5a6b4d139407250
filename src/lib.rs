use anyhow::{Context, Result};
use image::{DynamicImage, RgbaImage};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub mod assign;
pub mod centroid;
pub mod config;
pub mod engine;
pub mod grid;
pub mod image_io;
pub mod update;

pub use centroid::{Accumulator, Centroid, CentroidTable};
pub use config::{default_config, AccumulationStrategy, Config, ConfigError};
pub use engine::{quantize, KMeans, Outcome, PassSummary, Quantization};
pub use grid::{Color, PixelGrid, Sample};

#[derive(Debug, Clone)]
pub struct Params {
    pub in_image_name: PathBuf,
    /// Defaults to `<stem>_k<k>.<ext>` next to the input.
    pub out_image_name: Option<PathBuf>,
    pub jpeg_quality: u8,
    pub config: Config,
}

pub fn default_output_path(input: &Path, k: usize) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let ext = input.extension().and_then(|s| s.to_str()).unwrap_or("png");
    input.with_file_name(format!("{}_k{}.{}", stem, k, ext))
}

/// In-memory quantization: clusters `img` and returns the rendered image with the run details.
pub fn quantize_image(img: &DynamicImage, config: Config) -> Result<(RgbaImage, Quantization)> {
    let grid = image_io::grid_from_image(img);
    let result = quantize(grid, config).context("invalid k-means configuration")?;
    let out = image_io::render(&result.grid, &result.table);
    Ok((out, result))
}

/// File-to-file quantization. Returns the path written.
pub fn process(params: Params) -> Result<PathBuf> {
    let Params { in_image_name, out_image_name, jpeg_quality, config } = params;
    let out_image_name = out_image_name.unwrap_or_else(|| default_output_path(&in_image_name, config.k));
    info!("Input image: {}", in_image_name.display());
    info!("Output image: {}", out_image_name.display());
    info!("Clusters (k): {}", config.k);

    let t0 = Instant::now();
    let grid = image_io::load_grid(&in_image_name)?;
    let result = quantize(grid, config).context("invalid k-means configuration")?;
    match result.outcome {
        Outcome::Converged { iterations } => info!("Converged after {} iterations", iterations),
        Outcome::IterationCap { iterations, converged } => {
            info!("Stopped after {} iterations with {}/{} clusters converged", iterations, converged, result.table.k())
        }
    }
    let out = image_io::render(&result.grid, &result.table);
    image_io::save_image(&out, &out_image_name, jpeg_quality)?;
    info!("Time consumed={} ms", t0.elapsed().as_millis());
    Ok(out_image_name)
}
