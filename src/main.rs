// CLI entry for rgb_kmeans
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use rgb_kmeans::image_io::DEFAULT_JPEG_QUALITY;
use rgb_kmeans::{default_config, process, AccumulationStrategy, Config, Params};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    /// Per-worker partial sums merged after each pass
    PartialSums,
    /// One lock per cluster accumulator
    ClusterLocks,
}

impl From<Strategy> for AccumulationStrategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::PartialSums => AccumulationStrategy::PartialSums,
            Strategy::ClusterLocks => AccumulationStrategy::ClusterLocks,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rgb_kmeans", version, about = "Color quantization by k-means clustering in RGB space")]
struct Cli {
    /// Number of color clusters
    #[arg(short = 'k', long = "clusters")]
    clusters: Option<usize>,
    /// Relative per-channel change under which a cluster counts as converged
    #[arg(long = "threshold")]
    threshold: Option<f64>,
    /// Seed for centroid initialization (random when omitted)
    #[arg(long = "seed")]
    seed: Option<u64>,
    /// Iteration cap
    #[arg(long = "max-iterations", conflicts_with = "unbounded")]
    max_iterations: Option<usize>,
    /// Iterate until every cluster converges, without a cap
    #[arg(long = "unbounded", action = ArgAction::SetTrue)]
    unbounded: bool,
    /// Number of worker threads
    #[arg(long = "threads")]
    threads: Option<usize>,
    /// How workers accumulate per-cluster sums
    #[arg(long = "strategy", value_enum)]
    strategy: Option<Strategy>,
    /// JPEG quality (1-100) when the output is a JPEG
    #[arg(long = "quality", default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Input image path
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
    /// Output image path (defaults to <input stem>_k<k>.<ext>)
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

fn build_config(cli: &Cli) -> Config {
    let mut cfg = default_config();
    if let Some(v) = cli.clusters { cfg.k = v; }
    if let Some(v) = cli.threshold { cfg.threshold = v; }
    if let Some(v) = cli.seed { cfg.seed = Some(v); }
    if let Some(v) = cli.max_iterations { cfg.max_iterations = Some(v); }
    if cli.unbounded { cfg.max_iterations = None; }
    if let Some(v) = cli.threads { cfg.num_threads = v.max(1); }
    if let Some(v) = cli.strategy { cfg.strategy = v.into(); }
    cfg
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = build_config(&cli);
    let params = Params {
        in_image_name: cli.input,
        out_image_name: cli.output,
        jpeg_quality: cli.quality,
        config: cfg,
    };
    let written = process(params)?;
    println!("{}", written.display());
    Ok(())
}
