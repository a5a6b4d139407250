use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

use crate::assign::assign_samples;
use crate::centroid::{Centroid, CentroidTable};
use crate::config::{Config, ConfigError};
use crate::grid::PixelGrid;
use crate::update::{update_centroids, UpdateSummary};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every cluster passed the convergence test on the last pass.
    Converged { iterations: usize },
    /// The iteration cap was reached first. The grid and table are still
    /// consistent and can be rendered.
    IterationCap { iterations: usize, converged: usize },
}

impl Outcome {
    pub fn iterations(self) -> usize {
        match self {
            Outcome::Converged { iterations } | Outcome::IterationCap { iterations, .. } => iterations,
        }
    }
}

/// What happened during one assignment + update cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassSummary {
    pub iteration: usize,
    /// Samples whose cluster changed during the assignment pass.
    pub reassigned: usize,
    pub update: UpdateSummary,
}

#[derive(Clone, Debug)]
pub struct Quantization {
    pub grid: PixelGrid,
    pub table: CentroidTable,
    pub outcome: Outcome,
    pub history: Vec<PassSummary>,
    /// Seed used for random initialization, `None` for caller-supplied centroids.
    pub seed: Option<u64>,
}

impl Quantization {
    pub fn is_converged(&self) -> bool {
        matches!(self.outcome, Outcome::Converged { .. })
    }

    pub fn centroids(&self) -> &[Centroid] {
        self.table.centroids()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Running,
    Converged,
}

pub struct KMeans {
    config: Config,
}

impl KMeans {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clusters `grid` starting from `k` randomly sampled pixel colors.
    pub fn run(&self, grid: PixelGrid) -> Result<Quantization, ConfigError> {
        self.config.validate(grid.len())?;
        let seed = self.config.seed.unwrap_or_else(rand::random);
        debug!("centroid seed={}", seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let table = CentroidTable::sample_from(&grid, self.config.k, &mut rng);
        let mut result = self.iterate(grid, table);
        result.seed = Some(seed);
        Ok(result)
    }

    /// Clusters `grid` starting from the given centroids; there must be exactly `k`.
    pub fn run_with_centroids(&self, grid: PixelGrid, initial: Vec<Centroid>) -> Result<Quantization, ConfigError> {
        self.config.validate(grid.len())?;
        if initial.len() != self.config.k {
            return Err(ConfigError::CentroidCountMismatch { expected: self.config.k, actual: initial.len() });
        }
        Ok(self.iterate(grid, CentroidTable::from_centroids(initial)))
    }

    fn iterate(&self, mut grid: PixelGrid, mut table: CentroidTable) -> Quantization {
        let Config { k, threshold, max_iterations, num_threads, strategy, .. } = self.config;
        info!(
            "k-means start: {}x{} pixels, k={}, threshold={}, threads={}, strategy={:?}",
            grid.width(),
            grid.height(),
            k,
            threshold,
            num_threads,
            strategy
        );

        let start = Instant::now();
        let mut history = Vec::new();
        let mut state = RunState::Running;
        let mut iterations = 0usize;
        let mut converged = 0usize;

        while state == RunState::Running {
            if max_iterations.is_some_and(|cap| iterations >= cap) {
                break;
            }
            iterations += 1;

            let reassigned = assign_samples(&mut grid, &mut table, num_threads, strategy);
            let update = update_centroids(&mut table, threshold, num_threads);
            converged = update.converged;

            info!(
                "iter={}, converged={}/{}, reassigned={}, max_shift={}",
                iterations, update.converged, k, reassigned, update.max_shift
            );
            if update.empty > 0 {
                debug!("iter={}: {} empty cluster(s) kept their centroid", iterations, update.empty);
            }
            history.push(PassSummary { iteration: iterations, reassigned, update });

            if converged == k {
                state = RunState::Converged;
            }
        }

        let outcome = match state {
            RunState::Converged => Outcome::Converged { iterations },
            RunState::Running => {
                warn!("Max iterations reached: {}/{} clusters converged after {} passes", converged, k, iterations);
                Outcome::IterationCap { iterations, converged }
            }
        };
        info!("k-means finished: {:?} in {} ms", outcome, start.elapsed().as_millis());

        Quantization { grid, table, outcome, history, seed: None }
    }
}

/// Runs k-means on `grid` with random initialization.
pub fn quantize(grid: PixelGrid, config: Config) -> Result<Quantization, ConfigError> {
    KMeans::new(config).run(grid)
}
