use thiserror::Error;

/// How the Assignment Stage folds pixel colors into the per-cluster accumulators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccumulationStrategy {
    /// Every worker sums into a private accumulator array; the arrays are merged once per pass.
    #[default]
    PartialSums,
    /// One lock per cluster accumulator, shared by every worker.
    ClusterLocks,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("number of clusters must be positive")]
    NoClusters,
    #[error("number of clusters ({k}) exceeds the number of pixels ({pixels})")]
    TooManyClusters { k: usize, pixels: usize },
    #[error("convergence threshold must be a positive finite number, got {0}")]
    InvalidThreshold(f64),
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("maximum iteration count must be at least 1 when set")]
    ZeroIterationCap,
    #[error("expected {expected} initial centroids, got {actual}")]
    CentroidCountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub k: usize,
    pub threshold: f64,
    /// Seed for centroid initialization. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Iteration cap; `None` iterates until every cluster has converged.
    pub max_iterations: Option<usize>,
    pub num_threads: usize,
    pub strategy: AccumulationStrategy,
}

pub const DEFAULT_K: usize = 200;
pub const DEFAULT_THRESHOLD: f64 = 0.01;
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

pub fn default_config() -> Config {
    Config {
        k: DEFAULT_K,
        threshold: DEFAULT_THRESHOLD,
        seed: None,
        max_iterations: Some(DEFAULT_MAX_ITERATIONS),
        num_threads: num_cpus::get().max(1),
        strategy: AccumulationStrategy::default(),
    }
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

impl Config {
    /// Checks the configuration against a grid of `pixels` samples before any work starts.
    pub fn validate(&self, pixels: usize) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::NoClusters);
        }
        if self.k > pixels {
            return Err(ConfigError::TooManyClusters { k: self.k, pixels });
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.num_threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::ZeroIterationCap);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(k: usize, threshold: f64) -> Config {
        Config { k, threshold, ..default_config() }
    }

    #[test]
    fn rejects_bad_cluster_counts() {
        assert_eq!(config(0, 0.01).validate(4), Err(ConfigError::NoClusters));
        assert_eq!(
            config(5, 0.01).validate(4),
            Err(ConfigError::TooManyClusters { k: 5, pixels: 4 })
        );
        assert!(config(4, 0.01).validate(4).is_ok());
    }

    #[test]
    fn rejects_non_positive_thresholds() {
        assert!(matches!(config(2, 0.0).validate(4), Err(ConfigError::InvalidThreshold(_))));
        assert!(matches!(config(2, -0.5).validate(4), Err(ConfigError::InvalidThreshold(_))));
        assert!(matches!(config(2, f64::NAN).validate(4), Err(ConfigError::InvalidThreshold(_))));
    }

    #[test]
    fn rejects_zero_workers_and_zero_cap() {
        let mut cfg = config(2, 0.01);
        cfg.num_threads = 0;
        assert_eq!(cfg.validate(4), Err(ConfigError::NoWorkers));
        cfg.num_threads = 1;
        cfg.max_iterations = Some(0);
        assert_eq!(cfg.validate(4), Err(ConfigError::ZeroIterationCap));
        cfg.max_iterations = None;
        assert!(cfg.validate(4).is_ok());
    }
}
