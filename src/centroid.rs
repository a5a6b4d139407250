use rand::Rng;

use crate::grid::{Color, PixelGrid};

/// Representative color of one cluster.
pub type Centroid = Color;

/// Running per-cluster totals collected during an assignment pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Accumulator {
    pub sum_red: u64,
    pub sum_green: u64,
    pub sum_blue: u64,
    pub count: u64,
}

impl Accumulator {
    pub fn seeded(color: Color) -> Self {
        Self { sum_red: color.red as u64, sum_green: color.green as u64, sum_blue: color.blue as u64, count: 1 }
    }

    #[inline]
    pub fn add(&mut self, color: Color) {
        self.sum_red += color.red as u64;
        self.sum_green += color.green as u64;
        self.sum_blue += color.blue as u64;
        self.count += 1;
    }

    pub fn merge(&mut self, o: &Self) {
        self.sum_red += o.sum_red;
        self.sum_green += o.sum_green;
        self.sum_blue += o.sum_blue;
        self.count += o.count;
    }

    /// Floored mean color, `None` for an empty cluster.
    pub fn mean(&self) -> Option<Color> {
        if self.count == 0 {
            return None;
        }
        // Each sum is at most count * u16::MAX, so the quotient fits.
        Some(Color::new(
            (self.sum_red / self.count) as u16,
            (self.sum_green / self.count) as u16,
            (self.sum_blue / self.count) as u16,
        ))
    }
}

/// The k centroids of a run together with their accumulators.
#[derive(Clone, Debug, PartialEq)]
pub struct CentroidTable {
    pub(crate) centroids: Vec<Centroid>,
    pub(crate) accumulators: Vec<Accumulator>,
}

impl CentroidTable {
    /// Table whose accumulators start out holding their own centroid once.
    pub fn from_centroids(centroids: Vec<Centroid>) -> Self {
        let accumulators = centroids.iter().copied().map(Accumulator::seeded).collect();
        Self { centroids, accumulators }
    }

    /// Picks `k` pixel positions uniformly at random, with replacement, and copies their colors.
    pub fn sample_from<R: Rng>(grid: &PixelGrid, k: usize, rng: &mut R) -> Self {
        let centroids = (0..k)
            .map(|_| {
                let x = rng.random_range(0..grid.width());
                let y = rng.random_range(0..grid.height());
                grid.samples()[y * grid.width() + x].color
            })
            .collect();
        Self::from_centroids(centroids)
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    pub fn accumulators(&self) -> &[Accumulator] {
        &self.accumulators
    }

    pub fn reset_accumulators(&mut self) {
        self.accumulators.fill(Accumulator::default());
    }

    /// Sum of all accumulator counts.
    pub fn total_count(&self) -> u64 {
        self.accumulators.iter().map(|a| a.count).sum()
    }
}
