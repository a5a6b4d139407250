use parking_lot::Mutex;
use std::panic;
use std::thread;

use crate::centroid::{Accumulator, Centroid, CentroidTable};
use crate::config::AccumulationStrategy;
use crate::grid::{Color, PixelGrid, Sample};

/// Index of the centroid closest to `color`. Ties go to the lowest index; an
/// exact match ends the scan.
#[inline]
pub fn nearest_centroid(color: Color, centroids: &[Centroid]) -> usize {
    debug_assert!(!centroids.is_empty());
    let mut best = 0usize;
    let mut best_d = u64::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let d = color.distance_sq(*c);
        if d < best_d {
            best = i;
            best_d = d;
            if d == 0 {
                break;
            }
        }
    }
    best
}

fn rows_per_worker(height: usize, num_threads: usize) -> usize {
    height.div_ceil(num_threads.max(1)).max(1)
}

/// Runs one assignment pass: every sample is labelled with its nearest centroid
/// and the table's accumulators are rebuilt from scratch. Rows are split into
/// contiguous bands, one per worker. Returns how many samples changed cluster.
pub fn assign_samples(
    grid: &mut PixelGrid,
    table: &mut CentroidTable,
    num_threads: usize,
    strategy: AccumulationStrategy,
) -> usize {
    table.reset_accumulators();
    if grid.is_empty() {
        return 0;
    }
    let band = rows_per_worker(grid.height(), num_threads) * grid.width();
    match strategy {
        AccumulationStrategy::PartialSums => assign_partial_sums(grid.samples_mut(), table, band),
        AccumulationStrategy::ClusterLocks => assign_cluster_locks(grid.samples_mut(), table, band),
    }
}

#[inline]
fn label(sample: &mut Sample, centroids: &[Centroid]) -> (usize, bool) {
    let idx = nearest_centroid(sample.color, centroids);
    let changed = sample.cluster != Some(idx);
    sample.cluster = Some(idx);
    (idx, changed)
}

// Per-worker accumulators, merged once after every band is done.
fn assign_partial_sums(samples: &mut [Sample], table: &mut CentroidTable, band: usize) -> usize {
    let centroids = table.centroids.as_slice();
    let k = centroids.len();

    let partials: Vec<(Vec<Accumulator>, usize)> = thread::scope(|s| {
        let handles: Vec<_> = samples
            .chunks_mut(band)
            .map(|rows| {
                s.spawn(move || {
                    let mut local = vec![Accumulator::default(); k];
                    let mut changed = 0usize;
                    for sample in rows.iter_mut() {
                        let (idx, moved) = label(sample, centroids);
                        local[idx].add(sample.color);
                        changed += moved as usize;
                    }
                    (local, changed)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect()
    });

    let mut changed = 0usize;
    for (local, moved) in &partials {
        for (acc, part) in table.accumulators.iter_mut().zip(local) {
            acc.merge(part);
        }
        changed += moved;
    }
    changed
}

// Shared accumulators, one lock per cluster.
fn assign_cluster_locks(samples: &mut [Sample], table: &mut CentroidTable, band: usize) -> usize {
    let centroids = table.centroids.as_slice();
    let shared: Vec<Mutex<Accumulator>> = (0..centroids.len()).map(|_| Mutex::new(Accumulator::default())).collect();

    let changed: usize = thread::scope(|s| {
        let shared = &shared;
        let handles: Vec<_> = samples
            .chunks_mut(band)
            .map(|rows| {
                s.spawn(move || {
                    let mut changed = 0usize;
                    for sample in rows.iter_mut() {
                        let (idx, moved) = label(sample, centroids);
                        shared[idx].lock().add(sample.color);
                        changed += moved as usize;
                    }
                    changed
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .sum()
    });

    table.accumulators = shared.into_iter().map(Mutex::into_inner).collect();
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_go_to_the_lowest_index() {
        let centroids = [Color::gray(0), Color::gray(20), Color::gray(20)];
        assert_eq!(nearest_centroid(Color::gray(10), &centroids), 0);
        assert_eq!(nearest_centroid(Color::gray(20), &centroids), 1);
        assert_eq!(nearest_centroid(Color::gray(19), &centroids), 1);
    }

    #[test]
    fn exact_match_wins_even_with_later_duplicates() {
        let centroids = [Color::new(9, 9, 9), Color::new(1, 2, 3), Color::new(1, 2, 3)];
        assert_eq!(nearest_centroid(Color::new(1, 2, 3), &centroids), 1);
    }

    #[test]
    fn bands_cover_all_rows() {
        assert_eq!(rows_per_worker(10, 4), 3);
        assert_eq!(rows_per_worker(2, 8), 1);
        assert_eq!(rows_per_worker(7, 1), 7);
        assert_eq!(rows_per_worker(5, 0), 5);
    }
}
