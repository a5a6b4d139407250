use std::panic;
use std::thread;

use crate::centroid::{Accumulator, Centroid, CentroidTable};

/// Relative-change test for a single channel. A zero old value has no relative
/// scale: it only counts as converged when the new value is zero as well.
#[inline]
pub fn channel_converged(old: u16, new: u16, threshold: f64) -> bool {
    if old == 0 {
        return new == 0;
    }
    (new as f64 - old as f64).abs() / old as f64 <= threshold
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterUpdate {
    /// Mean is within the threshold on every channel; centroid untouched.
    Converged,
    /// Centroid replaced by the mean; `shift` is the squared distance moved.
    Moved { shift: u64 },
    /// No pixel mapped to the cluster this pass; centroid untouched.
    Empty,
}

impl ClusterUpdate {
    pub fn is_converged(self) -> bool {
        !matches!(self, ClusterUpdate::Moved { .. })
    }
}

pub fn update_cluster(centroid: &mut Centroid, acc: &Accumulator, threshold: f64) -> ClusterUpdate {
    let Some(mean) = acc.mean() else {
        return ClusterUpdate::Empty;
    };
    let converged = centroid
        .channels()
        .into_iter()
        .zip(mean.channels())
        .all(|(old, new)| channel_converged(old, new, threshold));
    if converged {
        return ClusterUpdate::Converged;
    }
    let shift = centroid.distance_sq(mean);
    *centroid = mean;
    ClusterUpdate::Moved { shift }
}

/// Aggregate result of one update pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Clusters that passed the convergence test, empty clusters included.
    pub converged: usize,
    pub empty: usize,
    /// Largest squared distance any centroid moved.
    pub max_shift: u64,
}

impl UpdateSummary {
    fn record(&mut self, update: ClusterUpdate) {
        match update {
            ClusterUpdate::Converged => self.converged += 1,
            ClusterUpdate::Empty => {
                self.converged += 1;
                self.empty += 1;
            }
            ClusterUpdate::Moved { shift } => self.max_shift = self.max_shift.max(shift),
        }
    }

    fn merge(mut self, o: Self) -> Self {
        self.converged += o.converged;
        self.empty += o.empty;
        self.max_shift = self.max_shift.max(o.max_shift);
        self
    }
}

/// Recomputes every centroid from its accumulator. Clusters are split into
/// contiguous groups, one per worker; each cluster is independent of the others.
pub fn update_centroids(table: &mut CentroidTable, threshold: f64, num_threads: usize) -> UpdateSummary {
    let k = table.k();
    if k == 0 {
        return UpdateSummary::default();
    }
    let group = k.div_ceil(num_threads.max(1));
    let CentroidTable { centroids, accumulators } = table;

    thread::scope(|s| {
        let handles: Vec<_> = centroids
            .chunks_mut(group)
            .zip(accumulators.chunks(group))
            .map(|(cs, accs)| {
                s.spawn(move || {
                    let mut summary = UpdateSummary::default();
                    for (c, acc) in cs.iter_mut().zip(accs) {
                        summary.record(update_cluster(c, acc, threshold));
                    }
                    summary
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .fold(UpdateSummary::default(), UpdateSummary::merge)
    })
}
