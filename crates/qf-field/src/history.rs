// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Snapshot history of a run.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::field::{QuaternionField, CHANNELS};
use crate::observables::Observables;
use crate::params::ParameterSet;

/// State and observables recorded after one step.
///
/// Every array is an owned copy; nothing here aliases the live field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Zero-based index of the step that produced this snapshot.
    pub step: usize,
    /// `step · dt`.
    pub time: f64,
    pub field: Array3<f64>,
    pub entropy: Array2<f64>,
    pub dopamine: Array2<f64>,
    pub astrocyte: Array2<f64>,
    pub collapse_metric: f64,
    pub channel_norms: [f64; CHANNELS],
}

impl Snapshot {
    pub fn capture(step: usize, time: f64, field: &QuaternionField, params: &ParameterSet) -> Self {
        let observables = Observables::measure(field, params);
        Self {
            step,
            time,
            field: field.as_array().to_owned(),
            entropy: observables.entropy,
            dopamine: observables.dopamine,
            astrocyte: observables.astrocyte,
            collapse_metric: observables.collapse_metric,
            channel_norms: observables.channel_norms,
        }
    }

    pub fn mean_entropy(&self) -> f64 {
        self.entropy.mean().unwrap_or(0.0)
    }

    pub fn mean_dopamine(&self) -> f64 {
        self.dopamine.mean().unwrap_or(0.0)
    }

    pub fn mean_astrocyte(&self) -> f64 {
        self.astrocyte.mean().unwrap_or(0.0)
    }
}

/// Mean and population standard deviation of a series window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub std: f64,
}

impl SeriesStats {
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std: var.sqrt(),
        })
    }
}

/// Append-only collector owned by a single run.
#[derive(Debug, Default)]
pub(crate) struct HistoryBuilder {
    snapshots: Vec<Snapshot>,
}

impl HistoryBuilder {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub(crate) fn last_collapse_metric(&self) -> Option<f64> {
        self.snapshots.last().map(|s| s.collapse_metric)
    }

    pub(crate) fn finish(self, dt: f64, save_interval: usize) -> History {
        History {
            dt,
            save_interval,
            snapshots: self.snapshots,
        }
    }
}

/// Completed, immutable record of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct History {
    dt: f64,
    save_interval: usize,
    snapshots: Vec<Snapshot>,
}

impl History {
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn save_interval(&self) -> usize {
        self.save_interval
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots
    }

    pub fn times(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.time).collect()
    }

    pub fn collapse_series(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.collapse_metric).collect()
    }

    pub fn channel_norm_series(&self) -> Vec<[f64; CHANNELS]> {
        self.snapshots.iter().map(|s| s.channel_norms).collect()
    }

    pub fn final_collapse_metric(&self) -> Option<f64> {
        self.last().map(|s| s.collapse_metric)
    }

    /// Statistics of the collapse metric over the last `window` snapshots.
    pub fn tail_collapse_stats(&self, window: usize) -> Option<SeriesStats> {
        let series = self.collapse_series();
        let start = series.len().saturating_sub(window);
        SeriesStats::of(&series[start..])
    }

    /// Scalar-only projection suitable for reports and plots.
    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            dt: self.dt,
            save_interval: self.save_interval,
            time: self.times(),
            collapse_metric: self.collapse_series(),
            channel_norms: self.channel_norm_series(),
            mean_entropy: self.snapshots.iter().map(Snapshot::mean_entropy).collect(),
            mean_dopamine: self.snapshots.iter().map(Snapshot::mean_dopamine).collect(),
            mean_astrocyte: self.snapshots.iter().map(Snapshot::mean_astrocyte).collect(),
        }
    }
}

/// Time series extracted from a [`History`], without the field arrays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub dt: f64,
    pub save_interval: usize,
    pub time: Vec<f64>,
    pub collapse_metric: Vec<f64>,
    pub channel_norms: Vec<[f64; CHANNELS]>,
    pub mean_entropy: Vec<f64>,
    pub mean_dopamine: Vec<f64>,
    pub mean_astrocyte: Vec<f64>,
}

impl HistorySummary {
    pub fn final_collapse_metric(&self) -> Option<f64> {
        self.collapse_metric.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use approx::assert_abs_diff_eq;

    fn snapshot(step: usize, chi: f64) -> Snapshot {
        let grid = Grid::with_cells(2, 2, 1.0).unwrap();
        let field = QuaternionField::uniform(grid, [1.0, 0.0, 0.0, 0.0]);
        let mut snap = Snapshot::capture(step, step as f64 * 0.1, &field, &ParameterSet::healthy());
        snap.collapse_metric = chi;
        snap
    }

    #[test]
    fn snapshot_owns_its_field() {
        let grid = Grid::with_cells(3, 3, 1.0).unwrap();
        let mut field = QuaternionField::uniform(grid, [0.5; 4]);
        let snap = Snapshot::capture(0, 0.0, &field, &ParameterSet::healthy());
        field.channel_mut(0).fill(9.0);
        assert!(snap.field.iter().all(|v| *v == 0.5));
        assert!(snap.dopamine.iter().all(|v| *v == 0.25));
    }

    #[test]
    fn tail_stats_cover_the_last_window() {
        let mut builder = HistoryBuilder::with_capacity(4);
        for (i, chi) in [10.0, 1.0, 2.0, 3.0].into_iter().enumerate() {
            builder.push(snapshot(i, chi));
        }
        assert_eq!(builder.last_collapse_metric(), Some(3.0));
        let history = builder.finish(0.1, 1);
        let stats = history.tail_collapse_stats(3).unwrap();
        assert_abs_diff_eq!(stats.mean, 2.0);
        assert_abs_diff_eq!(stats.std, (2.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        let all = history.tail_collapse_stats(100).unwrap();
        assert_abs_diff_eq!(all.mean, 4.0);
    }

    #[test]
    fn empty_history_has_no_stats() {
        let history = HistoryBuilder::default().finish(0.02, 20);
        assert!(history.is_empty());
        assert!(history.tail_collapse_stats(10).is_none());
        assert!(history.final_collapse_metric().is_none());
    }

    #[test]
    fn summary_mirrors_scalar_series() {
        let mut builder = HistoryBuilder::default();
        builder.push(snapshot(0, 5.0));
        builder.push(snapshot(2, 4.0));
        let history = builder.finish(0.1, 2);
        let summary = history.summary();
        assert_eq!(summary.time, history.times());
        assert_eq!(summary.collapse_metric, vec![5.0, 4.0]);
        assert_eq!(summary.mean_dopamine, vec![1.0, 1.0]);
        assert_eq!(summary.mean_entropy, vec![0.0, 0.0]);
        assert_eq!(summary.final_collapse_metric(), Some(4.0));
        assert_eq!(summary.channel_norms[0], [2.0, 0.0, 0.0, 0.0]);
    }
}
