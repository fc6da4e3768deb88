// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::path::PathBuf;

use thiserror::Error;

/// Result type produced by the field simulator.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors emitted while configuring or running a field simulation.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("unknown scenario '{0}' (expected healthy, degenerative or treatment)")]
    UnknownScenario(String),
    #[error("grid extents and spacing must be positive and finite (lx={lx}, ly={ly}, dx={dx})")]
    InvalidGrid { lx: f64, ly: f64, dx: f64 },
    #[error("grid needs at least 2 cells per axis, got {nx}x{ny}")]
    GridTooSmall { nx: usize, ny: usize },
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),
    #[error("total simulated time must be non-negative and finite, got {0}")]
    InvalidDuration(f64),
    #[error("t_total={t_total} with dt={dt} needs more than {limit} steps")]
    TooManySteps { t_total: f64, dt: f64, limit: usize },
    #[error("perturbation level must lie in [0, 1), got {0}")]
    InvalidPerturbation(f64),
    #[error("sweep needs at least one {0}")]
    EmptySweep(&'static str),
    #[error("save_interval must be at least 1")]
    InvalidSaveInterval,
    #[error("parameter `{name}` must be finite, got {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },
    #[error("field shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: Vec<usize>,
    },
    #[error("simulation field has not been initialised")]
    NotInitialised,
    #[error("field diverged at step {step} (t={time}): non-finite value in channel {channel}")]
    Diverged {
        step: usize,
        time: f64,
        channel: usize,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}
