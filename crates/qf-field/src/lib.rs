// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Quaternion-valued reaction–diffusion field on a periodic 2-D grid.
//!
//! ```text
//! dQ/dt = D_Q ∇²Q − Γ(Q) + N(Q)
//! ```
//!
//! [`Simulation`] owns a [`QuaternionField`], advances it with an
//! [`EvolutionOperator`] and records a [`History`] of snapshots carrying
//! the entropy, dopaminergic and astrocyte densities together with the
//! scalar collapse metric `χ`.  [`Ensemble`] batches independent runs over
//! rayon, [`run_ablation_ladder`] sweeps the seven drive ablations, and
//! [`run_robustness_sweep`] / [`run_basin_sweep`] measure how stable the
//! scenario ordering is under parameter noise and uniform starts.

pub mod ablation;
pub mod config;
pub mod driver;
pub mod ensemble;
pub mod error;
pub mod field;
pub mod grid;
pub mod history;
pub mod observables;
pub mod operator;
pub mod params;
pub mod scenario;
pub mod sweep;

pub use ablation::{run_ablation_ladder, AblationConfig, AblationLadder, AblationOutcome};
pub use config::RunConfig;
pub use driver::Simulation;
pub use ensemble::{
    basin_members, canonical_members, random_unit_quaternions, replicates, Ensemble,
    EnsembleMember, EnsembleOutcome, InitialCondition, SeparationReport,
    DEFAULT_SEPARATION_MARGIN,
};
pub use error::{FieldError, FieldResult};
pub use field::{QuaternionField, CHANNELS};
pub use grid::{Grid, SimulationConfig, MAX_STEPS, STABILITY_LIMIT};
pub use history::{History, HistorySummary, SeriesStats, Snapshot};
pub use observables::{collapse_metric, Observables};
pub use operator::{EvolutionOperator, StepScratch};
pub use params::ParameterSet;
pub use scenario::{ChannelDistribution, InitialDistribution, Scenario};
pub use sweep::{
    perturbation_members, run_basin_sweep, run_robustness_sweep, BasinReport, PerturbationLevel,
    RobustnessReport, ScenarioSpread, DEFAULT_TRIALS, PERTURBATION_LEVELS,
};
