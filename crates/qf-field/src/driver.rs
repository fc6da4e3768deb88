// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Simulation driver: owns the live field, the time loop and the history.

use ndarray::Array3;
use tracing::{debug, info, warn};

use crate::error::{FieldError, FieldResult};
use crate::field::QuaternionField;
use crate::grid::{Grid, SimulationConfig, STABILITY_LIMIT};
use crate::history::{History, HistoryBuilder, Snapshot};
use crate::observables::collapse_metric;
use crate::operator::{EvolutionOperator, StepScratch};
use crate::params::ParameterSet;
use crate::scenario::Scenario;

const PROGRESS_EVERY: usize = 200;

/// A single simulation instance.
///
/// The driver is uninitialised until one of [`initialize`](Self::initialize),
/// [`set_uniform`](Self::set_uniform) or [`load_field`](Self::load_field)
/// installs a field; [`run`](Self::run) then advances it in place and hands
/// back a fresh [`History`].
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    grid: Grid,
    operator: EvolutionOperator,
    field: Option<QuaternionField>,
    scratch: Option<StepScratch>,
    divergence_check: bool,
    label: String,
}

impl Simulation {
    pub fn new(config: SimulationConfig, params: ParameterSet) -> FieldResult<Self> {
        let grid = config.grid()?;
        params.validate()?;
        let stability = grid.stability_number(config.dt, params.d_q);
        if stability > STABILITY_LIMIT {
            warn!(
                stability,
                limit = STABILITY_LIMIT,
                dt = config.dt,
                dx = grid.dx(),
                d_q = params.d_q,
                "dt·D_Q/dx² exceeds the explicit diffusion limit; the run may diverge"
            );
        }
        Ok(Self {
            config,
            grid,
            operator: EvolutionOperator::new(params, config.dt),
            field: None,
            scratch: None,
            divergence_check: false,
            label: String::from("custom"),
        })
    }

    /// Builds a driver with the scenario's canonical parameters and an
    /// initialised field.
    pub fn for_scenario(config: SimulationConfig, scenario: Scenario, seed: u64) -> FieldResult<Self> {
        let mut sim = Self::new(config, scenario.canonical_parameters())?;
        sim.initialize(scenario, seed);
        Ok(sim)
    }

    /// Aborts runs with [`FieldError::Diverged`] as soon as a non-finite value
    /// shows up in the field.
    pub fn with_divergence_check(mut self, enabled: bool) -> Self {
        self.divergence_check = enabled;
        self
    }

    /// Label used in log records.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn params(&self) -> &ParameterSet {
        self.operator.params()
    }

    pub fn operator(&self) -> &EvolutionOperator {
        &self.operator
    }

    pub fn field(&self) -> Option<&QuaternionField> {
        self.field.as_ref()
    }

    pub fn is_initialised(&self) -> bool {
        self.field.is_some()
    }

    /// Draws the scenario's initial field. Always overwrites the current
    /// field, so the same scenario and seed give the same state every time.
    pub fn initialize(&mut self, scenario: Scenario, seed: u64) {
        debug!(label = %self.label, %scenario, seed, "initialising field");
        self.install(QuaternionField::sample(
            self.grid,
            &scenario.initial_distribution(),
            seed,
        ));
    }

    /// Broadcasts one 4-vector to every cell.
    pub fn set_uniform(&mut self, q: [f64; 4]) {
        self.install(QuaternionField::uniform(self.grid, q));
    }

    /// Installs an externally prepared `(4, nx, ny)` array.
    pub fn load_field(&mut self, data: Array3<f64>) -> FieldResult<()> {
        let field = QuaternionField::from_array(self.grid, data)?;
        self.install(field);
        Ok(())
    }

    fn install(&mut self, field: QuaternionField) {
        self.scratch = Some(StepScratch::for_field(&field));
        self.field = Some(field);
    }

    /// `χ` of the current field.
    pub fn collapse_metric(&self) -> FieldResult<f64> {
        let field = self.field.as_ref().ok_or(FieldError::NotInitialised)?;
        Ok(collapse_metric(field, self.operator.params()))
    }

    /// Advances the live field by one step.
    pub fn step(&mut self) -> FieldResult<()> {
        let (field, scratch) = match (self.field.as_mut(), self.scratch.as_mut()) {
            (Some(field), Some(scratch)) => (field, scratch),
            _ => return Err(FieldError::NotInitialised),
        };
        self.operator.step(field, scratch);
        Ok(())
    }

    /// Runs `floor(t_total / dt)` steps, recording a snapshot after every
    /// step whose index is a multiple of `save_interval`.
    pub fn run(&mut self, save_interval: usize) -> FieldResult<History> {
        if save_interval == 0 {
            return Err(FieldError::InvalidSaveInterval);
        }
        let (field, scratch) = match (self.field.as_mut(), self.scratch.as_mut()) {
            (Some(field), Some(scratch)) => (field, scratch),
            _ => return Err(FieldError::NotInitialised),
        };

        let dt = self.config.dt;
        let total_steps = self.config.total_steps();
        let params = *self.operator.params();
        let mut history = HistoryBuilder::with_capacity(total_steps.div_ceil(save_interval));

        info!(
            label = %self.label,
            nx = self.grid.nx(),
            ny = self.grid.ny(),
            dt,
            total_steps,
            save_interval,
            "starting run"
        );

        for n in 0..total_steps {
            self.operator.step(field, scratch);

            if self.divergence_check {
                if let Some(channel) = field.first_non_finite_channel() {
                    let time = n as f64 * dt;
                    warn!(label = %self.label, step = n, time, channel, "field diverged");
                    return Err(FieldError::Diverged {
                        step: n,
                        time,
                        channel,
                    });
                }
            }

            if n % save_interval == 0 {
                history.push(Snapshot::capture(n, n as f64 * dt, field, &params));
                if n % PROGRESS_EVERY == 0 {
                    debug!(
                        label = %self.label,
                        step = n,
                        total_steps,
                        time = n as f64 * dt,
                        chi = history.last_collapse_metric().unwrap_or(f64::NAN),
                        "progress"
                    );
                }
            }
        }

        let history = history.finish(dt, save_interval);
        info!(
            label = %self.label,
            snapshots = history.len(),
            final_chi = history.final_collapse_metric().unwrap_or(f64::NAN),
            "run complete"
        );
        Ok(history)
    }
}
