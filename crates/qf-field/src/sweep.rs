// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Robustness sweeps over the three canonical scenarios.
//!
//! [`run_robustness_sweep`] jitters `D_Q` per trial and checks that the
//! degenerative regime keeps trailing the other two at every level.
//! [`run_basin_sweep`] starts each scenario from the same uniform points on
//! the unit 3-sphere and compares the spread of final `χ`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use qf_config::DeterminismConfig;

use crate::ensemble::{basin_members, Ensemble, EnsembleMember, EnsembleOutcome, InitialCondition};
use crate::error::{FieldError, FieldResult};
use crate::grid::SimulationConfig;
use crate::history::SeriesStats;
use crate::scenario::Scenario;

/// Relative `D_Q` perturbations swept by default.
pub const PERTURBATION_LEVELS: [f64; 6] = [0.0, 0.05, 0.10, 0.15, 0.20, 0.30];

pub const DEFAULT_TRIALS: usize = 20;

/// Trials for one scenario at one perturbation level.
///
/// Trial `t` draws the scenario's initial field with seed `seed + t`.  For
/// `level > 0` it also scales `D_Q` by `1 + U(-level, level)`, drawn from a
/// stream keyed on the scenario, level and trial so a sweep is reproducible
/// from `seed` alone.  The other coefficients keep their canonical values.
pub fn perturbation_members(
    scenario: Scenario,
    level: f64,
    trials: usize,
    seed: u64,
) -> FieldResult<Vec<EnsembleMember>> {
    if !(level.is_finite() && (0.0..1.0).contains(&level)) {
        return Err(FieldError::InvalidPerturbation(level));
    }
    let seeds = DeterminismConfig {
        base_seed: seed,
        ..DeterminismConfig::default()
    };
    let members = (0..trials)
        .map(|trial| {
            let mut params = scenario.canonical_parameters();
            if level > 0.0 {
                let stream = seeds.seed_for((scenario.name(), level.to_bits(), trial));
                let mut rng = StdRng::seed_from_u64(stream);
                params.d_q *= 1.0 + rng.gen_range(-level..=level);
            }
            EnsembleMember::new(
                format!("{}-p{level}-t{trial}", scenario.name()),
                InitialCondition::Scenario {
                    scenario,
                    seed: seed.wrapping_add(trial as u64),
                },
                params,
            )
        })
        .collect();
    Ok(members)
}

/// Final-`χ` spread of each canonical scenario.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScenarioSpread {
    pub healthy: SeriesStats,
    pub degenerative: SeriesStats,
    pub treatment: SeriesStats,
}

impl ScenarioSpread {
    /// Splits final metrics laid out as `per` values for each scenario in
    /// [`Scenario::ALL`] order.
    fn from_finals(finals: &[f64], per: usize) -> FieldResult<Self> {
        let stats = |i: usize| {
            finals
                .get(i * per..(i + 1) * per)
                .and_then(SeriesStats::of)
                .ok_or(FieldError::EmptySweep("trial"))
        };
        Ok(Self {
            healthy: stats(0)?,
            degenerative: stats(1)?,
            treatment: stats(2)?,
        })
    }

    /// Treatment and healthy both above degenerative, by mean final `χ`.
    pub fn ordering_preserved(&self) -> bool {
        self.treatment.mean > self.degenerative.mean && self.healthy.mean > self.degenerative.mean
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PerturbationLevel {
    pub level: f64,
    #[serde(flatten)]
    pub spread: ScenarioSpread,
    pub ordering_preserved: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RobustnessReport {
    pub trials: usize,
    pub levels: Vec<PerturbationLevel>,
}

impl RobustnessReport {
    pub fn all_preserved(&self) -> bool {
        self.levels.iter().all(|l| l.ordering_preserved)
    }

    pub fn get(&self, level: f64) -> Option<&PerturbationLevel> {
        self.levels.iter().find(|l| l.level == level)
    }
}

/// Runs `trials` perturbed members per scenario at every level.
pub fn run_robustness_sweep(
    config: SimulationConfig,
    levels: &[f64],
    trials: usize,
    seed: u64,
    save_interval: usize,
) -> FieldResult<RobustnessReport> {
    if levels.is_empty() {
        return Err(FieldError::EmptySweep("perturbation level"));
    }
    if trials == 0 {
        return Err(FieldError::EmptySweep("trial"));
    }
    ensure_recorded(&config)?;

    let ensemble = Ensemble::new(config, save_interval);
    let mut report = RobustnessReport {
        trials,
        levels: Vec::with_capacity(levels.len()),
    };
    for &level in levels {
        let mut members = Vec::with_capacity(Scenario::ALL.len() * trials);
        for scenario in Scenario::ALL {
            members.extend(perturbation_members(scenario, level, trials, seed)?);
        }
        let finals = final_metrics(ensemble.run(&members))?;
        let spread = ScenarioSpread::from_finals(&finals, trials)?;
        let ordering_preserved = spread.ordering_preserved();
        info!(
            level,
            healthy = spread.healthy.mean,
            degenerative = spread.degenerative.mean,
            treatment = spread.treatment.mean,
            ordering_preserved,
            "perturbation level complete"
        );
        report.levels.push(PerturbationLevel {
            level,
            spread,
            ordering_preserved,
        });
    }
    Ok(report)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BasinReport {
    pub samples: usize,
    #[serde(flatten)]
    pub spread: ScenarioSpread,
    /// Pooled two-sample t statistic of healthy against degenerative.
    pub healthy_vs_degenerative: Option<f64>,
    pub treatment_vs_degenerative: Option<f64>,
    pub degenerative_lowest: bool,
}

/// Runs every scenario from the same `samples` uniform unit-quaternion
/// starts, each under its canonical parameters.
pub fn run_basin_sweep(
    config: SimulationConfig,
    samples: usize,
    seed: u64,
    save_interval: usize,
) -> FieldResult<BasinReport> {
    if samples == 0 {
        return Err(FieldError::EmptySweep("sample"));
    }
    ensure_recorded(&config)?;

    let members: Vec<EnsembleMember> = Scenario::ALL
        .iter()
        .flat_map(|&scenario| basin_members(scenario, samples, seed))
        .collect();
    let finals = final_metrics(Ensemble::new(config, save_interval).run(&members))?;
    let spread = ScenarioSpread::from_finals(&finals, samples)?;
    let (healthy, rest) = finals.split_at(samples);
    let (degenerative, treatment) = rest.split_at(samples);

    let report = BasinReport {
        samples,
        spread,
        healthy_vs_degenerative: t_statistic(healthy, degenerative),
        treatment_vs_degenerative: t_statistic(treatment, degenerative),
        degenerative_lowest: spread.ordering_preserved(),
    };
    info!(
        samples,
        healthy = spread.healthy.mean,
        degenerative = spread.degenerative.mean,
        treatment = spread.treatment.mean,
        degenerative_lowest = report.degenerative_lowest,
        "basin sweep complete"
    );
    Ok(report)
}

fn ensure_recorded(config: &SimulationConfig) -> FieldResult<()> {
    config.grid()?;
    if config.total_steps() == 0 {
        return Err(FieldError::EmptySweep("step"));
    }
    Ok(())
}

fn final_metrics(outcomes: Vec<EnsembleOutcome>) -> FieldResult<Vec<f64>> {
    outcomes
        .into_iter()
        .map(|outcome| {
            outcome
                .result?
                .final_collapse_metric()
                .ok_or(FieldError::EmptySweep("snapshot"))
        })
        .collect()
}

/// Student's t with pooled variance; `None` below two values per side or
/// when both samples are constant.
fn t_statistic(a: &[f64], b: &[f64]) -> Option<f64> {
    let (na, nb) = (a.len() as f64, b.len() as f64);
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let (sa, sb) = (SeriesStats::of(a)?, SeriesStats::of(b)?);
    // Population variances times n are the sums of squared deviations.
    let pooled = (na * sa.std.powi(2) + nb * sb.std.powi(2)) / (na + nb - 2.0);
    let scale = (pooled * (1.0 / na + 1.0 / nb)).sqrt();
    (scale > 0.0).then(|| (sa.mean - sb.mean) / scale)
}
