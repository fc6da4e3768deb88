// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Batches of independent runs sharing one grid and cadence.
//!
//! Members fan out over the rayon pool unless determinism settings lock the
//! execution order; either way results come back in member order.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::driver::Simulation;
use crate::error::FieldResult;
use crate::field::CHANNELS;
use crate::grid::SimulationConfig;
use crate::history::History;
use crate::params::ParameterSet;
use crate::scenario::Scenario;

/// Default relative margin used by [`SeparationReport`].
pub const DEFAULT_SEPARATION_MARGIN: f64 = 0.1;

/// How a member's field is prepared before the run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InitialCondition {
    Scenario { scenario: Scenario, seed: u64 },
    Uniform([f64; CHANNELS]),
}

/// One run of an ensemble.
#[derive(Clone, Debug, PartialEq)]
pub struct EnsembleMember {
    pub label: String,
    pub initial: InitialCondition,
    pub params: ParameterSet,
}

impl EnsembleMember {
    pub fn new(label: impl Into<String>, initial: InitialCondition, params: ParameterSet) -> Self {
        Self {
            label: label.into(),
            initial,
            params,
        }
    }

    /// A canonical scenario with its own parameters.
    pub fn scenario(scenario: Scenario, seed: u64) -> Self {
        Self::new(
            scenario.name(),
            InitialCondition::Scenario { scenario, seed },
            scenario.canonical_parameters(),
        )
    }
}

/// Result of a single member, tagged with its label.
#[derive(Debug)]
pub struct EnsembleOutcome {
    pub label: String,
    pub result: FieldResult<History>,
}

/// Shared settings for a batch of runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ensemble {
    pub config: SimulationConfig,
    pub save_interval: usize,
    pub divergence_check: bool,
}

impl Ensemble {
    pub fn new(config: SimulationConfig, save_interval: usize) -> Self {
        Self {
            config,
            save_interval,
            divergence_check: false,
        }
    }

    pub fn with_divergence_check(mut self, enabled: bool) -> Self {
        self.divergence_check = enabled;
        self
    }

    /// Runs every member and returns the outcomes in member order.
    pub fn run(&self, members: &[EnsembleMember]) -> Vec<EnsembleOutcome> {
        let sequential = qf_config::determinism::lock_execution_order();
        info!(
            members = members.len(),
            sequential,
            save_interval = self.save_interval,
            "running ensemble"
        );
        if sequential {
            members.iter().map(|m| self.run_member(m)).collect()
        } else {
            members.par_iter().map(|m| self.run_member(m)).collect()
        }
    }

    fn run_member(&self, member: &EnsembleMember) -> EnsembleOutcome {
        debug!(label = %member.label, "ensemble member");
        let result = self.simulate(member);
        EnsembleOutcome {
            label: member.label.clone(),
            result,
        }
    }

    fn simulate(&self, member: &EnsembleMember) -> FieldResult<History> {
        let mut sim = Simulation::new(self.config, member.params)?
            .with_divergence_check(self.divergence_check)
            .with_label(member.label.as_str());
        match member.initial {
            InitialCondition::Scenario { scenario, seed } => sim.initialize(scenario, seed),
            InitialCondition::Uniform(q) => sim.set_uniform(q),
        }
        sim.run(self.save_interval)
    }
}

/// Healthy, degenerative and treatment members drawn with the same seed.
pub fn canonical_members(seed: u64) -> Vec<EnsembleMember> {
    Scenario::ALL
        .iter()
        .map(|&s| EnsembleMember::scenario(s, seed))
        .collect()
}

/// One member per seed, labelled `<scenario>-s<seed>`.
pub fn replicates(scenario: Scenario, seeds: &[u64]) -> Vec<EnsembleMember> {
    seeds
        .iter()
        .map(|&seed| {
            let mut member = EnsembleMember::scenario(scenario, seed);
            member.label = format!("{}-s{seed}", scenario.name());
            member
        })
        .collect()
}

/// `count` points drawn uniformly from the unit 3-sphere.
pub fn random_unit_quaternions(count: usize, seed: u64) -> Vec<[f64; CHANNELS]> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let mut q = [0.0; CHANNELS];
        for v in q.iter_mut() {
            *v = StandardNormal.sample(&mut rng);
        }
        let norm = q.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > f64::EPSILON {
            out.push(q.map(|v| v / norm));
        }
    }
    out
}

/// Uniform-start members for a basin sweep under the scenario's canonical
/// parameters, labelled `<scenario>-basin-<i>`.
///
/// The starting points depend on `seed` only, so every scenario swept with
/// the same seed starts from the same quaternions.
pub fn basin_members(scenario: Scenario, count: usize, seed: u64) -> Vec<EnsembleMember> {
    let params = scenario.canonical_parameters();
    random_unit_quaternions(count, seed)
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            EnsembleMember::new(
                format!("{}-basin-{i}", scenario.name()),
                InitialCondition::Uniform(q),
                params,
            )
        })
        .collect()
}

/// Final collapse metric per canonical scenario and whether the
/// degenerative run sits clearly below the other two.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SeparationReport {
    pub healthy: f64,
    pub degenerative: f64,
    pub treatment: f64,
    pub margin: f64,
}

impl SeparationReport {
    pub fn from_histories(healthy: &History, degenerative: &History, treatment: &History) -> Option<Self> {
        Some(Self {
            healthy: healthy.final_collapse_metric()?,
            degenerative: degenerative.final_collapse_metric()?,
            treatment: treatment.final_collapse_metric()?,
            margin: DEFAULT_SEPARATION_MARGIN,
        })
    }

    /// Picks the canonical members out of an ensemble by label.
    pub fn from_outcomes(outcomes: &[EnsembleOutcome]) -> Option<Self> {
        let find = |scenario: Scenario| {
            outcomes
                .iter()
                .find(|o| o.label == scenario.name())
                .and_then(|o| o.result.as_ref().ok())
        };
        Self::from_histories(
            find(Scenario::Healthy)?,
            find(Scenario::Degenerative)?,
            find(Scenario::Treatment)?,
        )
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// `degenerative · (1 + margin) < min(healthy, treatment)`.
    pub fn is_separated(&self) -> bool {
        self.degenerative * (1.0 + self.margin) < self.healthy.min(self.treatment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn unit_quaternions_lie_on_the_sphere() {
        let qs = random_unit_quaternions(32, 5);
        assert_eq!(qs.len(), 32);
        for q in &qs {
            let norm: f64 = q.iter().map(|v| v * v).sum();
            assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-12);
        }
        assert_eq!(qs, random_unit_quaternions(32, 5));
        assert_ne!(qs, random_unit_quaternions(32, 6));
    }

    #[test]
    fn replicate_labels_carry_the_seed() {
        let members = replicates(Scenario::Treatment, &[1, 7]);
        let labels: Vec<&str> = members.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["treatment-s1", "treatment-s7"]);
        assert_eq!(members[1].params, ParameterSet::treatment());
    }

    #[test]
    fn basin_members_share_starting_points_across_scenarios() {
        let healthy = basin_members(Scenario::Healthy, 4, 21);
        let degenerative = basin_members(Scenario::Degenerative, 4, 21);
        assert_eq!(healthy.len(), 4);
        assert_eq!(healthy[2].label, "healthy-basin-2");
        assert_eq!(degenerative[0].label, "degenerative-basin-0");
        assert!(degenerative.iter().all(|m| m.params == ParameterSet::degenerative()));

        let points = random_unit_quaternions(4, 21);
        for ((h, d), q) in healthy.iter().zip(&degenerative).zip(points) {
            assert_eq!(h.initial, InitialCondition::Uniform(q));
            assert_eq!(d.initial, h.initial);
        }
    }

    #[test]
    fn outcomes_keep_member_order_and_errors() {
        let ensemble = Ensemble::new(SimulationConfig::square(6, 0.05, 0.5), 2);
        let mut members = canonical_members(3);
        members.push(EnsembleMember::new(
            "bad",
            InitialCondition::Uniform([1.0, 0.0, 0.0, 0.0]),
            ParameterSet {
                beta_e: f64::INFINITY,
                ..ParameterSet::healthy()
            },
        ));
        let outcomes = ensemble.run(&members);
        let labels: Vec<&str> = outcomes.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["healthy", "degenerative", "treatment", "bad"]);
        assert!(outcomes[..3].iter().all(|o| o.result.as_ref().map(History::len).ok() == Some(5)));
        assert!(outcomes[3].result.is_err());
    }

    #[test]
    fn ensemble_members_match_standalone_runs() {
        let config = SimulationConfig::square(6, 0.05, 0.5);
        let outcomes = Ensemble::new(config, 1).run(&canonical_members(11));
        let mut sim = Simulation::for_scenario(config, Scenario::Degenerative, 11).unwrap();
        let solo = sim.run(1).unwrap();
        assert_eq!(outcomes[1].result.as_ref().unwrap(), &solo);
    }

    #[test]
    fn separation_uses_relative_margin() {
        let report = SeparationReport {
            healthy: 0.5,
            degenerative: 0.1,
            treatment: 0.8,
            margin: DEFAULT_SEPARATION_MARGIN,
        };
        assert!(report.is_separated());
        assert!(!report.with_margin(4.0).is_separated());
        let close = SeparationReport {
            degenerative: 0.48,
            ..report
        };
        assert!(!close.is_separated());
    }
}
