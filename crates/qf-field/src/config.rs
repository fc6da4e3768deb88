// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! JSON run configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::driver::Simulation;
use crate::error::{FieldError, FieldResult};
use crate::grid::SimulationConfig;
use crate::params::ParameterSet;
use crate::scenario::Scenario;

fn default_save_interval() -> usize {
    20
}

/// Everything needed to reproduce a single run.
///
/// ```json
/// {
///   "simulation": { "lx": 50, "ly": 50, "dx": 1, "dt": 0.02, "t_total": 40 },
///   "scenario": "degenerative",
///   "seed": 7,
///   "save_interval": 20,
///   "parameters": { "D_Q": 0.005, "alpha_D": 0.1, "...": "..." }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub scenario: Scenario,
    /// Falls back to the process base seed when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_save_interval")]
    pub save_interval: usize,
    /// Overrides the scenario's canonical parameters.
    #[serde(default)]
    pub parameters: Option<ParameterSet>,
    #[serde(default)]
    pub divergence_check: bool,
}

impl RunConfig {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            simulation: SimulationConfig::default(),
            scenario,
            seed: None,
            save_interval: default_save_interval(),
            parameters: None,
            divergence_check: false,
        }
    }

    pub fn from_json_str(raw: &str) -> FieldResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FieldResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| FieldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// The override when present, otherwise the scenario's canonical set.
    pub fn resolved_parameters(&self) -> ParameterSet {
        self.parameters
            .unwrap_or_else(|| self.scenario.canonical_parameters())
    }

    pub fn resolved_seed(&self) -> u64 {
        qf_config::determinism::config().seed_or_base(self.seed)
    }

    /// Builds an initialised driver for this configuration.
    pub fn build(&self) -> FieldResult<Simulation> {
        if self.save_interval == 0 {
            return Err(FieldError::InvalidSaveInterval);
        }
        let mut sim = Simulation::new(self.simulation, self.resolved_parameters())?
            .with_divergence_check(self.divergence_check)
            .with_label(self.scenario.name());
        sim.initialize(self.scenario, self.resolved_seed());
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = RunConfig::from_json_str(r#"{ "scenario": "healthy", "seed": 3 }"#).unwrap();
        assert_eq!(cfg.simulation, SimulationConfig::default());
        assert_eq!(cfg.save_interval, 20);
        assert_eq!(cfg.resolved_parameters(), ParameterSet::healthy());
        assert_eq!(cfg.resolved_seed(), 3);
        assert!(!cfg.divergence_check);
    }

    #[test]
    fn parameter_override_wins() {
        let raw = r#"{
            "simulation": { "lx": 8, "ly": 8, "dt": 0.05, "t_total": 1 },
            "scenario": "degenerative",
            "save_interval": 5,
            "parameters": {
                "D_Q": 0.01, "alpha_D": 0.3, "alpha_A": 0.2, "beta_E": 0.1,
                "gamma_0": 0.2, "gamma_1": 0.0, "gamma_2": 0.0, "gamma_3": 0.0
            },
            "divergence_check": true
        }"#;
        let cfg = RunConfig::from_json_str(raw).unwrap();
        assert_eq!(cfg.simulation.dx, 1.0);
        assert_eq!(cfg.resolved_parameters().alpha_d, 0.3);

        let mut sim = cfg.build().unwrap();
        assert_eq!(sim.grid().dims(), (8, 8));
        assert_eq!(sim.run(cfg.save_interval).unwrap().len(), 4);
    }

    #[test]
    fn scenario_names_parse_like_the_command_line() {
        let cfg = RunConfig::from_json_str(r#"{ "scenario": "Healthy" }"#).unwrap();
        assert_eq!(cfg.scenario, Scenario::Healthy);
        let cfg = RunConfig::from_json_str(r#"{ "scenario": "REN01" }"#).unwrap();
        assert_eq!(cfg.scenario, "ren01".parse::<Scenario>().unwrap());
    }

    #[test]
    fn unknown_scenarios_fail_to_parse() {
        let err = RunConfig::from_json_str(r#"{ "scenario": "recovering" }"#).unwrap_err();
        assert!(matches!(err, FieldError::Json(_)));
    }

    #[test]
    fn zero_interval_is_rejected_at_build() {
        let mut cfg = RunConfig::new(Scenario::Healthy);
        cfg.save_interval = 0;
        assert!(matches!(cfg.build(), Err(FieldError::InvalidSaveInterval)));
    }
}
