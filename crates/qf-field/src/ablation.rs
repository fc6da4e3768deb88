// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Ablation ladder over the degenerative start.
//!
//! Seven configurations switch three drives on and off against a fixed
//! background of weak diffusion and dissipation:
//!
//! | config | MOR (`α_D`) | CB2 (`α_A`) | entropy (`β_E`) |
//! |--------|:-----------:|:-----------:|:---------------:|
//! | A1     | ✓           | ✓           | ✓               |
//! | A2     | ✓           | ✓           |                 |
//! | A3     | ✓           |             | ✓               |
//! | A4     | ✓           |             |                 |
//! | A5     |             | ✓           | ✓               |
//! | A6     |             | ✓           |                 |
//! | A7     |             |             | ✓               |

use serde::Serialize;
use tracing::info;

use crate::ensemble::{Ensemble, EnsembleMember, InitialCondition};
use crate::error::FieldResult;
use crate::grid::SimulationConfig;
use crate::history::{History, SeriesStats};
use crate::params::ParameterSet;
use crate::scenario::Scenario;

pub const MOR_DRIVE: f64 = 0.667;
pub const CB2_DRIVE: f64 = 0.167;
pub const ENTROPY_FEEDBACK: f64 = 0.269;

/// Number of trailing snapshots summarised in each outcome.
pub const TAIL_WINDOW: usize = 10;

/// One rung of the ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AblationConfig {
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
}

impl AblationConfig {
    pub const ALL: [AblationConfig; 7] = [
        AblationConfig::A1,
        AblationConfig::A2,
        AblationConfig::A3,
        AblationConfig::A4,
        AblationConfig::A5,
        AblationConfig::A6,
        AblationConfig::A7,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AblationConfig::A1 => "A1",
            AblationConfig::A2 => "A2",
            AblationConfig::A3 => "A3",
            AblationConfig::A4 => "A4",
            AblationConfig::A5 => "A5",
            AblationConfig::A6 => "A6",
            AblationConfig::A7 => "A7",
        }
    }

    /// `(mor, cb2, entropy)` switches.
    pub fn drives(&self) -> (bool, bool, bool) {
        match self {
            AblationConfig::A1 => (true, true, true),
            AblationConfig::A2 => (true, true, false),
            AblationConfig::A3 => (true, false, true),
            AblationConfig::A4 => (true, false, false),
            AblationConfig::A5 => (false, true, true),
            AblationConfig::A6 => (false, true, false),
            AblationConfig::A7 => (false, false, true),
        }
    }

    pub fn parameters(&self) -> ParameterSet {
        let (mor, cb2, entropy) = self.drives();
        let on = |enabled: bool, value: f64| if enabled { value } else { 0.0 };
        ParameterSet {
            d_q: 0.005,
            alpha_d: on(mor, MOR_DRIVE),
            alpha_a: on(cb2, CB2_DRIVE),
            beta_e: on(entropy, ENTROPY_FEEDBACK),
            gamma_0: 0.01,
            gamma_1: 0.02,
            gamma_2: 0.02,
            gamma_3: 0.02,
        }
    }
}

/// Summary of one ablation run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AblationOutcome {
    pub config: AblationConfig,
    pub chi_final: f64,
    pub chi_mean: f64,
    pub chi_std: f64,
    pub dopamine_final: f64,
    pub entropy_final: f64,
}

impl AblationOutcome {
    pub fn from_history(config: AblationConfig, history: &History) -> Option<Self> {
        let last = history.last()?;
        let SeriesStats { mean, std } = history.tail_collapse_stats(TAIL_WINDOW)?;
        Some(Self {
            config,
            chi_final: last.collapse_metric,
            chi_mean: mean,
            chi_std: std,
            dopamine_final: last.mean_dopamine(),
            entropy_final: last.mean_entropy(),
        })
    }
}

/// Outcomes for all seven configurations, in ladder order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AblationLadder {
    pub outcomes: Vec<AblationOutcome>,
}

impl AblationLadder {
    /// Configurations sorted by final `χ`, highest first.
    pub fn ranking(&self) -> Vec<AblationConfig> {
        let mut sorted = self.outcomes.clone();
        sorted.sort_by(|a, b| b.chi_final.total_cmp(&a.chi_final));
        sorted.into_iter().map(|o| o.config).collect()
    }

    /// Whether A1 ranks first and A7 last.
    pub fn ordering_holds(&self) -> bool {
        let ranking = self.ranking();
        ranking.first() == Some(&AblationConfig::A1) && ranking.last() == Some(&AblationConfig::A7)
    }

    pub fn get(&self, config: AblationConfig) -> Option<&AblationOutcome> {
        self.outcomes.iter().find(|o| o.config == config)
    }
}

/// Runs A1–A7 from the same degenerative field.
///
/// Any failing run aborts the ladder with its error. A run too short to
/// record a snapshot yields an empty ladder.
pub fn run_ablation_ladder(
    config: SimulationConfig,
    seed: u64,
    save_interval: usize,
) -> FieldResult<AblationLadder> {
    let members: Vec<EnsembleMember> = AblationConfig::ALL
        .iter()
        .map(|c| {
            EnsembleMember::new(
                c.label(),
                InitialCondition::Scenario {
                    scenario: Scenario::Degenerative,
                    seed,
                },
                c.parameters(),
            )
        })
        .collect();

    let outcomes = Ensemble::new(config, save_interval).run(&members);
    let mut ladder = Vec::with_capacity(outcomes.len());
    for (cfg, outcome) in AblationConfig::ALL.iter().zip(outcomes) {
        let history = outcome.result?;
        if let Some(summary) = AblationOutcome::from_history(*cfg, &history) {
            info!(
                config = cfg.label(),
                chi_final = summary.chi_final,
                chi_mean = summary.chi_mean,
                "ablation rung"
            );
            ladder.push(summary);
        }
    }
    Ok(AblationLadder { outcomes: ladder })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(config: AblationConfig, chi: f64) -> AblationOutcome {
        AblationOutcome {
            config,
            chi_final: chi,
            chi_mean: chi,
            chi_std: 0.0,
            dopamine_final: 0.0,
            entropy_final: 0.0,
        }
    }

    #[test]
    fn drive_table_matches_configurations() {
        let a1 = AblationConfig::A1.parameters();
        assert_eq!((a1.alpha_d, a1.alpha_a, a1.beta_e), (MOR_DRIVE, CB2_DRIVE, ENTROPY_FEEDBACK));
        let a5 = AblationConfig::A5.parameters();
        assert_eq!((a5.alpha_d, a5.alpha_a, a5.beta_e), (0.0, CB2_DRIVE, ENTROPY_FEEDBACK));
        let a7 = AblationConfig::A7.parameters();
        assert_eq!((a7.alpha_d, a7.alpha_a), (0.0, 0.0));
        for cfg in AblationConfig::ALL {
            let p = cfg.parameters();
            assert_eq!(p.gamma_0, 0.01);
            assert_eq!(p.channel_dissipation(), [0.02; 3]);
            let (m, c, e) = cfg.drives();
            assert!(m || c || e);
        }
    }

    #[test]
    fn ranking_sorts_by_final_chi() {
        let ladder = AblationLadder {
            outcomes: vec![
                outcome(AblationConfig::A1, 3.0),
                outcome(AblationConfig::A2, 5.0),
                outcome(AblationConfig::A7, 0.5),
            ],
        };
        assert_eq!(
            ladder.ranking(),
            vec![AblationConfig::A2, AblationConfig::A1, AblationConfig::A7]
        );
        assert!(!ladder.ordering_holds());

        let ordered = AblationLadder {
            outcomes: vec![outcome(AblationConfig::A7, 0.1), outcome(AblationConfig::A1, 9.0)],
        };
        assert!(ordered.ordering_holds());
    }

    #[test]
    fn ladder_covers_every_configuration() {
        let ladder = run_ablation_ladder(SimulationConfig::square(6, 0.05, 1.0), 42, 2).unwrap();
        assert_eq!(ladder.outcomes.len(), 7);
        for (outcome, cfg) in ladder.outcomes.iter().zip(AblationConfig::ALL) {
            assert_eq!(outcome.config, cfg);
            assert!(outcome.chi_final.is_finite());
            assert!(outcome.chi_std >= 0.0);
            assert!(outcome.entropy_final >= 0.0);
        }
        assert_eq!(ladder.ranking().len(), 7);
    }
}
