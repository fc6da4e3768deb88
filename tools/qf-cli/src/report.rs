// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! JSON payloads written by the CLI.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use qf_field::{
    AblationConfig, AblationLadder, BasinReport, History, HistorySummary, ParameterSet,
    RobustnessReport, Scenario, SeparationReport, SimulationConfig, Snapshot,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub scenario: Scenario,
    pub seed: u64,
    pub simulation: SimulationConfig,
    pub parameters: ParameterSet,
    pub save_interval: usize,
    pub final_collapse_metric: Option<f64>,
    pub series: HistorySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<Vec<Snapshot>>,
}

impl RunReport {
    pub fn new(
        scenario: Scenario,
        seed: u64,
        simulation: SimulationConfig,
        parameters: ParameterSet,
        history: History,
        full: bool,
    ) -> Self {
        let series = history.summary();
        Self {
            scenario,
            seed,
            simulation,
            parameters,
            save_interval: history.save_interval(),
            final_collapse_metric: history.final_collapse_metric(),
            series,
            snapshots: full.then(|| history.into_snapshots()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberSummary {
    pub label: String,
    pub final_collapse_metric: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub seed: u64,
    pub simulation: SimulationConfig,
    pub save_interval: usize,
    pub members: Vec<MemberSummary>,
    pub separation: Option<SeparationReport>,
    pub separated: bool,
}

#[derive(Debug, Serialize)]
pub struct AblationReport {
    pub seed: u64,
    pub simulation: SimulationConfig,
    pub save_interval: usize,
    #[serde(flatten)]
    pub ladder: AblationLadder,
    pub ranking: Vec<AblationConfig>,
    pub ordering_holds: bool,
}

impl AblationReport {
    pub fn new(seed: u64, simulation: SimulationConfig, save_interval: usize, ladder: AblationLadder) -> Self {
        Self {
            seed,
            simulation,
            save_interval,
            ranking: ladder.ranking(),
            ordering_holds: ladder.ordering_holds(),
            ladder,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BasinSweepReport {
    pub seed: u64,
    pub simulation: SimulationConfig,
    pub save_interval: usize,
    #[serde(flatten)]
    pub sweep: BasinReport,
}

#[derive(Debug, Serialize)]
pub struct RobustnessSweepReport {
    pub seed: u64,
    pub simulation: SimulationConfig,
    pub save_interval: usize,
    #[serde(flatten)]
    pub sweep: RobustnessReport,
    pub all_preserved: bool,
}

impl RobustnessSweepReport {
    pub fn new(seed: u64, simulation: SimulationConfig, save_interval: usize, sweep: RobustnessReport) -> Self {
        Self {
            seed,
            simulation,
            save_interval,
            all_preserved: sweep.all_preserved(),
            sweep,
        }
    }
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let payload = serde_json::to_string_pretty(value).context("failed to serialise report")?;
    fs::write(path, payload).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
