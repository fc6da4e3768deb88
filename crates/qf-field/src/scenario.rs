// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! The three canonical regimes and their initial-condition distributions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::params::ParameterSet;

/// Gaussian used to draw one channel of the initial field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelDistribution {
    pub mean: f64,
    pub std: f64,
}

impl ChannelDistribution {
    pub const fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }
}

/// Per-channel initial distributions, channel 0 first.
pub type InitialDistribution = [ChannelDistribution; 4];

const HEALTHY_INIT: InitialDistribution = [
    ChannelDistribution::new(0.8, 0.1),
    ChannelDistribution::new(0.1, 0.05),
    ChannelDistribution::new(0.5, 0.1),
    ChannelDistribution::new(0.1, 0.05),
];

const DEGENERATIVE_INIT: InitialDistribution = [
    ChannelDistribution::new(0.2, 0.1),
    ChannelDistribution::new(0.8, 0.1),
    ChannelDistribution::new(0.2, 0.1),
    ChannelDistribution::new(0.3, 0.1),
];

/// Named initial regime.
///
/// Deserialisation goes through [`FromStr`], so JSON configs and CLI flags
/// accept the same spellings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Scenario {
    /// High real component, low imaginary mass.
    Healthy,
    /// Low real component, high imaginary mass.
    Degenerative,
    /// Degenerative start under the stronger treatment drives.
    Treatment,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Healthy, Scenario::Degenerative, Scenario::Treatment];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Healthy => "healthy",
            Scenario::Degenerative => "degenerative",
            Scenario::Treatment => "treatment",
        }
    }

    pub fn initial_distribution(&self) -> InitialDistribution {
        match self {
            Scenario::Healthy => HEALTHY_INIT,
            Scenario::Degenerative | Scenario::Treatment => DEGENERATIVE_INIT,
        }
    }

    /// The parameter set conventionally paired with this scenario.
    pub fn canonical_parameters(&self) -> ParameterSet {
        match self {
            Scenario::Healthy => ParameterSet::healthy(),
            Scenario::Degenerative => ParameterSet::degenerative(),
            Scenario::Treatment => ParameterSet::treatment(),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for Scenario {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Scenario {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => Ok(Scenario::Healthy),
            "degenerative" => Ok(Scenario::Degenerative),
            "treatment" | "ren01" => Ok(Scenario::Treatment),
            _ => Err(FieldError::UnknownScenario(s.to_string())),
        }
    }
}
