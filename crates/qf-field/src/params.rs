// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Evolution coefficients.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

/// Coefficients of `dQ/dt = D_Q ∇²Q − Γ(Q) + N(Q)`.
///
/// Serialised with the key names used by the parameter tables
/// (`D_Q`, `alpha_D`, `alpha_A`, `beta_E`, `gamma_0` … `gamma_3`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Diffusion coefficient.
    #[serde(rename = "D_Q", alias = "d_q")]
    pub d_q: f64,
    /// Dopaminergic drive.
    #[serde(rename = "alpha_D", alias = "alpha_d")]
    pub alpha_d: f64,
    /// Astrocyte drive.
    #[serde(rename = "alpha_A", alias = "alpha_a")]
    pub alpha_a: f64,
    /// Entropy feedback.
    #[serde(rename = "beta_E", alias = "beta_e")]
    pub beta_e: f64,
    /// Isotropic dissipation; the only dissipation term applied in the step.
    pub gamma_0: f64,
    pub gamma_1: f64,
    pub gamma_2: f64,
    pub gamma_3: f64,
}

impl ParameterSet {
    pub fn healthy() -> Self {
        Self {
            d_q: 0.005,
            alpha_d: 0.5,
            alpha_a: 0.4,
            beta_e: 0.2,
            gamma_0: 0.1,
            gamma_1: 0.05,
            gamma_2: 0.05,
            gamma_3: 0.05,
        }
    }

    pub fn degenerative() -> Self {
        Self {
            alpha_d: 0.1,
            alpha_a: 0.1,
            ..Self::healthy()
        }
    }

    pub fn treatment() -> Self {
        Self {
            alpha_d: 0.8,
            alpha_a: 0.6,
            ..Self::healthy()
        }
    }

    /// Channel-specific dissipation coefficients `γ1..γ3`.
    pub fn channel_dissipation(&self) -> [f64; 3] {
        [self.gamma_1, self.gamma_2, self.gamma_3]
    }

    fn named(&self) -> [(&'static str, f64); 8] {
        [
            ("D_Q", self.d_q),
            ("alpha_D", self.alpha_d),
            ("alpha_A", self.alpha_a),
            ("beta_E", self.beta_e),
            ("gamma_0", self.gamma_0),
            ("gamma_1", self.gamma_1),
            ("gamma_2", self.gamma_2),
            ("gamma_3", self.gamma_3),
        ]
    }

    /// Rejects NaN or infinite coefficients. Sign and magnitude are left to
    /// the caller.
    pub fn validate(&self) -> FieldResult<()> {
        match self.named().into_iter().find(|(_, value)| !value.is_finite()) {
            Some((name, value)) => Err(FieldError::NonFiniteParameter { name, value }),
            None => Ok(()),
        }
    }

    pub fn from_json_str(raw: &str) -> FieldResult<Self> {
        let params: Self = serde_json::from_str(raw)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FieldResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| FieldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_share_everything_but_the_drives() {
        let healthy = ParameterSet::healthy();
        let degenerative = ParameterSet::degenerative();
        let treatment = ParameterSet::treatment();
        assert_eq!((degenerative.alpha_d, degenerative.alpha_a), (0.1, 0.1));
        assert_eq!((treatment.alpha_d, treatment.alpha_a), (0.8, 0.6));
        for preset in [degenerative, treatment] {
            assert_eq!(preset.d_q, healthy.d_q);
            assert_eq!(preset.beta_e, healthy.beta_e);
            assert_eq!(preset.gamma_0, healthy.gamma_0);
            assert_eq!(preset.channel_dissipation(), [0.05; 3]);
        }
    }

    #[test]
    fn parses_table_key_names() {
        let raw = r#"{
            "D_Q": 0.005, "alpha_D": 0.5, "alpha_A": 0.4, "beta_E": 0.2,
            "gamma_0": 0.1, "gamma_1": 0.05, "gamma_2": 0.05, "gamma_3": 0.05
        }"#;
        assert_eq!(
            ParameterSet::from_json_str(raw).unwrap(),
            ParameterSet::healthy()
        );
    }

    #[test]
    fn serialises_with_table_key_names() {
        let json = serde_json::to_value(ParameterSet::treatment()).unwrap();
        assert_eq!(json["D_Q"], 0.005);
        assert_eq!(json["alpha_D"], 0.8);
        assert_eq!(json["gamma_3"], 0.05);
    }

    #[test]
    fn missing_coefficient_is_an_error() {
        let raw = r#"{ "D_Q": 0.005, "alpha_D": 0.5 }"#;
        assert!(matches!(
            ParameterSet::from_json_str(raw),
            Err(FieldError::Json(_))
        ));
    }

    #[test]
    fn non_finite_coefficient_is_named() {
        let params = ParameterSet {
            beta_e: f64::INFINITY,
            ..ParameterSet::healthy()
        };
        match params.validate() {
            Err(FieldError::NonFiniteParameter { name, .. }) => assert_eq!(name, "beta_E"),
            other => panic!("unexpected validation result: {other:?}"),
        }
    }
}
