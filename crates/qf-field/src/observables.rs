// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Derived observables: density projections and the collapse metric.
//!
//! ```text
//! φ_E = q1² + q2² + q3²      entropy density
//! ψ_D = q0²                  dopaminergic density
//! A   = q2²                  astrocyte density
//!
//!        α_D·‖q0‖² + α_A·‖q2‖² + β_E·∫φ_E
//! χ = ─────────────────────────────────────
//!              ∫‖∇Q‖² + γ0
//! ```
//!
//! Norms and integrals are cell-area weighted sums.  Gradients use central
//! differences inside the domain and one-sided differences on its edges.

use ndarray::{Array2, ArrayView2, Axis};

use crate::field::{QuaternionField, CHANNELS};
use crate::params::ParameterSet;

/// `q1² + q2² + q3²` per cell.
pub fn entropy_density(field: &QuaternionField) -> Array2<f64> {
    let mut out = field.channel(1).mapv(|v| v * v);
    for c in 2..CHANNELS {
        out.zip_mut_with(&field.channel(c), |acc, &v| *acc += v * v);
    }
    out
}

/// `q0²` per cell.
pub fn dopamine_density(field: &QuaternionField) -> Array2<f64> {
    field.channel(0).mapv(|v| v * v)
}

/// `q2²` per cell.
pub fn astrocyte_density(field: &QuaternionField) -> Array2<f64> {
    field.channel(2).mapv(|v| v * v)
}

/// Cell-area weighted sum.
pub fn integrate(values: ArrayView2<'_, f64>, dx: f64) -> f64 {
    values.sum() * dx * dx
}

/// `sqrt(Σ q_c² · dx²)` for each channel.
pub fn channel_norms(field: &QuaternionField) -> [f64; CHANNELS] {
    let dx = field.grid().dx();
    let mut norms = [0.0; CHANNELS];
    for (c, norm) in norms.iter_mut().enumerate() {
        let sq: f64 = field.channel(c).iter().map(|v| v * v).sum();
        *norm = (sq * dx * dx).sqrt();
    }
    norms
}

/// Derivative of `values` along `axis` with spacing `dx`.
///
/// Interior points use `(f[i+1] − f[i−1]) / 2`, the first and last points
/// first-order one-sided differences.  The axis must hold at least two
/// samples.
pub fn gradient(values: ArrayView2<'_, f64>, axis: Axis, dx: f64) -> Array2<f64> {
    let mut out = Array2::zeros(values.raw_dim());
    let n = values.len_of(axis);
    for (src, mut dst) in values.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        dst[0] = (src[1] - src[0]) / dx;
        dst[n - 1] = (src[n - 1] - src[n - 2]) / dx;
        for i in 1..n - 1 {
            dst[i] = 0.5 * (src[i + 1] - src[i - 1]) / dx;
        }
    }
    out
}

/// `∫‖∇Q‖²` summed over all channels and both axes.
pub fn gradient_energy(field: &QuaternionField) -> f64 {
    let dx = field.grid().dx();
    let mut total = 0.0;
    for c in 0..CHANNELS {
        let channel = field.channel(c);
        for axis in [Axis(0), Axis(1)] {
            let grad = gradient(channel, axis, dx);
            total += grad.iter().map(|g| g * g).sum::<f64>() * dx * dx;
        }
    }
    total
}

/// Scalar collapse metric `χ`; exactly `0.0` when the denominator is not
/// positive.
pub fn collapse_metric(field: &QuaternionField, params: &ParameterSet) -> f64 {
    let dx = field.grid().dx();
    let dopamine = integrate(dopamine_density(field).view(), dx);
    let astrocyte = integrate(astrocyte_density(field).view(), dx);
    let entropy = integrate(entropy_density(field).view(), dx);

    let numerator = params.alpha_d * dopamine + params.alpha_a * astrocyte + params.beta_e * entropy;
    let denominator = gradient_energy(field) + params.gamma_0;

    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Derived fields and scalars at one instant.
#[derive(Clone, Debug)]
pub struct Observables {
    pub entropy: Array2<f64>,
    pub dopamine: Array2<f64>,
    pub astrocyte: Array2<f64>,
    pub collapse_metric: f64,
    pub channel_norms: [f64; CHANNELS],
}

impl Observables {
    pub fn measure(field: &QuaternionField, params: &ParameterSet) -> Self {
        Self {
            entropy: entropy_density(field),
            dopamine: dopamine_density(field),
            astrocyte: astrocyte_density(field),
            collapse_metric: collapse_metric(field, params),
            channel_norms: channel_norms(field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::{array, Array3};

    fn grid(nx: usize, ny: usize, dx: f64) -> Grid {
        Grid::with_cells(nx, ny, dx).unwrap()
    }

    #[test]
    fn densities_are_squares_of_their_channels() {
        let field = QuaternionField::uniform(grid(2, 2, 1.0), [2.0, -1.0, 3.0, 0.5]);
        assert!(dopamine_density(&field).iter().all(|v| *v == 4.0));
        assert!(astrocyte_density(&field).iter().all(|v| *v == 9.0));
        assert!(entropy_density(&field).iter().all(|v| *v == 1.0 + 9.0 + 0.25));
    }

    #[test]
    fn gradient_uses_one_sided_edges() {
        let values = array![[0.0, 1.0, 4.0, 9.0]];
        let grad = gradient(values.view(), Axis(1), 1.0);
        assert_eq!(grad, array![[1.0, 2.0, 4.0, 5.0]]);
        let grad = gradient(values.t(), Axis(0), 0.5);
        assert_eq!(grad.column(0).to_vec(), vec![2.0, 4.0, 8.0, 10.0]);
    }

    #[test]
    fn gradient_energy_of_linear_ramp() {
        let g = grid(3, 4, 2.0);
        let mut data = Array3::zeros((4, 3, 4));
        for x in 0..3 {
            for y in 0..4 {
                data[[0, x, y]] = 2.0 * x as f64;
            }
        }
        let field = QuaternionField::from_array(g, data).unwrap();
        // ∂x = 2/dx = 1 on every cell, ∂y = 0; 12 cells · 1 · dx².
        assert_abs_diff_eq!(gradient_energy(&field), 48.0);
    }

    #[test]
    fn zero_field_has_zero_collapse_metric() {
        let field = QuaternionField::zeros(grid(5, 5, 1.0));
        let degenerate = ParameterSet {
            gamma_0: 0.0,
            ..ParameterSet::healthy()
        };
        let chi = collapse_metric(&field, &degenerate);
        assert_eq!(chi, 0.0);
        assert!(!chi.is_nan());
        assert_eq!(collapse_metric(&field, &ParameterSet::healthy()), 0.0);
    }

    #[test]
    fn uniform_field_reduces_to_numerator_over_gamma() {
        let field = QuaternionField::uniform(grid(4, 4, 0.5), [1.0, 0.5, 0.5, 0.0]);
        let params = ParameterSet::healthy();
        let area = 16.0 * 0.25;
        let numerator = params.alpha_d * 1.0 * area
            + params.alpha_a * 0.25 * area
            + params.beta_e * 0.5 * area;
        assert_relative_eq!(
            collapse_metric(&field, &params),
            numerator / params.gamma_0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn channel_norms_are_area_weighted() {
        let field = QuaternionField::uniform(grid(2, 8, 0.5), [1.0, 2.0, 0.0, -3.0]);
        let norms = channel_norms(&field);
        // 16 cells · 0.25 area = 4
        assert_relative_eq!(norms[0], 2.0);
        assert_relative_eq!(norms[1], 4.0);
        assert_eq!(norms[2], 0.0);
        assert_relative_eq!(norms[3], 6.0);
    }

    #[test]
    fn negative_gamma_cancelling_gradients_hits_the_guard() {
        let g = grid(2, 2, 1.0);
        let mut data = Array3::zeros((4, 2, 2));
        data[[0, 1, 0]] = 1.0;
        data[[0, 1, 1]] = 1.0;
        let field = QuaternionField::from_array(g, data).unwrap();
        let energy = gradient_energy(&field);
        let params = ParameterSet {
            gamma_0: -energy,
            ..ParameterSet::healthy()
        };
        assert_eq!(collapse_metric(&field, &params), 0.0);
    }
}
