// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Semi-implicit evolution operator.
//!
//! One step of `dQ/dt = D_Q ∇²Q − Γ(Q) + N(Q)` reads
//!
//! ```text
//! Q⁺_c = (Q_c + dt·N_c(Q) + dt·D_Q·∇²Q_c) / (1 + dt·γ0)
//! ```
//!
//! The forcing `N` is explicit; the isotropic dissipation sits in the
//! denominator.  The channel-specific part of `Γ` (γ1..γ3) is exposed through
//! [`EvolutionOperator::dissipation`] but is not part of the step, which keeps
//! trajectories identical to the reference tables.
//!
//! Both per-cell operators come from left quaternion products:
//! `Γ` sums `q` with the conjugations `u·q·u` for `u ∈ {i, j, k}`, and `N` is
//! `α_D·(i·q) + α_A·(j·q) − β_E·φ_E·(i·q)` with `φ_E = q1² + q2² + q3²`.

use ndarray::{Array3, Axis, Zip};

use crate::field::{laplacian_into, QuaternionField, CHANNELS};
use crate::params::ParameterSet;

/// `Γ(q)` at a single cell.
#[inline]
pub fn dissipation_cell(q: [f64; CHANNELS], p: &ParameterSet) -> [f64; CHANNELS] {
    let [q0, q1, q2, q3] = q;
    let g = p.gamma_0;
    let mut out = [g * q0, g * q1, g * q2, g * q3];
    // u·q·u negates exactly the u-component.
    for (axis, gamma) in p.channel_dissipation().into_iter().enumerate() {
        for (c, value) in q.iter().enumerate() {
            let sign = if c == axis + 1 { -1.0 } else { 1.0 };
            out[c] += gamma * sign * value;
        }
    }
    out
}

/// `N(q)` at a single cell.
#[inline]
pub fn forcing_cell(q: [f64; CHANNELS], p: &ParameterSet) -> [f64; CHANNELS] {
    let [q0, q1, q2, q3] = q;
    let phi = q1 * q1 + q2 * q2 + q3 * q3;
    let feedback = p.beta_e * phi;
    [
        -p.alpha_d * q1 - p.alpha_a * q2 + feedback * q1,
        p.alpha_d * q0 + p.alpha_a * q3 - feedback * q0,
        -p.alpha_d * q3 + p.alpha_a * q0 + feedback * q3,
        p.alpha_d * q2 - p.alpha_a * q1 - feedback * q2,
    ]
}

/// Reusable buffers for [`EvolutionOperator::step`].
#[derive(Clone, Debug)]
pub struct StepScratch {
    forcing: Array3<f64>,
    next: Array3<f64>,
}

impl StepScratch {
    pub fn for_field(field: &QuaternionField) -> Self {
        let shape = field.as_array().raw_dim();
        Self {
            forcing: Array3::zeros(shape.clone()),
            next: Array3::zeros(shape),
        }
    }

    fn matches(&self, field: &QuaternionField) -> bool {
        self.next.shape() == field.as_array().shape()
    }
}

/// Advances a field by one time step under a fixed parameter set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvolutionOperator {
    params: ParameterSet,
    dt: f64,
}

impl EvolutionOperator {
    pub fn new(params: ParameterSet, dt: f64) -> Self {
        Self { params, dt }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Full dissipation `Γ(Q)` over the grid.
    pub fn dissipation(&self, field: &QuaternionField) -> Array3<f64> {
        self.map_cells(field, dissipation_cell)
    }

    /// Nonlinear forcing `N(Q)` over the grid.
    pub fn nonlinear_forcing(&self, field: &QuaternionField) -> Array3<f64> {
        self.map_cells(field, forcing_cell)
    }

    fn map_cells(
        &self,
        field: &QuaternionField,
        op: fn([f64; CHANNELS], &ParameterSet) -> [f64; CHANNELS],
    ) -> Array3<f64> {
        let mut out = Array3::zeros(field.as_array().raw_dim());
        write_cells(field, &self.params, op, &mut out);
        out
    }

    /// Replaces `field` with its state one step later.
    ///
    /// The new state is assembled in `scratch` and swapped in at the end, so
    /// the field is never observed half-updated.
    pub fn step(&self, field: &mut QuaternionField, scratch: &mut StepScratch) {
        if !scratch.matches(field) {
            *scratch = StepScratch::for_field(field);
        }
        let dt = self.dt;
        let diffusion = dt * self.params.d_q;
        let denom = 1.0 + dt * self.params.gamma_0;
        let dx = field.grid().dx();

        write_cells(field, &self.params, forcing_cell, &mut scratch.forcing);

        for c in 0..CHANNELS {
            let src = field.channel(c);
            let mut dst = scratch.next.index_axis_mut(Axis(0), c);
            laplacian_into(src, dx, &mut dst);
            Zip::from(&mut dst)
                .and(&src)
                .and(scratch.forcing.index_axis(Axis(0), c))
                .for_each(|out, &q, &n| {
                    let lap = *out;
                    *out = (q + dt * n + diffusion * lap) / denom;
                });
        }

        std::mem::swap(field.as_array_mut(), &mut scratch.next);
    }
}

fn write_cells(
    field: &QuaternionField,
    params: &ParameterSet,
    op: fn([f64; CHANNELS], &ParameterSet) -> [f64; CHANNELS],
    out: &mut Array3<f64>,
) {
    Zip::from(out.lanes_mut(Axis(0)))
        .and(field.as_array().lanes(Axis(0)))
        .for_each(|mut dst, q| {
            let values = op([q[0], q[1], q[2], q[3]], params);
            for (slot, value) in dst.iter_mut().zip(values) {
                *slot = value;
            }
        });
}
