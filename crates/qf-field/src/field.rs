// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Four-channel field state `Q = q0 + q1·i + q2·j + q3·k` on a periodic grid.
//!
//! Storage is a single `Array3<f64>` of shape `(4, nx, ny)`; channel 0 is the
//! real component and channels 1–3 the imaginary ones.  The shape is fixed by
//! the [`Grid`] the field was built for.

use ndarray::{Array2, Array3, ArrayView2, ArrayViewMut2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{FieldError, FieldResult};
use crate::grid::Grid;
use crate::scenario::InitialDistribution;

/// Number of quaternion channels.
pub const CHANNELS: usize = 4;

/// Owned field state.
#[derive(Clone, Debug, PartialEq)]
pub struct QuaternionField {
    grid: Grid,
    data: Array3<f64>,
}

impl QuaternionField {
    /// All-zero field.
    pub fn zeros(grid: Grid) -> Self {
        let (nx, ny) = grid.dims();
        Self {
            grid,
            data: Array3::zeros((CHANNELS, nx, ny)),
        }
    }

    /// Same 4-vector in every cell.
    pub fn uniform(grid: Grid, q: [f64; CHANNELS]) -> Self {
        let mut field = Self::zeros(grid);
        for (c, value) in q.into_iter().enumerate() {
            field.data.index_axis_mut(Axis(0), c).fill(value);
        }
        field
    }

    /// Wraps an externally prepared array after checking its shape.
    pub fn from_array(grid: Grid, data: Array3<f64>) -> FieldResult<Self> {
        let (nx, ny) = grid.dims();
        if data.shape() != [CHANNELS, nx, ny] {
            return Err(FieldError::ShapeMismatch {
                expected: [CHANNELS, nx, ny],
                actual: data.shape().to_vec(),
            });
        }
        Ok(Self { grid, data })
    }

    /// Draws every channel from its own Gaussian using a seeded stream.
    ///
    /// Channels are filled in order, row-major within each channel, so the
    /// same seed always produces the same field.
    pub fn sample(grid: Grid, distribution: &InitialDistribution, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut field = Self::zeros(grid);
        for (c, channel) in distribution.iter().enumerate() {
            for value in field.data.index_axis_mut(Axis(0), c).iter_mut() {
                let z: f64 = StandardNormal.sample(&mut rng);
                *value = channel.mean + channel.std * z;
            }
        }
        field
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.data
    }

    pub(crate) fn as_array_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    pub fn into_array(self) -> Array3<f64> {
        self.data
    }

    pub fn channel(&self, c: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), c)
    }

    pub fn channel_mut(&mut self, c: usize) -> ArrayViewMut2<'_, f64> {
        self.data.index_axis_mut(Axis(0), c)
    }

    /// The four channel values at one cell.
    #[inline]
    pub fn cell(&self, x: usize, y: usize) -> [f64; CHANNELS] {
        [
            self.data[[0, x, y]],
            self.data[[1, x, y]],
            self.data[[2, x, y]],
            self.data[[3, x, y]],
        ]
    }

    /// Periodic 5-point Laplacian of one channel, divided by `dx²`.
    pub fn laplacian(&self, c: usize) -> Array2<f64> {
        let mut out = Array2::zeros(self.grid.dims());
        laplacian_into(self.channel(c), self.grid.dx(), &mut out.view_mut());
        out
    }

    /// First channel holding a NaN or infinite value, if any.
    pub fn first_non_finite_channel(&self) -> Option<usize> {
        (0..CHANNELS).find(|&c| self.channel(c).iter().any(|v| !v.is_finite()))
    }
}

/// Writes the periodic Laplacian of `src` into `out`.
pub(crate) fn laplacian_into(src: ArrayView2<'_, f64>, dx: f64, out: &mut ArrayViewMut2<'_, f64>) {
    let (nx, ny) = src.dim();
    let inv_dx2 = 1.0 / (dx * dx);
    for x in 0..nx {
        let xm = if x == 0 { nx - 1 } else { x - 1 };
        let xp = if x + 1 == nx { 0 } else { x + 1 };
        for y in 0..ny {
            let ym = if y == 0 { ny - 1 } else { y - 1 };
            let yp = if y + 1 == ny { 0 } else { y + 1 };
            let centre = src[[x, y]];
            out[[x, y]] = (src[[xp, y]] + src[[xm, y]] + src[[x, yp]] + src[[x, ym]]
                - 4.0 * centre)
                * inv_dx2;
        }
    }
}
