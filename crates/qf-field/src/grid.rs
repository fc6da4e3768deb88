// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Spatial and temporal discretisation.
//!
//! The domain is a periodic rectangle `[0, lx) × [0, ly)` sampled with a
//! single spacing `dx` on both axes.  Time advances in fixed steps `dt` up to
//! `t_total`.  The explicit diffusion term is only stable while
//! `dt · D_Q / dx²` stays below [`STABILITY_LIMIT`]; this is advisory and is
//! never enforced.

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

/// Advisory upper bound for `dt · D_Q / dx²`.
pub const STABILITY_LIMIT: f64 = 0.25;

/// Largest step count a single run may request.
pub const MAX_STEPS: usize = 100_000_000;

const STEP_TOLERANCE: f64 = 1e-9;

/// Cell layout of the simulation domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    nx: usize,
    ny: usize,
    dx: f64,
}

impl Grid {
    /// Builds a grid covering `lx × ly` with spacing `dx`.
    pub fn new(lx: f64, ly: f64, dx: f64) -> FieldResult<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(lx) && valid(ly) && valid(dx)) {
            return Err(FieldError::InvalidGrid { lx, ly, dx });
        }
        let nx = (lx / dx).floor() as usize;
        let ny = (ly / dx).floor() as usize;
        Self::with_cells(nx, ny, dx)
    }

    /// Builds a grid directly from its cell counts.
    pub fn with_cells(nx: usize, ny: usize, dx: f64) -> FieldResult<Self> {
        if !(dx.is_finite() && dx > 0.0) {
            return Err(FieldError::InvalidGrid {
                lx: nx as f64 * dx,
                ly: ny as f64 * dx,
                dx,
            });
        }
        if nx < 2 || ny < 2 {
            return Err(FieldError::GridTooSmall { nx, ny });
        }
        Ok(Self { nx, ny, dx })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// `(nx, ny)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Number of cells on the grid.
    pub fn cells(&self) -> usize {
        self.nx * self.ny
    }

    /// Area weight applied when integrating over the grid.
    pub fn cell_area(&self) -> f64 {
        self.dx * self.dx
    }

    /// `dt · D_Q / dx²`.
    pub fn stability_number(&self, dt: f64, diffusion: f64) -> f64 {
        dt * diffusion / self.cell_area()
    }
}

/// Grid extents and time stepping for a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Domain extent along x.
    pub lx: f64,
    /// Domain extent along y.
    pub ly: f64,
    /// Cell spacing on both axes.
    pub dx: f64,
    /// Time step.
    pub dt: f64,
    /// Total simulated time.
    pub t_total: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            lx: 50.0,
            ly: 50.0,
            dx: 1.0,
            dt: 0.02,
            t_total: 40.0,
        }
    }
}

impl SimulationConfig {
    pub fn new(lx: f64, ly: f64, dx: f64, dt: f64, t_total: f64) -> Self {
        Self {
            lx,
            ly,
            dx,
            dt,
            t_total,
        }
    }

    /// Square domain of `cells × cells` with unit spacing.
    pub fn square(cells: usize, dt: f64, t_total: f64) -> Self {
        Self::new(cells as f64, cells as f64, 1.0, dt, t_total)
    }

    /// Validates the time settings and returns the grid.
    pub fn grid(&self) -> FieldResult<Grid> {
        self.validate_time()?;
        Grid::new(self.lx, self.ly, self.dx)
    }

    fn validate_time(&self) -> FieldResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(FieldError::InvalidTimeStep(self.dt));
        }
        if !(self.t_total.is_finite() && self.t_total >= 0.0) {
            return Err(FieldError::InvalidDuration(self.t_total));
        }
        let ratio = self.t_total / self.dt;
        if !(ratio.is_finite() && ratio * (1.0 + STEP_TOLERANCE) < (MAX_STEPS + 1) as f64) {
            return Err(FieldError::TooManySteps {
                t_total: self.t_total,
                dt: self.dt,
                limit: MAX_STEPS,
            });
        }
        Ok(())
    }

    /// `floor(t_total / dt)`, tolerant to representation error in `dt`.
    pub fn total_steps(&self) -> usize {
        let ratio = self.t_total / self.dt;
        (ratio * (1.0 + STEP_TOLERANCE)).floor() as usize
    }
}
