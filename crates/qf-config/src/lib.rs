// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-level configuration shared by the QuatField crates: seed
//! derivation, execution-order locking, and tracing subscriber setup.

pub mod determinism;
pub mod tracing;

pub use determinism::{DeterminismConfig, DEFAULT_SEED};
pub use tracing::{init_tracing, InitError, TracingConfig, TracingGuard};
