// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// Seed used when neither a flag nor `QF_SEED` provides one.
pub const DEFAULT_SEED: u64 = 42;

/// Process-wide determinism settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterminismConfig {
    /// Base seed used to derive per-run seeds.
    pub base_seed: u64,
    /// If true, batch drivers should run their members one after another
    /// instead of fanning out over the thread pool.
    pub sequential: bool,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            base_seed: DEFAULT_SEED,
            sequential: false,
        }
    }
}

impl DeterminismConfig {
    /// Builds a configuration snapshot from environment variables.
    pub fn from_env() -> Self {
        let base_seed = std::env::var("QF_SEED")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SEED);

        let sequential = std::env::var("QF_SEQUENTIAL")
            .ok()
            .map(|v| matches!(v.trim(), "1" | "true" | "True" | "on" | "ON"))
            .unwrap_or(false);

        Self {
            base_seed,
            sequential,
        }
    }

    /// Derives a deterministic seed for a given label.
    pub fn seed_for<L: Hash>(&self, label: L) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.base_seed.hash(&mut hasher);
        label.hash(&mut hasher);
        hasher.finish()
    }

    /// Returns the explicit seed when present, otherwise the base seed.
    pub fn seed_or_base(&self, seed: Option<u64>) -> u64 {
        seed.unwrap_or(self.base_seed)
    }
}

static CONFIG: OnceLock<DeterminismConfig> = OnceLock::new();

/// Returns the lazily initialised determinism configuration.
pub fn config() -> &'static DeterminismConfig {
    CONFIG.get_or_init(DeterminismConfig::from_env)
}

/// Overrides the determinism configuration. Only effective before the first
/// call to [`config`].
pub fn configure(cfg: DeterminismConfig) -> &'static DeterminismConfig {
    CONFIG.get_or_init(|| cfg)
}

/// Returns whether batch execution should be forced to run sequentially.
pub fn lock_execution_order() -> bool {
    config().sequential
}
