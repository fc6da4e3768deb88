// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const CHROME_ENV: &str = "QF_TRACE_CHROME";

/// Subscriber settings.
///
/// Log records go to stderr so reports printed on stdout stay parseable.
/// `RUST_LOG` always wins over [`default_filter`](Self::default_filter).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracingConfig {
    pub default_filter: String,
    /// Chrome trace destination; read from `QF_TRACE_CHROME` by `from_env`.
    pub chrome_trace: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_owned(),
            chrome_trace: None,
            ansi: std::io::stderr().is_terminal(),
        }
    }
}

impl TracingConfig {
    pub fn from_env() -> Result<Self, InitError> {
        let chrome_trace = match std::env::var(CHROME_ENV) {
            Ok(raw) if !raw.trim().is_empty() => Some(PathBuf::from(raw.trim())),
            Ok(_) | Err(std::env::VarError::NotPresent) => None,
            Err(err) => return Err(InitError::Env(err)),
        };
        Ok(Self {
            chrome_trace,
            ..Self::default()
        })
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    fn filter(&self) -> Result<EnvFilter, InitError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.default_filter)
                .map_err(|err| InitError::Filter(err.to_string())),
        }
    }

    /// Installs the global subscriber. Keep the guard alive for the whole
    /// process; dropping it completes the Chrome trace file.
    pub fn install(self) -> Result<TracingGuard, InitError> {
        let filter = self.filter()?;
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(self.ansi)
            .with_writer(std::io::stderr);

        let chrome = match self.chrome_trace {
            Some(path) => {
                let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                    .file(path)
                    .include_args(true)
                    .build();
                Registry::default()
                    .with(filter)
                    .with(fmt_layer)
                    .with(layer)
                    .try_init()
                    .map_err(|_| InitError::AlreadyInitialised)?;
                Some(guard)
            }
            None => {
                Registry::default()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
                    .map_err(|_| InitError::AlreadyInitialised)?;
                None
            }
        };
        Ok(TracingGuard { _chrome: chrome })
    }
}

/// Holds the Chrome trace writer open.
#[must_use = "dropping the guard flushes and closes the Chrome trace"]
pub struct TracingGuard {
    _chrome: Option<tracing_chrome::FlushGuard>,
}

/// Installs the subscriber from the environment with `default_filter`
/// applied when `RUST_LOG` is unset.
pub fn init_tracing(default_filter: &str) -> Result<TracingGuard, InitError> {
    TracingConfig::from_env()?
        .with_default_filter(default_filter)
        .install()
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read QF_TRACE_CHROME: {0}")]
    Env(std::env::VarError),
    #[error("invalid log filter: {0}")]
    Filter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_overridable() {
        let cfg = TracingConfig::default().with_default_filter("qf_field=debug");
        assert_eq!(cfg.default_filter, "qf_field=debug");
        assert!(cfg.chrome_trace.is_none());
    }

    #[test]
    fn second_install_is_rejected() {
        let cfg = TracingConfig {
            ansi: false,
            ..TracingConfig::default()
        };
        let first = cfg.clone().install();
        let second = cfg.install();
        assert!(first.is_ok());
        assert!(matches!(second, Err(InitError::AlreadyInitialised)));
    }
}
