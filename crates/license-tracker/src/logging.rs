//! Tracing setup for `lictrack`.
//!
//! Log lines go to stderr so the `list --json`, `stats --json` and
//! `config show --json` output on stdout stays machine readable.

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target the default filter applies to.
const CRATE_TARGET: &str = "license_tracker";

/// How much `lictrack` logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// Store mutations, exports and one line per HTTP request.
    #[default]
    Normal,
    /// Adds store loads/saves and request span timings (`-v`).
    Verbose,
    /// Everything (`-vv`).
    Trace,
}

impl Verbosity {
    /// Pick a verbosity from the `-q` flag and the `-v` count; `-q` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Most detailed level emitted.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    #[must_use]
    pub fn directive(self) -> String {
        format!("{CRATE_TARGET}={}", self.level())
    }

    /// Span lifecycle events to print. With `-v` every `http.request`
    /// span reports its busy and idle time when it closes.
    #[must_use]
    pub fn span_events(self) -> FmtSpan {
        match self {
            Self::Quiet | Self::Normal => FmtSpan::NONE,
            Self::Verbose | Self::Trace => FmtSpan::CLOSE,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `verbosity`.
///
/// Later calls are no-ops.
///
/// ```no_run
/// use license_tracker::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(verbosity.span_events()),
        )
        .try_init();
}

/// Warnings and errors only, captured per test.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
