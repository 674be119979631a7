//! Logging initialisation and span helpers
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the host process. [`init_logging`] is the default setup used by the
//! `gooey-render` binary.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs
    Json,
    /// Human-readable logs
    #[default]
    Pretty,
}

impl LogFormat {
    /// `json` selects [`LogFormat::Json`], anything else is pretty
    pub fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Install a global subscriber writing to stderr
///
/// Honours `RUST_LOG` (default `info`). Safe to call more than once; only the
/// first call has an effect.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let result = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init(),
        };
        // another subscriber was installed first; keep it
        let _ = result;
    });
}

/// Span covering one render invocation
#[must_use]
pub fn render_span(state_keys: usize, query_params: usize) -> Span {
    tracing::info_span!(
        "render",
        state_keys = state_keys,
        query_params = query_params,
        passes = tracing::field::Empty,
    )
}
