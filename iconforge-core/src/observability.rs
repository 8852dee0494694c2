//! Logging setup and span constructors.
//!
//! Logs go to stderr so stdout stays reserved for JSON reports.

use std::io;
use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable logs.
    #[default]
    Pretty,
    /// One JSON object per event (for CI).
    Json,
}

/// Initializes the global subscriber. Subsequent calls are no-ops.
///
/// `RUST_LOG` overrides the default `info` level.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // A subscriber installed elsewhere (tests) wins.
        let _ = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).with_writer(io::stderr))
                .try_init(),
        };
    });
}

/// Span covering one pipeline invocation.
#[must_use]
pub fn build_span(operation: &str, build_id: &str) -> Span {
    tracing::info_span!("build", op = operation, build_id = build_id)
}
