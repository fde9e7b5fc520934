/*!
 * Tracing
 * Structured operational logging using the tracing crate
 *
 * The audit trail is separate (see `permissions::audit`); this is the
 * channel for cache misses, store failures and dropped audit events.
 * Everything goes to stderr so stdout stays free for command output.
 */

use std::io::IsTerminal;
use tracing::info;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Output format of the operational log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    /// Compact human-readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

impl TraceFormat {
    /// `PERMISSIONS_TRACE_JSON=1|true` selects JSON
    pub fn from_env() -> Self {
        Self::from_flag(std::env::var("PERMISSIONS_TRACE_JSON").ok().as_deref())
    }

    fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("1") | Some("true") => TraceFormat::Json,
            _ => TraceFormat::Pretty,
        }
    }
}

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - PERMISSIONS_TRACE_JSON: Enable JSON output (default: false)
///
/// Output is written to stderr.
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match TraceFormat::from_env() {
        TraceFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok(),
        TraceFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_target(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()
            .is_ok(),
    };

    if installed {
        info!("Structured tracing initialized");
    }
    installed
}
