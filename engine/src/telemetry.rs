//! Telemetry and Observability
//!
//! Installs the `tracing-subscriber` registry that every component logs
//! through. Handlers open an `api_request` span carrying `request_id`,
//! `route` and `action`; the orchestrator and completion client add
//! `role`, `phase` and token counts as event fields. In JSON output the
//! current span is flattened into each event, so a single request can be
//! followed with a filter on `request_id`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How log events are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-oriented terminal output
    Pretty,
    /// One JSON object per event, with the enclosing span's fields
    Json,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Filter directives used when `RUST_LOG` is not set
///
/// The engine logs at `log_level`. `tower_http` request/response spans
/// follow it, except at `trace` where they are held at `debug` because
/// the trace level logs every body chunk.
pub fn filter_directives(log_level: &str) -> String {
    let http_level = match log_level {
        "trace" => "debug",
        other => other,
    };
    format!(
        "{},hearth_engine={},tower_http={}",
        log_level, log_level, http_level
    )
}

/// Initialize the tracing subscriber with the given log level from config.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter.
/// The output format follows the build profile, see `LogFormat::for_build`.
pub fn init_telemetry_with_level(log_level: &str) {
    init_telemetry(log_level, LogFormat::for_build());
}

/// Initialize the tracing subscriber with an explicit format.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_telemetry(log_level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(log_level, ?format, "Telemetry initialized");
    }
}
