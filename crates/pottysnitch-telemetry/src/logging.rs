//! Structured logging configuration.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

use crate::TelemetryConfig;

/// Builds the log filter. `RUST_LOG` takes precedence over the configured level.
///
/// HTTP request traces from `tower_http` follow the configured level unless it is more
/// verbose than `debug`.
#[must_use]
pub fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.log_level))
}

fn default_filter(level: &str) -> EnvFilter {
    let http_level = if level.eq_ignore_ascii_case("trace") {
        "debug"
    } else {
        level
    };
    EnvFilter::new(format!("{level},tower_http={http_level}"))
}

/// Initializes logging based on configuration.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TryInitError> {
    let filter = build_filter(config);

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).compact())
            .try_init()?;
    }

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}
