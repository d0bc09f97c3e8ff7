//! # Pottysnitch Telemetry
//!
//! Observability for the pottysnitch service: structured logging and
//! lightweight request counters.
//!
//! ## Features
//!
//! - **Structured Logging**: human-readable or JSON-formatted logs via `tracing`
//! - **API Counters**: lock-free counters surfaced by the status endpoint

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{ApiMetrics, MetricsSnapshot, Timer};

/// Configuration for telemetry.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Service name reported in logs.
    pub service_name: String,
    /// Log level, used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Enable JSON logging.
    pub json_logs: bool,
}

impl TelemetryConfig {
    /// Creates a new telemetry configuration.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Sets the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enables JSON logging.
    #[must_use]
    pub fn with_json_logs(mut self) -> Self {
        self.json_logs = true;
        self
    }
}
