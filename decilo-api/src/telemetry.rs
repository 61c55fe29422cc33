//! Tracing Subscriber Initialization
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG` overrides the default filter when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is absent or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "decilo_variants=info,decilo_storage=info,decilo_api=info,warn";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
    /// Directive string used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl TelemetryConfig {
    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            service_name: lookup("DECILO_SERVICE_NAME").unwrap_or_else(|| "decilo".to_string()),
            json: lookup("DECILO_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
            default_filter: lookup("DECILO_LOG_FILTER")
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup; a second call fails because a global subscriber
/// is already set.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        json = config.json,
        "Telemetry initialized"
    );

    Ok(())
}
