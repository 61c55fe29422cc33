//! Portal Configuration Module
//!
//! Loads backend credentials, engine tuning and telemetry settings from
//! environment variables. Required values fail loudly; optional values fall
//! back to the engine defaults, and a present-but-invalid value is an error
//! rather than being silently ignored.

use std::time::Duration;

use decilo_core::{AmbiguityPolicy, CatalogFilter, CatalogSchema, ConfigError, EngineConfig};
use decilo_storage::JsonRpcConfig;

use crate::telemetry::TelemetryConfig;

// ============================================================================
// PORTAL CONFIGURATION
// ============================================================================

/// Everything needed to stand up an engine against a live backend.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Backend connection; the API key is held as a secret.
    pub rpc: JsonRpcConfig,
    /// Backend schema before optional fields are probed.
    pub schema: CatalogSchema,
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
}

impl PortalConfig {
    /// Create PortalConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DECILO_ODOO_URL`: Backend base URL (required)
    /// - `DECILO_ODOO_DB`: Database name (required)
    /// - `DECILO_ODOO_USERNAME`: Login of the integration user (required)
    /// - `DECILO_ODOO_API_KEY`: API key or password (required)
    /// - `DECILO_RPC_TIMEOUT_SECS`: Per-call timeout (default: 30)
    /// - `DECILO_CACHE_TTL_SECS`: Lifetime of snapshots and images (default: 1800)
    /// - `DECILO_DEFAULT_LOCALE`: Locale for names (default: en_US)
    /// - `DECILO_AMBIGUITY_POLICY`: "first_match" or "reject" (default: first_match)
    /// - `DECILO_CATEGORY_FILTER`: Category path listings are restricted to
    /// - `DECILO_SELLABLE_ONLY`: "false" lists unsellable templates too (default: true)
    /// - `DECILO_TEMPLATE_IMAGE_FILENAME_FIELD`: Optional filename companion on templates
    /// - `DECILO_VARIANT_IMAGE_FILENAME_FIELD`: Optional filename companion on variants
    /// - `DECILO_LOG_JSON`: "true" or "1" for JSON log lines
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| ConfigError::MissingRequired {
                field: key.to_string(),
            })
        };

        let mut rpc = JsonRpcConfig::new(
            required("DECILO_ODOO_URL")?,
            required("DECILO_ODOO_DB")?,
            required("DECILO_ODOO_USERNAME")?,
            required("DECILO_ODOO_API_KEY")?,
        );
        if let Some(raw) = get("DECILO_RPC_TIMEOUT_SECS") {
            rpc = rpc.with_timeout(parse_secs("DECILO_RPC_TIMEOUT_SECS", &raw)?);
        }

        let mut schema = CatalogSchema::v17();
        if let Some(field) = get("DECILO_TEMPLATE_IMAGE_FILENAME_FIELD") {
            schema = schema.with_template_image_filename(field);
        }
        if let Some(field) = get("DECILO_VARIANT_IMAGE_FILENAME_FIELD") {
            schema = schema.with_variant_image_filename(field);
        }

        let mut engine = EngineConfig::default();
        if let Some(raw) = get("DECILO_CACHE_TTL_SECS") {
            let ttl = parse_secs("DECILO_CACHE_TTL_SECS", &raw)?;
            engine = engine.with_snapshot_ttl(ttl).with_image_ttl(ttl);
        }
        if let Some(locale) = get("DECILO_DEFAULT_LOCALE") {
            engine = engine.with_default_locale(locale);
        }
        if let Some(raw) = get("DECILO_AMBIGUITY_POLICY") {
            let policy: AmbiguityPolicy = raw.parse()?;
            engine = engine.with_ambiguity_policy(policy);
        }

        let mut filter = CatalogFilter::default();
        if let Some(path) = get("DECILO_CATEGORY_FILTER") {
            filter.category_path = Some(path);
        }
        if let Some(raw) = get("DECILO_SELLABLE_ONLY") {
            filter.sellable_only = parse_bool("DECILO_SELLABLE_ONLY", &raw)?;
        }
        engine = engine.with_catalog_filter(filter);
        engine.validate()?;

        Ok(Self {
            rpc,
            schema,
            engine,
            telemetry: TelemetryConfig::from_lookup(&lookup),
        })
    }
}

fn parse_secs(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "expected a positive number of seconds".to_string(),
        }),
    }
}

fn parse_bool(field: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
