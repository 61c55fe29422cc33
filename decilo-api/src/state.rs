//! Shared application state.

use std::sync::Arc;

use decilo_core::{CatalogSchema, EngineConfig};
use decilo_storage::{probe_optional_fields, JsonRpcRecordStore, RecordStore};
use decilo_variants::VariantEngine;

use crate::config::PortalConfig;
use crate::error::ApiResult;
use crate::service::PortalApi;

/// Process-wide state: one engine, one set of caches.
#[derive(Debug, Clone)]
pub struct AppState {
    pub api: PortalApi,
}

impl AppState {
    /// Connect to the configured backend, probe optional schema fields once
    /// and build the engine.
    pub async fn from_config(config: &PortalConfig) -> ApiResult<Self> {
        let store: Arc<dyn RecordStore> = Arc::new(JsonRpcRecordStore::new(config.rpc.clone())?);
        tracing::info!(url = %config.rpc.url, database = %config.rpc.database, "Record store configured");

        let schema = probe_optional_fields(store.as_ref(), config.schema.clone()).await?;
        Self::new(store, schema, config.engine.clone())
    }

    /// Build state over any record store with an already-probed schema.
    pub fn new(
        store: Arc<dyn RecordStore>,
        schema: CatalogSchema,
        config: EngineConfig,
    ) -> ApiResult<Self> {
        let engine = VariantEngine::with_system_clock(store, schema, config)?;
        Ok(Self {
            api: PortalApi::new(Arc::new(engine)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use decilo_test_utils::CatalogFixture;
    use std::time::Duration;

    #[tokio::test]
    async fn test_state_serves_from_store() {
        let mut fixture = CatalogFixture::new();
        let template = fixture.add_template("Dome");
        let state = AppState::new(
            fixture.store(),
            fixture.schema().clone(),
            EngineConfig::default(),
        )
        .unwrap();

        let detail = state.api.product(template).await.unwrap();
        assert_eq!(detail.product.name, "Dome");
    }

    #[test]
    fn test_invalid_engine_config_is_internal_error() {
        let fixture = CatalogFixture::new();
        let err = AppState::new(
            fixture.store(),
            fixture.schema().clone(),
            EngineConfig::default().with_image_ttl(Duration::ZERO),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert!(err.message.contains("image_ttl"));
    }
}
