//! The engine facade.
//!
//! [`VariantEngine`] is built once per process and owns every cache. It is
//! cheap to share behind an `Arc` and safe to call from many tasks at once.

use decilo_core::{
    CatalogSchema, DeciloResult, EngineConfig, Exclusion, ImageSize, Selection, TemplateId,
    TemplateSummary, VariantImage,
};
use decilo_storage::{CacheStats, CatalogClient, Clock, RecordStore, SystemClock};
use serde::Serialize;
use std::sync::Arc;

use crate::catalog::{CatalogBrowser, TemplateQuery};
use crate::exclusions::ExclusionComputer;
use crate::images::{ImageCacheStats, ImageResolver};
use crate::metadata::{Snapshot, TemplateMetadataCache};
use crate::resolver::{resolve, Resolved};

/// Statistics across all engine caches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineCacheStats {
    pub snapshots: CacheStats,
    pub images: ImageCacheStats,
}

pub struct VariantEngine {
    config: EngineConfig,
    client: CatalogClient,
    metadata: Arc<TemplateMetadataCache>,
    images: ImageResolver,
    exclusions: ExclusionComputer,
    catalog: CatalogBrowser,
}

impl VariantEngine {
    /// Build the engine. Fails if `config` does not validate.
    pub fn new(
        store: Arc<dyn RecordStore>,
        schema: CatalogSchema,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> DeciloResult<Self> {
        config.validate()?;

        let client = CatalogClient::new(store, schema);
        let metadata = Arc::new(TemplateMetadataCache::new(
            client.clone(),
            config.snapshot_ttl,
            clock.clone(),
        ));
        let images = ImageResolver::new(
            client.clone(),
            metadata.clone(),
            config.default_locale.clone(),
            config.ambiguity_policy,
            config.image_ttl,
            clock,
        );
        let exclusions = ExclusionComputer::new(client.clone(), config.default_locale.clone());
        let catalog = CatalogBrowser::new(client.clone(), config.catalog_filter.clone());

        tracing::info!(
            snapshot_ttl_secs = config.snapshot_ttl.as_secs(),
            image_ttl_secs = config.image_ttl.as_secs(),
            default_locale = %config.default_locale,
            ambiguity_policy = ?config.ambiguity_policy,
            "Variant engine ready"
        );

        Ok(Self {
            config,
            client,
            metadata,
            images,
            exclusions,
            catalog,
        })
    }

    /// Build the engine on wall-clock time.
    pub fn with_system_clock(
        store: Arc<dyn RecordStore>,
        schema: CatalogSchema,
        config: EngineConfig,
    ) -> DeciloResult<Self> {
        Self::new(store, schema, config, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    /// The cached metadata snapshot for `(template, locale)`.
    pub async fn snapshot(&self, template: TemplateId, locale: &str) -> DeciloResult<Arc<Snapshot>> {
        Ok(self.metadata.get_snapshot(template, locale).await?)
    }

    /// Resolve a selection using the default locale.
    pub async fn resolve(&self, template: TemplateId, selection: &Selection) -> DeciloResult<Resolved> {
        self.resolve_in(template, selection, &self.config.default_locale)
            .await
    }

    /// Resolve a selection whose names are spelled in `locale`.
    pub async fn resolve_in(
        &self,
        template: TemplateId,
        selection: &Selection,
        locale: &str,
    ) -> DeciloResult<Resolved> {
        let snapshot = self.snapshot(template, locale).await?;
        Ok(resolve(
            template,
            selection,
            &snapshot,
            self.config.ambiguity_policy,
        )?)
    }

    pub async fn exclusions(&self, template: TemplateId) -> DeciloResult<Vec<Exclusion>> {
        Ok(self.exclusions.get_exclusions(template).await?)
    }

    pub async fn variant_image(
        &self,
        template: TemplateId,
        selection: &Selection,
        size: ImageSize,
    ) -> DeciloResult<Arc<VariantImage>> {
        self.images
            .get_variant_image(template, selection, size)
            .await
    }

    pub async fn templates(&self, query: &TemplateQuery) -> DeciloResult<Vec<TemplateSummary>> {
        Ok(self
            .catalog
            .templates(query, &self.config.default_locale)
            .await?)
    }

    pub async fn count_templates(&self, query: &TemplateQuery) -> DeciloResult<usize> {
        Ok(self.catalog.count_templates(query).await?)
    }

    pub async fn template_detail(
        &self,
        template: TemplateId,
    ) -> DeciloResult<Option<TemplateSummary>> {
        Ok(self
            .catalog
            .template_detail(template, &self.config.default_locale)
            .await?)
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            snapshots: self.metadata.stats(),
            images: self.images.stats(),
        }
    }

    /// Drop every cached entry.
    pub fn clear_caches(&self) {
        self.metadata.clear();
        self.images.clear();
    }
}

impl std::fmt::Debug for VariantEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantEngine")
            .field("config", &self.config)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
