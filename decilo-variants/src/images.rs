//! Variant image resolution with three cache tiers.
//!
//! - results: `(template, size, normalised selection pairs)` to the final answer
//! - variant images: `(variant, size)` to the variant's own image, if any
//! - template images: `(template, size)` to the template's fallback image
//!
//! Many selections resolve to the same variant and many variants share the
//! template image, so the inner tiers are hit even when the outer misses.
//! Absent images are cached like present ones.

use decilo_core::{
    AmbiguityPolicy, DeciloResult, ImagePayload, ImageSize, ImageSource, Selection, TemplateId,
    VariantId, VariantImage,
};
use decilo_storage::{
    CacheStats, CatalogClient, Clock, ImageResultKey, TemplateImageKey, TtlCache, VariantImageKey,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::metadata::TemplateMetadataCache;
use crate::resolver::resolve;

/// Statistics for the three image tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageCacheStats {
    pub results: CacheStats,
    pub variant_images: CacheStats,
    pub template_images: CacheStats,
}

pub struct ImageResolver {
    client: CatalogClient,
    metadata: Arc<TemplateMetadataCache>,
    locale: String,
    policy: AmbiguityPolicy,
    results: TtlCache<ImageResultKey, VariantImage>,
    variant_images: TtlCache<VariantImageKey, Option<ImagePayload>>,
    template_images: TtlCache<TemplateImageKey, Option<ImagePayload>>,
}

impl ImageResolver {
    pub fn new(
        client: CatalogClient,
        metadata: Arc<TemplateMetadataCache>,
        locale: impl Into<String>,
        policy: AmbiguityPolicy,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            metadata,
            locale: locale.into(),
            policy,
            results: TtlCache::new(ttl, clock.clone()),
            variant_images: TtlCache::new(ttl, clock.clone()),
            template_images: TtlCache::new(ttl, clock),
        }
    }

    /// Image for the variant `selection` resolves to, falling back to the
    /// template image. Resolution errors are returned and never cached.
    pub async fn get_variant_image(
        &self,
        template: TemplateId,
        selection: &Selection,
        size: ImageSize,
    ) -> DeciloResult<Arc<VariantImage>> {
        let key = ImageResultKey::new(template, size, selection);
        if let Some(hit) = self.results.get(&key) {
            tracing::trace!(%key, "Image result cache hit");
            return Ok(hit.into_value());
        }

        let snapshot = self.metadata.get_snapshot(template, &self.locale).await?;
        let resolved = resolve(template, selection, &snapshot, self.policy)?;

        let result = match resolved.variant_id {
            Some(variant) => match self.variant_image(variant, size).await? {
                Some(image) => VariantImage {
                    variant_id: Some(variant),
                    image: Some(image),
                    source: ImageSource::Variant,
                },
                None => VariantImage {
                    variant_id: Some(variant),
                    image: self.template_image(template, size).await?,
                    source: ImageSource::Template,
                },
            },
            None => VariantImage {
                variant_id: None,
                image: self.template_image(template, size).await?,
                source: ImageSource::Template,
            },
        };

        tracing::debug!(
            %key,
            variant_id = ?result.variant_id.map(|v| v.raw()),
            source = result.source.as_str(),
            found = result.image.is_some(),
            "Variant image resolved"
        );
        Ok(self.results.insert(key, result).into_value())
    }

    async fn variant_image(
        &self,
        variant: VariantId,
        size: ImageSize,
    ) -> DeciloResult<Option<ImagePayload>> {
        let read = self
            .variant_images
            .get_or_try_insert_with(VariantImageKey::new(variant, size), || {
                self.client.variant_image(variant, size)
            })
            .await?;
        Ok(Option::clone(read.value()))
    }

    async fn template_image(
        &self,
        template: TemplateId,
        size: ImageSize,
    ) -> DeciloResult<Option<ImagePayload>> {
        let read = self
            .template_images
            .get_or_try_insert_with(TemplateImageKey::new(template, size), || {
                self.client.template_image(template, size)
            })
            .await?;
        Ok(Option::clone(read.value()))
    }

    pub fn stats(&self) -> ImageCacheStats {
        ImageCacheStats {
            results: self.results.stats(),
            variant_images: self.variant_images.stats(),
            template_images: self.template_images.stats(),
        }
    }

    pub fn clear(&self) {
        self.results.clear();
        self.variant_images.clear();
        self.template_images.clear();
    }
}
