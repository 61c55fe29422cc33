//! Portal service layer.
//!
//! [`PortalApi`] is the boundary between callers and the engine: it accepts
//! request types, calls [`VariantEngine`] and turns results and failures into
//! serialisable payloads and [`ApiError`]s.

use std::sync::Arc;

use decilo_core::{ImageSize, Selection, TemplateId};
use decilo_variants::{EngineCacheStats, VariantEngine};
use tracing::instrument;

use crate::error::{ApiError, ApiResult};
use crate::types::{
    ExclusionsResponse, ListProductsRequest, ProductDetailResponse, ProductListResponse,
    ResolveRequest, ResolveResponse, VariantImageRequest, VariantImageResponse, VariantSummary,
};

#[derive(Debug, Clone)]
pub struct PortalApi {
    engine: Arc<VariantEngine>,
}

impl PortalApi {
    pub fn new(engine: Arc<VariantEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &VariantEngine {
        &self.engine
    }

    /// One page of products plus the total for paging.
    #[instrument(skip(self), err(Display))]
    pub async fn products(&self, request: &ListProductsRequest) -> ApiResult<ProductListResponse> {
        let query = request.to_query();
        let (products, total) = tokio::try_join!(
            self.engine.templates(&query),
            self.engine.count_templates(&query),
        )?;
        Ok(ProductListResponse {
            products,
            total,
            offset: query.offset,
        })
    }

    /// Product detail with its variants; `NotFound` for an unknown id.
    #[instrument(skip(self), fields(template_id = %template), err(Display))]
    pub async fn product(&self, template: TemplateId) -> ApiResult<ProductDetailResponse> {
        let locale = self.engine.config().default_locale.as_str();
        let (detail, snapshot) = tokio::try_join!(
            self.engine.template_detail(template),
            self.engine.snapshot(template, locale),
        )?;
        let product = detail.ok_or_else(|| ApiError::product_not_found(template))?;

        Ok(ProductDetailResponse {
            product,
            default_variant: snapshot.default_variant(),
            variants: snapshot.candidates().iter().map(VariantSummary::from).collect(),
        })
    }

    #[instrument(skip(self, request), fields(template_id = %request.template_id), err(Display))]
    pub async fn resolve(&self, request: &ResolveRequest) -> ApiResult<ResolveResponse> {
        let resolved = match request.locale.as_deref() {
            Some(locale) => {
                self.engine
                    .resolve_in(request.template_id, &request.options, locale)
                    .await?
            }
            None => self.engine.resolve(request.template_id, &request.options).await?,
        };
        Ok(ResolveResponse::new(request.template_id, resolved))
    }

    #[instrument(skip(self), fields(template_id = %template), err(Display))]
    pub async fn exclusions(&self, template: TemplateId) -> ApiResult<ExclusionsResponse> {
        let exclusions = self.engine.exclusions(template).await?;
        Ok(ExclusionsResponse {
            template_id: template,
            exclusions,
        })
    }

    #[instrument(skip(self, request), fields(template_id = %request.template_id, size = %request.size), err(Display))]
    pub async fn image(&self, request: &VariantImageRequest) -> ApiResult<VariantImageResponse> {
        let image = self
            .engine
            .variant_image(request.template_id, &request.options, request.size)
            .await?;
        Ok(VariantImageResponse::new(
            request.template_id,
            request.size,
            &image,
        ))
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        self.engine.cache_stats()
    }
}

/// Parse `Attribute=Value` pairs into a selection.
pub fn parse_options<S: AsRef<str>>(pairs: &[S]) -> ApiResult<Selection> {
    let mut selection = Selection::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (attribute, value) = pair.split_once('=').ok_or_else(|| {
            ApiError::invalid_input(format!("expected Attribute=Value, got '{}'", pair))
        })?;
        if attribute.trim().is_empty() || value.trim().is_empty() {
            return Err(ApiError::invalid_input(format!(
                "empty attribute or value in '{}'",
                pair
            )));
        }
        selection.insert(attribute, value);
    }
    Ok(selection)
}

/// Parse an image size name or pixel count.
pub fn parse_size(raw: &str) -> ApiResult<ImageSize> {
    raw.parse::<ImageSize>().map_err(ApiError::invalid_input)
}
