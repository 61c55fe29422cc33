//! Variant resolution, exclusion and image API types

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use decilo_core::{
    Exclusion, ImageSize, ImageSource, Selection, TavId, TemplateId, VariantId, VariantImage,
};
use decilo_variants::Resolved;
use serde::{Deserialize, Serialize};

/// Request to resolve a selection to one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub template_id: TemplateId,
    /// Attribute name to value name, as displayed to the shopper
    #[serde(default)]
    pub options: Selection,
    /// Locale the names are spelled in; the engine default when absent
    #[serde(default)]
    pub locale: Option<String>,
}

/// Result of resolving a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub template_id: TemplateId,
    /// `None` when the selection was empty and no default could be chosen
    pub variant_id: Option<VariantId>,
    pub display_name: Option<String>,
    /// Template attribute values the selection resolved to
    pub needed: Vec<TavId>,
    /// Other variants the selection also matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguous_with: Vec<VariantId>,
}

impl ResolveResponse {
    pub fn new(template_id: TemplateId, resolved: Resolved) -> Self {
        Self {
            template_id,
            variant_id: resolved.variant_id,
            display_name: resolved.display_name,
            needed: resolved.needed,
            ambiguous_with: resolved.ambiguous_with,
        }
    }
}

/// Exclusion rules declared on a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionsResponse {
    pub template_id: TemplateId,
    pub exclusions: Vec<Exclusion>,
}

/// Request for the image of the variant a selection resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantImageRequest {
    pub template_id: TemplateId,
    #[serde(default)]
    pub options: Selection,
    #[serde(default)]
    pub size: ImageSize,
}

/// Variant image with the binary re-encoded as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantImageResponse {
    pub template_id: TemplateId,
    pub variant_id: Option<VariantId>,
    pub size: ImageSize,
    /// Which record the image came from
    pub source: ImageSource,
    /// Base64 image data, `None` when neither the variant nor the template has one
    pub image: Option<String>,
    pub filename: Option<String>,
}

impl VariantImageResponse {
    pub fn new(template_id: TemplateId, size: ImageSize, image: &VariantImage) -> Self {
        Self {
            template_id,
            variant_id: image.variant_id,
            size,
            source: image.source,
            image: image.image.as_ref().map(|payload| STANDARD.encode(&payload.bytes)),
            filename: image
                .image
                .as_ref()
                .and_then(|payload| payload.filename.clone()),
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}
