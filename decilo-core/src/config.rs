//! Configuration types
//!
//! Two kinds of configuration live here: the [`CatalogSchema`], which names
//! every collection and field the engine touches, and the [`EngineConfig`],
//! which holds cache and resolution policy.

use crate::error::ConfigError;
use crate::image::ImageSize;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// CATALOG SCHEMA
// ============================================================================

/// Version of the record store's data model the schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    V17,
}

/// Binary field names, one per [`ImageSize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFields {
    pub thumbnail: String,
    pub small: String,
    pub medium: String,
    pub large: String,
    pub original: String,
    /// Companion field holding the image's filename. Optional on the
    /// backend; cleared at startup when the field does not exist.
    pub filename: Option<String>,
}

impl ImageFields {
    /// Build the per-size fields as `<prefix><pixels>`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            thumbnail: format!("{}128", prefix),
            small: format!("{}256", prefix),
            medium: format!("{}512", prefix),
            large: format!("{}1024", prefix),
            original: format!("{}1920", prefix),
            filename: None,
        }
    }

    pub fn field(&self, size: ImageSize) -> &str {
        match size {
            ImageSize::Thumbnail => &self.thumbnail,
            ImageSize::Small => &self.small,
            ImageSize::Medium => &self.medium,
            ImageSize::Large => &self.large,
            ImageSize::Original => &self.original,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFields {
    pub collection: String,
    pub name: String,
    pub default_variant: String,
    pub attribute_lines: String,
    pub list_price: String,
    pub default_code: String,
    pub description: String,
    pub sale_ok: String,
    pub category_path: String,
    pub images: ImageFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeLineFields {
    pub collection: String,
    pub template: String,
    pub attribute: String,
    pub values: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFields {
    pub collection: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValueFields {
    pub collection: String,
    pub name: String,
    pub attribute: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TavFields {
    pub collection: String,
    pub template: String,
    /// Attribute reference on the TAV itself, so one read names both axes.
    pub attribute: String,
    pub attribute_value: String,
    pub exclusions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFields {
    pub collection: String,
    pub template: String,
    pub tavs: String,
    pub display_name: String,
    pub images: ImageFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionGroupFields {
    pub collection: String,
    pub template: String,
    pub members: String,
}

/// Registry describing which fields exist on which collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFieldsRegistry {
    pub collection: String,
    pub model: String,
    pub name: String,
}

/// Every collection and field name the engine uses.
///
/// The names are opaque to the engine and passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSchema {
    pub version: SchemaVersion,
    pub templates: TemplateFields,
    pub attribute_lines: AttributeLineFields,
    pub attributes: AttributeFields,
    pub attribute_values: AttributeValueFields,
    pub tavs: TavFields,
    pub variants: VariantFields,
    pub exclusion_groups: ExclusionGroupFields,
    pub model_fields: ModelFieldsRegistry,
}

impl CatalogSchema {
    pub fn v17() -> Self {
        Self {
            version: SchemaVersion::V17,
            templates: TemplateFields {
                collection: "product.template".to_string(),
                name: "name".to_string(),
                default_variant: "product_variant_id".to_string(),
                attribute_lines: "attribute_line_ids".to_string(),
                list_price: "list_price".to_string(),
                default_code: "default_code".to_string(),
                description: "description_ecommerce".to_string(),
                sale_ok: "sale_ok".to_string(),
                category_path: "categ_id.complete_name".to_string(),
                images: ImageFields::with_prefix("image_"),
            },
            attribute_lines: AttributeLineFields {
                collection: "product.template.attribute.line".to_string(),
                template: "product_tmpl_id".to_string(),
                attribute: "attribute_id".to_string(),
                values: "value_ids".to_string(),
            },
            attributes: AttributeFields {
                collection: "product.attribute".to_string(),
                name: "name".to_string(),
            },
            attribute_values: AttributeValueFields {
                collection: "product.attribute.value".to_string(),
                name: "name".to_string(),
                attribute: "attribute_id".to_string(),
            },
            tavs: TavFields {
                collection: "product.template.attribute.value".to_string(),
                template: "product_tmpl_id".to_string(),
                attribute: "attribute_id".to_string(),
                attribute_value: "product_attribute_value_id".to_string(),
                exclusions: "exclude_for".to_string(),
            },
            variants: VariantFields {
                collection: "product.product".to_string(),
                template: "product_tmpl_id".to_string(),
                tavs: "product_template_attribute_value_ids".to_string(),
                display_name: "display_name".to_string(),
                images: ImageFields::with_prefix("image_variant_"),
            },
            exclusion_groups: ExclusionGroupFields {
                collection: "product.template.attribute.exclusion".to_string(),
                template: "product_tmpl_id".to_string(),
                members: "value_ids".to_string(),
            },
            model_fields: ModelFieldsRegistry {
                collection: "ir.model.fields".to_string(),
                model: "model".to_string(),
                name: "name".to_string(),
            },
        }
    }

    /// Declare the filename companion field for template images.
    pub fn with_template_image_filename(mut self, field: impl Into<String>) -> Self {
        self.templates.images.filename = Some(field.into());
        self
    }

    /// Declare the filename companion field for variant images.
    pub fn with_variant_image_filename(mut self, field: impl Into<String>) -> Self {
        self.variants.images.filename = Some(field.into());
        self
    }
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self::v17()
    }
}

// ============================================================================
// ENGINE CONFIGURATION
// ============================================================================

/// What to do when a selection matches more than one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Return the first matching candidate in listing order and log a warning.
    #[default]
    FirstMatch,
    /// Fail with `ResolutionError::AmbiguousSelection`.
    Reject,
}

impl std::str::FromStr for AmbiguityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first_match" | "first" => Ok(Self::FirstMatch),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::InvalidValue {
                field: "ambiguity_policy".to_string(),
                value: other.to_string(),
                reason: "expected first_match or reject".to_string(),
            }),
        }
    }
}

/// Base filter applied to every catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    /// Only list templates flagged as sellable.
    pub sellable_only: bool,
    /// Case-insensitive category path match, e.g. "Goods / Ear Tips".
    pub category_path: Option<String>,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self {
            sellable_only: true,
            category_path: None,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lifetime of template metadata snapshots.
    pub snapshot_ttl: Duration,
    /// Lifetime of all three image cache tiers.
    pub image_ttl: Duration,
    /// Locale used when a caller does not pass one.
    pub default_locale: String,
    pub ambiguity_policy: AmbiguityPolicy,
    pub catalog_filter: CatalogFilter,
}

/// Default lifetime for every cache entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl: DEFAULT_CACHE_TTL,
            image_ttl: DEFAULT_CACHE_TTL,
            default_locale: "en_US".to_string(),
            ambiguity_policy: AmbiguityPolicy::default(),
            catalog_filter: CatalogFilter::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    pub fn with_image_ttl(mut self, ttl: Duration) -> Self {
        self.image_ttl = ttl;
        self
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity_policy = policy;
        self
    }

    pub fn with_catalog_filter(mut self, filter: CatalogFilter) -> Self {
        self.catalog_filter = filter;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - both TTLs are non-zero
    /// - the default locale is not blank
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "snapshot_ttl".to_string(),
                value: "0s".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.image_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "image_ttl".to_string(),
                value: "0s".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.default_locale.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "default_locale".to_string(),
            });
        }
        Ok(())
    }
}
