//! Decilo Core - Catalog Types
//!
//! Pure data structures shared by every other crate: typed record ids,
//! catalog entities, user selections, image sizes, schema and engine
//! configuration, and the error taxonomy. No I/O happens here.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;
pub mod image;
pub mod selection;

pub use config::{
    AmbiguityPolicy, AttributeFields, AttributeLineFields, AttributeValueFields, CatalogFilter,
    CatalogSchema, EngineConfig, ExclusionGroupFields, ImageFields, ModelFieldsRegistry,
    SchemaVersion, TavFields, TemplateFields, VariantFields, DEFAULT_CACHE_TTL,
};
pub use entities::{
    Attribute, AttributeLine, AttributeSummary, AttributeValue, Exclusion, ExclusionGroup,
    ImagePayload, ImageSource, Ref, Template, TemplateAttributeValue, TemplateSummary, Variant,
    VariantImage,
};
pub use error::{ConfigError, DeciloError, DeciloResult, RecordStoreError, ResolutionError};
pub use identity::{
    raw_ids, AttributeId, AttributeLineId, AttributeValueId, ExclusionGroupId, RecordId,
    RecordIdType, TavId, TemplateId, VariantId,
};
pub use image::ImageSize;
pub use selection::{normalize_name, SelectedOption, Selection};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
