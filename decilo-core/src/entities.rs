//! Catalog entity types
//!
//! These mirror the record kinds the record store owns. The engine only ever
//! reads them; they are decoded once at the storage boundary and never carry
//! raw record shapes.

use crate::identity::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A normalised many-to-one reference: an id with an optional display name.
///
/// The record store returns references either as a bare id or as an
/// `[id, name]` pair; both decode into this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref {
    pub id: RecordId,
    pub display_name: Option<String>,
}

impl Ref {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            display_name: None,
        }
    }

    pub fn named(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: Some(name.into()),
        }
    }

    /// Convert into a typed id.
    pub fn typed<T: RecordIdType>(&self) -> T {
        T::new(self.id)
    }
}

/// A sellable product definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub default_variant: Option<VariantId>,
    pub attribute_lines: Vec<AttributeLineId>,
    pub list_price: Option<f64>,
    pub default_code: Option<String>,
    pub description: Option<String>,
}

/// Binding of a template to one attribute and the values it offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeLine {
    pub id: AttributeLineId,
    pub attribute: AttributeId,
    /// Display name of the attribute as returned with the reference, if any.
    pub attribute_name: Option<String>,
    pub values: Vec<AttributeValueId>,
}

/// A named configuration axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
}

/// A named point on an attribute axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub id: AttributeValueId,
    pub name: String,
    pub attribute: AttributeId,
    /// Attribute display name, when the store sent it with the reference.
    pub attribute_name: Option<String>,
}

/// Template-specific binding of an attribute value (TAV).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateAttributeValue {
    pub id: TavId,
    pub template: TemplateId,
    pub attribute: Option<AttributeId>,
    /// Attribute display name, when the store sent it with the reference.
    pub attribute_name: Option<String>,
    pub attribute_value: AttributeValueId,
    /// Exclusion groups this TAV declares.
    pub exclusion_groups: Vec<ExclusionGroupId>,
}

/// One concrete, sellable configuration of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub template: TemplateId,
    pub tavs: BTreeSet<TavId>,
    pub display_name: Option<String>,
}

/// Set of TAV ids incompatible with the TAV that declares the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionGroup {
    pub id: ExclusionGroupId,
    pub template: Option<TemplateId>,
    /// Member ids as stored. Usually TAV ids, occasionally raw attribute-value ids.
    pub members: Vec<RecordId>,
}

/// Forbidden combinations declared by one attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub declaring_value_name: String,
    pub excluded_value_names: Vec<String>,
}

/// Decoded image bytes with an optional companion filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            filename: None,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Which tier produced a variant image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Variant,
    Template,
}

impl ImageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSource::Variant => "variant",
            ImageSource::Template => "template",
        }
    }
}

/// Result of a variant image lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantImage {
    /// Resolved variant, `None` when an empty selection left it undetermined.
    pub variant_id: Option<VariantId>,
    pub image: Option<ImagePayload>,
    pub source: ImageSource,
}

/// One attribute with its value names, as shown in product listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSummary {
    pub attribute: String,
    pub values: Vec<String>,
}

/// Listing view of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: TemplateId,
    pub name: String,
    pub list_price: Option<f64>,
    pub default_code: Option<String>,
    pub description: Option<String>,
    pub attributes: Vec<AttributeSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_typed() {
        let r = Ref::named(9, "Size");
        let id: AttributeId = r.typed();
        assert_eq!(id, AttributeId::from_raw(9));
        assert_eq!(r.display_name.as_deref(), Some("Size"));
    }

    #[test]
    fn test_image_source_serializes_lowercase() {
        let json = serde_json::to_string(&ImageSource::Template).unwrap();
        assert_eq!(json, "\"template\"");
        assert_eq!(ImageSource::Variant.as_str(), "variant");
    }
}
