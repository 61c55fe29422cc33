//! Identity types for catalog records
//!
//! The record store identifies every record by a positive integer that is
//! only unique within its collection. Each record kind gets its own newtype
//! so a TAV id can never be passed where an attribute-value id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw record identifier as used by the record store.
pub type RecordId = i64;

/// Common behaviour for strongly-typed record identifiers.
pub trait RecordIdType: Copy + Eq + std::hash::Hash + fmt::Display {
    /// Wrap a raw record id.
    fn new(id: RecordId) -> Self;

    /// Get the raw record id.
    fn get(self) -> RecordId;
}

macro_rules! define_record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(RecordId);

        impl RecordIdType for $name {
            fn new(id: RecordId) -> Self {
                Self(id)
            }

            fn get(self) -> RecordId {
                self.0
            }
        }

        impl $name {
            /// Wrap a raw record id.
            pub const fn from_raw(id: RecordId) -> Self {
                Self(id)
            }

            /// Get the raw record id.
            pub const fn raw(self) -> RecordId {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<RecordId> for $name {
            fn from(id: RecordId) -> Self {
                Self(id)
            }
        }
    };
}

define_record_id!(
    /// Product template (sellable product definition).
    TemplateId
);
define_record_id!(
    /// Attribute line binding a template to one attribute.
    AttributeLineId
);
define_record_id!(
    /// Configuration axis, e.g. "Color".
    AttributeId
);
define_record_id!(
    /// Named point on an attribute axis, template-agnostic.
    AttributeValueId
);
define_record_id!(
    /// Template-specific binding of one attribute value.
    TavId
);
define_record_id!(
    /// Concrete sellable configuration of a template.
    VariantId
);
define_record_id!(
    /// Set of TAVs incompatible with a declaring TAV.
    ExclusionGroupId
);

/// Convert a slice of typed ids into raw ids for a record store call.
pub fn raw_ids<T: RecordIdType>(ids: &[T]) -> Vec<RecordId> {
    ids.iter().map(|id| id.get()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_roundtrip_and_display() {
        let id = TavId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(TavId::from(42), id);
    }

    #[test]
    fn test_record_id_serializes_transparently() {
        let json = serde_json::to_string(&VariantId::from_raw(7)).unwrap();
        assert_eq!(json, "7");
        let back: VariantId = serde_json::from_str("7").unwrap();
        assert_eq!(back, VariantId::from_raw(7));
    }

    #[test]
    fn test_raw_ids() {
        let ids = [AttributeValueId::new(3), AttributeValueId::new(5)];
        assert_eq!(raw_ids(&ids), vec![3, 5]);
    }
}
