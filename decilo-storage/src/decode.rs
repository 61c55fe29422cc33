//! Decoding of raw record values.
//!
//! The record store encodes values loosely: a many-to-one reference may be a
//! bare id or an `[id, name]` pair, an unset value of any type is `false`,
//! and binaries are base64 strings. [`RecordDecoder`] normalises all of this
//! so nothing past the storage boundary sees raw shapes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use decilo_core::{RecordId, RecordStoreError, Ref};
use serde_json::Value;

use crate::record_store::{Record, StoreResult};

/// Field accessor over one raw record.
pub struct RecordDecoder<'a> {
    collection: &'a str,
    record: &'a Record,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(collection: &'a str, record: &'a Record) -> Self {
        Self { collection, record }
    }

    fn error(&self, field: &str, reason: impl Into<String>) -> RecordStoreError {
        RecordStoreError::Decode {
            collection: self.collection.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Raw value, with `false` and `null` mapped to `None`.
    fn value(&self, field: &str) -> Option<&'a Value> {
        match self.record.get(field) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => None,
            Some(value) => Some(value),
        }
    }

    /// The record's own id. Required.
    pub fn id(&self) -> StoreResult<RecordId> {
        self.value("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| self.error("id", "missing or non-integer id"))
    }

    /// A many-to-one reference, bare or `[id, name]`.
    pub fn reference(&self, field: &str) -> StoreResult<Option<Ref>> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(|id| Some(Ref::new(id)))
                .ok_or_else(|| self.error(field, "reference id is not an integer")),
            Some(Value::Array(pair)) => {
                let id = pair
                    .first()
                    .and_then(Value::as_i64)
                    .ok_or_else(|| self.error(field, "reference pair without integer id"))?;
                let name = pair.get(1).and_then(Value::as_str).map(str::to_string);
                Ok(Some(Ref {
                    id,
                    display_name: name,
                }))
            }
            Some(other) => Err(self.error(field, format!("unexpected reference shape: {}", other))),
        }
    }

    /// A to-many field: list of ids. Unset decodes as empty.
    pub fn ids(&self, field: &str) -> StoreResult<Vec<RecordId>> {
        match self.value(field) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Number(n) => n.as_i64(),
                    // Some transports return `[id, name]` pairs for to-many fields too.
                    Value::Array(pair) => pair.first().and_then(Value::as_i64),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| self.error(field, "id list contains a non-integer")),
            Some(other) => Err(self.error(field, format!("expected id list, got {}", other))),
        }
    }

    /// An optional string. Unset decodes as `None`.
    pub fn opt_string(&self, field: &str) -> StoreResult<Option<String>> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.error(field, format!("expected string, got {}", other))),
        }
    }

    /// A required string.
    pub fn string(&self, field: &str) -> StoreResult<String> {
        self.opt_string(field)?
            .ok_or_else(|| self.error(field, "required string is unset"))
    }

    /// An optional float.
    pub fn opt_f64(&self, field: &str) -> StoreResult<Option<f64>> {
        match self.value(field) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(self.error(field, format!("expected number, got {}", other))),
        }
    }

    /// A base64-encoded binary. Unset or empty decodes as `None`.
    pub fn binary(&self, field: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.opt_string(field)? {
            None => Ok(None),
            Some(encoded) if encoded.trim().is_empty() => Ok(None),
            Some(encoded) => STANDARD
                .decode(encoded.trim())
                .map(Some)
                .map_err(|e| self.error(field, format!("invalid base64: {}", e))),
        }
    }
}

/// Encode bytes the way the record store stores binaries.
pub fn encode_binary(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reference_shapes() {
        let rec = record(json!({
            "id": 1,
            "bare": 5,
            "pair": [7, "Size"],
            "unset": false
        }));
        let decoder = RecordDecoder::new("product.attribute.value", &rec);

        assert_eq!(decoder.reference("bare").unwrap(), Some(Ref::new(5)));
        assert_eq!(decoder.reference("pair").unwrap(), Some(Ref::named(7, "Size")));
        assert_eq!(decoder.reference("unset").unwrap(), None);
        assert_eq!(decoder.reference("missing").unwrap(), None);
    }

    #[test]
    fn test_reference_rejects_strings() {
        let rec = record(json!({"id": 1, "attribute_id": "Size"}));
        let decoder = RecordDecoder::new("product.attribute.value", &rec);
        let err = decoder.reference("attribute_id").unwrap_err();
        assert!(matches!(err, RecordStoreError::Decode { ref field, .. } if field == "attribute_id"));
    }

    #[test]
    fn test_ids_and_unset_lists() {
        let rec = record(json!({"id": 3, "value_ids": [1, 2, 3], "exclude_for": false}));
        let decoder = RecordDecoder::new("product.template.attribute.value", &rec);
        assert_eq!(decoder.id().unwrap(), 3);
        assert_eq!(decoder.ids("value_ids").unwrap(), vec![1, 2, 3]);
        assert!(decoder.ids("exclude_for").unwrap().is_empty());
    }

    #[test]
    fn test_strings_and_false() {
        let rec = record(json!({"id": 1, "name": "Red", "default_code": false}));
        let decoder = RecordDecoder::new("product.template", &rec);
        assert_eq!(decoder.string("name").unwrap(), "Red");
        assert_eq!(decoder.opt_string("default_code").unwrap(), None);
        assert!(decoder.string("default_code").is_err());
    }

    #[test]
    fn test_binary_decoding() {
        let encoded = encode_binary(b"\x89PNG");
        let rec = record(json!({"id": 1, "image_128": encoded, "image_256": false, "image_512": ""}));
        let decoder = RecordDecoder::new("product.product", &rec);
        assert_eq!(decoder.binary("image_128").unwrap(), Some(b"\x89PNG".to_vec()));
        assert_eq!(decoder.binary("image_256").unwrap(), None);
        assert_eq!(decoder.binary("image_512").unwrap(), None);
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let rec = record(json!({"name": "orphan"}));
        let decoder = RecordDecoder::new("product.product", &rec);
        assert!(decoder.id().is_err());
    }
}
