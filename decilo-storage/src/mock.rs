//! In-memory record store for tests and local development.
//!
//! Records are kept as raw JSON maps and filtered the way the real backend
//! filters them, so the typed client and the decoders are exercised against
//! the same shapes they see in production. Every call is counted per
//! collection and method, which makes batching and cache behaviour
//! observable from tests.

use async_trait::async_trait;
use decilo_core::{RecordId, RecordStoreError};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use crate::record_store::{
    Condition, Domain, Operator, ReadOptions, Record, RecordStore, SearchOptions, StoreResult,
};

/// In-memory mock record store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    collections: RwLock<HashMap<String, BTreeMap<RecordId, Record>>>,
    calls: Mutex<HashMap<(String, String), usize>>,
    failing: RwLock<HashSet<String>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record. Uses its `id` field if present, else assigns the next
    /// free id in the collection. Returns the id.
    pub fn insert(&self, collection: &str, fields: Value) -> RecordId {
        let mut record = match fields {
            Value::Object(map) => map,
            _ => Record::new(),
        };
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let records = collections.entry(collection.to_string()).or_default();

        let id = match record.get("id").and_then(Value::as_i64) {
            Some(id) => id,
            None => records.keys().next_back().map_or(1, |last| last + 1),
        };
        record.insert("id".to_string(), Value::from(id));
        records.insert(id, record);
        id
    }

    /// Overwrite one field of a stored record. Returns false if the record
    /// does not exist.
    pub fn update(&self, collection: &str, id: RecordId, field: &str, value: Value) -> bool {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(&id))
        {
            Some(record) => {
                record.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, collection: &str, id: RecordId) -> Option<Record> {
        self.collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get_mut(collection)
            .and_then(|records| records.remove(&id))
    }

    /// Number of records in a collection.
    pub fn record_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Make every call touching `collection` fail with a transport error.
    pub fn fail_collection(&self, collection: &str) {
        self.failing
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(collection.to_string());
    }

    pub fn heal_collection(&self, collection: &str) {
        self.failing
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(collection);
    }

    /// Calls made against `collection` with `method`.
    pub fn calls(&self, collection: &str, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(collection.to_string(), method.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Calls made against `collection`, any method.
    pub fn collection_calls(&self, collection: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(_, count)| *count)
            .sum()
    }

    /// Every call made, i.e. every round trip.
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .sum()
    }

    pub fn reset_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn record_call(&self, collection: &str, method: &str) -> StoreResult<()> {
        *self
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry((collection.to_string(), method.to_string()))
            .or_insert(0) += 1;

        let failing = self
            .failing
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if failing.contains(collection) {
            return Err(RecordStoreError::Transport {
                reason: format!("{} is unavailable", collection),
            });
        }
        Ok(())
    }

    fn matching(&self, collection: &str, domain: &Domain) -> Vec<Record> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        collections
            .get(collection)
            .map(|records| {
                records
                    .values()
                    .filter(|record| domain.conditions().iter().all(|c| matches(record, c)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn search_sync(&self, collection: &str, domain: &Domain, options: &SearchOptions) -> Vec<RecordId> {
        let mut records = self.matching(collection, domain);
        if let Some(order) = &options.order {
            sort_records(&mut records, order);
        }
        records
            .iter()
            .skip(options.offset)
            .take(options.limit.unwrap_or(usize::MAX))
            .filter_map(|record| record.get("id").and_then(Value::as_i64))
            .collect()
    }

    fn read_sync(&self, collection: &str, ids: &[RecordId], options: &ReadOptions) -> Vec<Record> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(records) = collections.get(collection) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| records.get(id))
            .map(|record| project(record, &options.fields))
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn search(
        &self,
        collection: &str,
        domain: &Domain,
        options: SearchOptions,
    ) -> StoreResult<Vec<RecordId>> {
        self.record_call(collection, "search")?;
        Ok(self.search_sync(collection, domain, &options))
    }

    async fn read(
        &self,
        collection: &str,
        ids: &[RecordId],
        options: ReadOptions,
    ) -> StoreResult<Vec<Record>> {
        self.record_call(collection, "read")?;
        Ok(self.read_sync(collection, ids, &options))
    }

    async fn search_count(&self, collection: &str, domain: &Domain) -> StoreResult<usize> {
        self.record_call(collection, "search_count")?;
        Ok(self.matching(collection, domain).len())
    }

    // One round trip, like the real backend's combined call.
    async fn search_read(
        &self,
        collection: &str,
        domain: &Domain,
        search: SearchOptions,
        read: ReadOptions,
    ) -> StoreResult<Vec<Record>> {
        self.record_call(collection, "search_read")?;
        let ids = self.search_sync(collection, domain, &search);
        Ok(self.read_sync(collection, &ids, &read))
    }
}

// ============================================================================
// DOMAIN EVALUATION
// ============================================================================

/// Id carried by a scalar or `[id, name]` reference value.
fn reference_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Array(pair) => pair.first().and_then(Value::as_i64),
        _ => None,
    }
}

fn is_unset(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(false))
}

fn equals(field_value: &Value, expected: &Value) -> bool {
    if is_unset(expected) {
        return is_unset(field_value) || field_value.as_array().is_some_and(Vec::is_empty);
    }
    match field_value {
        // Many-to-one pair compared by id.
        Value::Array(items) if items.len() == 2 && items[1].is_string() => {
            reference_id(field_value) == expected.as_i64()
        }
        // To-many list matches when it contains the value.
        Value::Array(items) => items
            .iter()
            .any(|item| reference_id(item).is_some() && reference_id(item) == expected.as_i64()),
        other => other == expected,
    }
}

fn matches(record: &Record, condition: &Condition) -> bool {
    // Related paths such as `categ_id.complete_name` are stored denormalised
    // under the dotted key.
    let field_value = record.get(&condition.field).unwrap_or(&Value::Bool(false));
    match condition.op {
        Operator::Eq => equals(field_value, &condition.value),
        Operator::NotEq => !equals(field_value, &condition.value),
        Operator::In => condition
            .value
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| equals(field_value, c))),
        Operator::Ilike => match (field_value.as_str(), condition.value.as_str()) {
            (Some(haystack), Some(needle)) => {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            }
            _ => false,
        },
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (x, y) if is_unset(x) && !is_unset(y) => Ordering::Less,
        (x, y) if !is_unset(x) && is_unset(y) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Sort by an order clause like `"name asc, id desc"`.
fn sort_records(records: &mut [Record], order: &str) {
    let keys: Vec<(String, bool)> = order
        .split(',')
        .filter_map(|part| {
            let mut words = part.split_whitespace();
            let field = words.next()?.to_string();
            let descending = words
                .next()
                .is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));
            Some((field, descending))
        })
        .collect();

    let unset = Value::Bool(false);
    records.sort_by(|a, b| {
        for (field, descending) in &keys {
            let ordering = compare_values(
                a.get(field).unwrap_or(&unset),
                b.get(field).unwrap_or(&unset),
            );
            let ordering = if *descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Project a record to `fields`, always keeping `id`. Unknown fields read as unset.
fn project(record: &Record, fields: &[String]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    let mut projected = Record::new();
    if let Some(id) = record.get("id") {
        projected.insert("id".to_string(), id.clone());
    }
    for field in fields {
        let value = record.get(field).cloned().unwrap_or(Value::Bool(false));
        projected.insert(field.clone(), value);
    }
    projected
}
