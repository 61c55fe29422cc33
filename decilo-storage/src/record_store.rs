//! Record store abstraction.
//!
//! The record store is the external order/inventory system. It only offers
//! generic search/read/count calls against named collections, and every call
//! is a network round trip. This module defines that surface and the filter
//! predicates passed through it.

use async_trait::async_trait;
use decilo_core::{RecordId, RecordStoreError};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A raw record as returned by the store: field name to JSON value.
pub type Record = serde_json::Map<String, Value>;

/// Result type for record store calls.
pub type StoreResult<T> = Result<T, RecordStoreError>;

// ============================================================================
// DOMAIN PREDICATES
// ============================================================================

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    In,
    /// Case-insensitive substring match.
    Ilike,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::In => "in",
            Operator::Ilike => "ilike",
        }
    }
}

/// One `field op value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.field, self.op.as_str(), &self.value).serialize(serializer)
    }
}

/// Conjunction of conditions. An empty domain matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Domain {
    conditions: Vec<Condition>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Operator::Eq, value)
    }

    pub fn ilike(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(field, Operator::Ilike, Value::String(value.into()))
    }

    pub fn in_ids(self, field: impl Into<String>, ids: &[RecordId]) -> Self {
        self.with(field, Operator::In, Value::from(ids.to_vec()))
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

// ============================================================================
// CALL OPTIONS
// ============================================================================

/// Paging and ordering for `search`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub offset: usize,
    /// Order clause passed through verbatim, e.g. `"name asc"`.
    pub order: Option<String>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }
}

/// Field projection and locale for `read`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub fields: Vec<String>,
    /// Locale for translatable display names.
    pub lang: Option<String>,
}

impl ReadOptions {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            lang: None,
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

// ============================================================================
// RECORD STORE TRAIT
// ============================================================================

/// Generic record-oriented RPC interface of the external system.
///
/// Implementations must be thread-safe. They do not retry; every error is
/// returned to the caller as-is.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find ids of records in `collection` matching `domain`.
    async fn search(
        &self,
        collection: &str,
        domain: &Domain,
        options: SearchOptions,
    ) -> StoreResult<Vec<RecordId>>;

    /// Read the given records, projected to `options.fields`.
    ///
    /// Every returned record carries its `id`. Ids that do not exist are
    /// silently skipped.
    async fn read(
        &self,
        collection: &str,
        ids: &[RecordId],
        options: ReadOptions,
    ) -> StoreResult<Vec<Record>>;

    /// Count records in `collection` matching `domain`.
    async fn search_count(&self, collection: &str, domain: &Domain) -> StoreResult<usize>;

    /// Search then read in listing order.
    ///
    /// The default issues two calls; transports with a combined call
    /// should override it.
    async fn search_read(
        &self,
        collection: &str,
        domain: &Domain,
        search: SearchOptions,
        read: ReadOptions,
    ) -> StoreResult<Vec<Record>> {
        let ids = self.search(collection, domain, search).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.read(collection, &ids, read).await
    }
}
