//! Decilo Storage - Record Store Access and Cache Layer
//!
//! Everything that talks to the external record store lives here: the
//! [`RecordStore`] trait and its filter predicates, the decoding boundary
//! that turns raw records into catalog types, the typed [`CatalogClient`],
//! the JSON-RPC transport and an in-memory mock. The TTL cache layer shared
//! by the engine is also defined here.

pub mod cache;
pub mod client;
pub mod decode;
pub mod mock;
pub mod record_store;
pub mod rpc;
pub mod schema;

pub use cache::{
    CacheRead, CacheStats, Clock, ImageResultKey, ManualClock, SnapshotKey, SystemClock,
    TemplateImageKey, TtlCache, VariantImageKey,
};
pub use client::{CatalogClient, VARIANT_ORDER};
pub use decode::{encode_binary, RecordDecoder};
pub use mock::InMemoryRecordStore;
pub use record_store::{
    Condition, Domain, Operator, ReadOptions, Record, RecordStore, SearchOptions, StoreResult,
};
pub use rpc::{JsonRpcConfig, JsonRpcRecordStore, DEFAULT_RPC_TIMEOUT};
pub use schema::{field_exists, probe_optional_fields};
