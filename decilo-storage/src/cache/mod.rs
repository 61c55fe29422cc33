//! TTL cache layer
//!
//! In-process caches for catalog metadata and image payloads. All caches
//! share one design:
//!
//! - one [`TtlCache`] per kind of value, constructed once per process
//! - an injected [`Clock`] decides expiry
//! - entries are swapped in whole, never mutated in place
//! - expiry is lazy, checked on lookup

mod clock;
mod freshness;
mod keys;
mod traits;
mod ttl_cache;

pub use clock::{Clock, ManualClock, SystemClock};
pub use freshness::{expiry_for, is_live, CacheRead};
pub use keys::{ImageResultKey, SnapshotKey, TemplateImageKey, VariantImageKey};
pub use traits::CacheStats;
pub use ttl_cache::TtlCache;
