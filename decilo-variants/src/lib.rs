//! Decilo Variants - Variant Resolution & Cache Engine
//!
//! Resolves human-readable attribute selections to concrete product
//! variants, computes forbidden option combinations and serves variant
//! imagery with template fallback. Record store round trips are the only
//! expensive operation, so everything is batched and cached:
//!
//! - [`TemplateMetadataCache`] keeps one [`Snapshot`] per template and locale
//! - [`resolve`] is a pure function over a snapshot
//! - [`ExclusionComputer`] answers on demand
//! - [`ImageResolver`] caches at three levels
//!
//! [`VariantEngine`] wires them together.

pub mod catalog;
pub mod engine;
pub mod exclusions;
pub mod images;
pub mod metadata;
pub mod resolver;

pub use catalog::{CatalogBrowser, TemplateQuery, DEFAULT_TEMPLATE_ORDER};
pub use engine::{EngineCacheStats, VariantEngine};
pub use exclusions::ExclusionComputer;
pub use images::{ImageCacheStats, ImageResolver};
pub use metadata::{Candidate, Snapshot, SnapshotSources, TemplateMetadataCache};
pub use resolver::{resolve, Resolved};

/// Distinct items in first-seen order.
pub(crate) fn unique<T: Copy + Eq + std::hash::Hash>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|item| seen.insert(*item)).collect()
}
