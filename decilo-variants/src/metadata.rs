//! Template metadata snapshots and their cache.
//!
//! A [`Snapshot`] is everything the resolver needs about one template in one
//! locale: the `(attribute name, value name) -> TAV` index and the candidate
//! variants with their TAV sets. Snapshots are immutable once built and are
//! replaced whole when they expire.

use decilo_core::{
    normalize_name, AttributeValue, AttributeValueId, RecordStoreError, TavId, Template,
    TemplateAttributeValue, TemplateId, Timestamp, Variant, VariantId,
};
use decilo_storage::{CacheStats, CatalogClient, Clock, SnapshotKey, StoreResult, TtlCache};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::unique;

/// One variant as the resolver sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub variant_id: VariantId,
    pub tav_set: BTreeSet<TavId>,
    pub display_name: Option<String>,
}

/// Decoded records a snapshot is assembled from.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotSources<'a> {
    pub template: Option<&'a Template>,
    pub tavs: &'a [TemplateAttributeValue],
    pub values: &'a [AttributeValue],
    pub variants: &'a [Variant],
}

/// Precomputed selector and candidate index for one `(template, locale)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    template_id: TemplateId,
    locale: String,
    default_variant: Option<VariantId>,
    selector_to_tav: HashMap<(String, String), TavId>,
    attribute_names: HashSet<String>,
    candidates: Vec<Candidate>,
    built_at: Timestamp,
}

impl Snapshot {
    /// An empty snapshot: no configurable attributes, no candidates.
    pub fn new(template_id: TemplateId, locale: impl Into<String>, built_at: Timestamp) -> Self {
        Self {
            template_id,
            locale: locale.into(),
            default_variant: None,
            selector_to_tav: HashMap::new(),
            attribute_names: HashSet::new(),
            candidates: Vec::new(),
            built_at,
        }
    }

    pub fn with_default_variant(mut self, variant: Option<VariantId>) -> Self {
        self.default_variant = variant;
        self
    }

    /// Register a selector. The first TAV registered for a pair wins.
    pub fn with_selector(mut self, attribute: &str, value: &str, tav: TavId) -> Self {
        self.add_selector(attribute, value, tav);
        self
    }

    /// Append a candidate. Candidates are scanned in the order added.
    pub fn with_candidate(
        mut self,
        variant_id: VariantId,
        tavs: impl IntoIterator<Item = TavId>,
        display_name: Option<String>,
    ) -> Self {
        self.candidates.push(Candidate {
            variant_id,
            tav_set: tavs.into_iter().collect(),
            display_name,
        });
        self
    }

    fn add_selector(&mut self, attribute: &str, value: &str, tav: TavId) {
        let attribute = normalize_name(attribute);
        self.attribute_names.insert(attribute.clone());
        let key = (attribute, normalize_name(value));
        if let Some(existing) = self.selector_to_tav.get(&key) {
            tracing::debug!(
                template_id = %self.template_id,
                attribute = %key.0,
                value = %key.1,
                kept = %existing,
                dropped = %tav,
                "Duplicate attribute value name on template"
            );
            return;
        }
        self.selector_to_tav.insert(key, tav);
    }

    /// Build a snapshot from decoded catalog records.
    ///
    /// The attribute name comes from the TAV's own attribute reference, then
    /// from the value's. TAVs with no known value or attribute name are
    /// skipped. Variants keep the order they are given in, and a template
    /// without TAVs has no candidates.
    pub fn assemble(
        template_id: TemplateId,
        locale: impl Into<String>,
        sources: &SnapshotSources<'_>,
        built_at: Timestamp,
    ) -> Self {
        let mut snapshot = Snapshot::new(template_id, locale, built_at)
            .with_default_variant(sources.template.and_then(|t| t.default_variant));

        let values: HashMap<AttributeValueId, &AttributeValue> =
            sources.values.iter().map(|v| (v.id, v)).collect();

        for tav in sources.tavs {
            let Some(value) = values.get(&tav.attribute_value) else {
                tracing::trace!(tav = %tav.id, "Attribute value of TAV not found, skipping");
                continue;
            };
            let attribute = tav
                .attribute_name
                .as_deref()
                .or(value.attribute_name.as_deref());
            let Some(attribute) = attribute else {
                tracing::trace!(tav = %tav.id, "Attribute of TAV not found, skipping");
                continue;
            };
            snapshot.add_selector(attribute, &value.name, tav.id);
        }

        if sources.tavs.is_empty() {
            if !sources.variants.is_empty() {
                tracing::debug!(
                    template_id = %template_id,
                    variants = sources.variants.len(),
                    "Template has variants but no attribute values, ignoring them"
                );
            }
            return snapshot;
        }

        for variant in sources.variants {
            snapshot.candidates.push(Candidate {
                variant_id: variant.id,
                tav_set: variant.tavs.clone(),
                display_name: variant.display_name.clone(),
            });
        }

        snapshot
    }

    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn default_variant(&self) -> Option<VariantId> {
        self.default_variant
    }

    /// TAV for a normalised `(attribute, value)` pair.
    pub fn lookup(&self, attribute: &str, value: &str) -> Option<TavId> {
        self.selector_to_tav
            .get(&(attribute.to_string(), value.to_string()))
            .copied()
    }

    /// Whether the template has an attribute with this normalised name.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attribute_names.contains(attribute)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, variant: VariantId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.variant_id == variant)
    }

    pub fn selector_count(&self) -> usize {
        self.selector_to_tav.len()
    }

    /// No configurable attributes and no variants.
    pub fn is_empty(&self) -> bool {
        self.selector_to_tav.is_empty() && self.candidates.is_empty()
    }

    pub fn built_at(&self) -> Timestamp {
        self.built_at
    }
}

// ============================================================================
// TEMPLATE METADATA CACHE
// ============================================================================

/// Per-`(template, locale)` snapshot cache.
pub struct TemplateMetadataCache {
    client: CatalogClient,
    clock: Arc<dyn Clock>,
    snapshots: TtlCache<SnapshotKey, Snapshot>,
}

impl TemplateMetadataCache {
    pub fn new(client: CatalogClient, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            snapshots: TtlCache::new(ttl, clock.clone()),
            clock,
        }
    }

    /// Return the live snapshot, rebuilding it if absent or expired.
    pub async fn get_snapshot(
        &self,
        template: TemplateId,
        locale: &str,
    ) -> StoreResult<Arc<Snapshot>> {
        let key = SnapshotKey::new(template, locale);
        let read = self
            .snapshots
            .get_or_try_insert_with(key, || self.rebuild(template, locale))
            .await?;
        if read.was_cache_hit() {
            tracing::trace!(template_id = %template, locale, "Snapshot cache hit");
        }
        Ok(read.into_value())
    }

    /// Fetch everything a snapshot needs in at most four store calls.
    ///
    /// The TAV search carries attribute names on its attribute references, so
    /// the only dependent read is the value read. That chain runs concurrently
    /// with the variant and template reads.
    async fn rebuild(&self, template: TemplateId, locale: &str) -> StoreResult<Snapshot> {
        tracing::debug!(template_id = %template, locale, "Rebuilding template snapshot");

        let selectors = async {
            let tavs = self.client.template_attribute_values(template, locale).await?;
            let value_ids = unique(tavs.iter().map(|tav| tav.attribute_value));
            let values = self.client.attribute_values(&value_ids, locale).await?;
            Ok::<_, RecordStoreError>((tavs, values))
        };

        let ((tavs, values), variants, record) = tokio::try_join!(
            selectors,
            self.client.variants_for_template(template, locale),
            self.client.template(template, locale),
        )?;

        let sources = SnapshotSources {
            template: record.as_ref(),
            tavs: &tavs,
            values: &values,
            variants: &variants,
        };
        let snapshot = Snapshot::assemble(template, locale, &sources, self.clock.now());

        tracing::debug!(
            template_id = %template,
            locale,
            selectors = snapshot.selector_count(),
            candidates = snapshot.candidates().len(),
            "Template snapshot built"
        );
        Ok(snapshot)
    }

    pub fn stats(&self) -> CacheStats {
        self.snapshots.stats()
    }

    pub fn clear(&self) {
        self.snapshots.clear();
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }
}
