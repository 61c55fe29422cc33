//! Decilo Test Utilities
//!
//! Shared test infrastructure for the Decilo workspace:
//! - A catalog fixture that seeds the in-memory record store with records
//!   shaped the way the backend returns them
//! - Proptest generators for selections and attribute grids
//! - Custom assertions for Decilo error kinds

// Re-export the mock store and clock from their source crate
pub use decilo_storage::{encode_binary, CatalogClient, InMemoryRecordStore, ManualClock};

// Re-export core types for convenience
pub use decilo_core::{
    AttributeId, AttributeLineId, AttributeValueId, CatalogSchema, DeciloError, DeciloResult,
    ExclusionGroupId, ImageSize, RecordId, RecordIdType, RecordStoreError, ResolutionError,
    Selection, TavId, TemplateId, VariantId,
};

use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

// ============================================================================
// CATALOG FIXTURE
// ============================================================================

/// Builder that writes a product catalog into an [`InMemoryRecordStore`].
///
/// Ids are allocated from one counter shared by every collection, so a TAV
/// id never collides with an attribute value id unless a test sets that up
/// on purpose. References are written as `[id, name]` pairs.
#[derive(Debug)]
pub struct CatalogFixture {
    store: Arc<InMemoryRecordStore>,
    schema: CatalogSchema,
    next_id: RecordId,
    names: HashMap<RecordId, String>,
    value_attributes: HashMap<AttributeValueId, AttributeId>,
    template_lines: HashMap<TemplateId, Vec<RecordId>>,
    tav_groups: HashMap<TavId, Vec<RecordId>>,
}

impl Default for CatalogFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogFixture {
    pub fn new() -> Self {
        Self::with_schema(CatalogSchema::v17())
    }

    pub fn with_schema(schema: CatalogSchema) -> Self {
        Self {
            store: Arc::new(InMemoryRecordStore::new()),
            schema,
            next_id: 1,
            names: HashMap::new(),
            value_attributes: HashMap::new(),
            template_lines: HashMap::new(),
            tav_groups: HashMap::new(),
        }
    }

    pub fn store(&self) -> Arc<InMemoryRecordStore> {
        self.store.clone()
    }

    pub fn schema(&self) -> &CatalogSchema {
        &self.schema
    }

    pub fn client(&self) -> CatalogClient {
        CatalogClient::new(self.store.clone(), self.schema.clone())
    }

    /// Skip `count` ids, e.g. to make a raw value id line up with a TAV id.
    pub fn skip_ids(&mut self, count: i64) {
        self.next_id += count;
    }

    fn allocate(&mut self, name: &str) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        self.names.insert(id, name.to_string());
        id
    }

    fn reference(&self, id: RecordId) -> Value {
        match self.names.get(&id) {
            Some(name) => json!([id, name]),
            None => json!(id),
        }
    }

    // === Templates ===

    /// A sellable template with no attributes and no default variant.
    pub fn add_template(&mut self, name: &str) -> TemplateId {
        let id = self.allocate(name);
        let t = &self.schema.templates;
        let mut record = serde_json::Map::new();
        record.insert("id".into(), json!(id));
        record.insert(t.name.clone(), json!(name));
        record.insert(t.default_variant.clone(), json!(false));
        record.insert(t.attribute_lines.clone(), json!([]));
        record.insert(t.list_price.clone(), json!(10.0));
        record.insert(t.default_code.clone(), json!(false));
        record.insert(t.description.clone(), json!(false));
        record.insert(t.sale_ok.clone(), json!(true));
        record.insert(t.category_path.clone(), json!("All"));
        self.store.insert(&t.collection, Value::Object(record));
        TemplateId::new(id)
    }

    pub fn set_sellable(&self, template: TemplateId, sellable: bool) {
        let t = &self.schema.templates;
        self.store
            .update(&t.collection, template.raw(), &t.sale_ok, json!(sellable));
    }

    pub fn set_category(&self, template: TemplateId, path: &str) {
        let t = &self.schema.templates;
        self.store
            .update(&t.collection, template.raw(), &t.category_path, json!(path));
    }

    pub fn set_list_price(&self, template: TemplateId, price: f64) {
        let t = &self.schema.templates;
        self.store
            .update(&t.collection, template.raw(), &t.list_price, json!(price));
    }

    pub fn set_default_variant(&self, template: TemplateId, variant: VariantId) {
        let t = &self.schema.templates;
        let value = self.reference(variant.raw());
        self.store
            .update(&t.collection, template.raw(), &t.default_variant, value);
    }

    // === Attributes ===

    pub fn add_attribute(&mut self, name: &str) -> AttributeId {
        let id = self.allocate(name);
        let f = &self.schema.attributes;
        self.store.insert(
            &f.collection,
            record(id, [(f.name.as_str(), json!(name))]),
        );
        AttributeId::new(id)
    }

    /// A value whose attribute reference carries the attribute's name.
    pub fn add_value(&mut self, attribute: AttributeId, name: &str) -> AttributeValueId {
        let attribute_ref = self.reference(attribute.raw());
        self.insert_value(attribute, attribute_ref, name)
    }

    /// A value whose attribute reference is a bare id. TAVs bound to it still
    /// carry the named attribute reference.
    pub fn add_bare_value(&mut self, attribute: AttributeId, name: &str) -> AttributeValueId {
        self.insert_value(attribute, json!(attribute.raw()), name)
    }

    fn insert_value(
        &mut self,
        attribute: AttributeId,
        attribute_ref: Value,
        name: &str,
    ) -> AttributeValueId {
        let id = self.allocate(name);
        self.value_attributes.insert(AttributeValueId::new(id), attribute);
        let f = &self.schema.attribute_values;
        self.store.insert(
            &f.collection,
            record(
                id,
                [(f.name.as_str(), json!(name)), (f.attribute.as_str(), attribute_ref)],
            ),
        );
        AttributeValueId::new(id)
    }

    /// Bind `attribute` to `template` offering `values`.
    pub fn add_line(
        &mut self,
        template: TemplateId,
        attribute: AttributeId,
        values: &[AttributeValueId],
    ) -> AttributeLineId {
        let name = self.names.get(&attribute.raw()).cloned().unwrap_or_default();
        let id = self.allocate(&name);
        let f = &self.schema.attribute_lines;
        self.store.insert(
            &f.collection,
            record(
                id,
                [
                    (f.template.as_str(), self.reference(template.raw())),
                    (f.attribute.as_str(), self.reference(attribute.raw())),
                    (f.values.as_str(), json!(raw(values))),
                ],
            ),
        );

        let lines = self.template_lines.entry(template).or_default();
        lines.push(id);
        let t = &self.schema.templates;
        self.store
            .update(&t.collection, template.raw(), &t.attribute_lines, json!(lines));
        AttributeLineId::new(id)
    }

    pub fn add_tav(&mut self, template: TemplateId, value: AttributeValueId) -> TavId {
        let name = self.names.get(&value.raw()).cloned().unwrap_or_default();
        let id = self.allocate(&name);
        let attribute_ref = match self.value_attributes.get(&value) {
            Some(attribute) => self.reference(attribute.raw()),
            None => json!(false),
        };
        let f = &self.schema.tavs;
        self.store.insert(
            &f.collection,
            record(
                id,
                [
                    (f.template.as_str(), self.reference(template.raw())),
                    (f.attribute.as_str(), attribute_ref),
                    (f.attribute_value.as_str(), self.reference(value.raw())),
                    (f.exclusions.as_str(), json!([])),
                ],
            ),
        );
        TavId::new(id)
    }

    // === Variants ===

    pub fn add_variant(&mut self, template: TemplateId, tavs: &[TavId], display_name: &str) -> VariantId {
        let id = self.allocate(display_name);
        let f = &self.schema.variants;
        self.store.insert(
            &f.collection,
            record(
                id,
                [
                    (f.template.as_str(), self.reference(template.raw())),
                    (f.tavs.as_str(), json!(raw(tavs))),
                    (f.display_name.as_str(), json!(display_name)),
                ],
            ),
        );
        VariantId::new(id)
    }

    // === Exclusions ===

    /// Declare on `tav` a group excluding `members`.
    ///
    /// `owner` is the template stored on the group; pass another template or
    /// `None` to model foreign or orphaned groups. Members are written as
    /// given, so raw attribute value ids can be mixed in.
    pub fn add_exclusion(
        &mut self,
        tav: TavId,
        owner: Option<TemplateId>,
        members: &[RecordId],
    ) -> ExclusionGroupId {
        let id = self.allocate("exclusion");
        let f = &self.schema.exclusion_groups;
        let owner_ref = owner.map_or(json!(false), |t| self.reference(t.raw()));
        self.store.insert(
            &f.collection,
            record(
                id,
                [(f.template.as_str(), owner_ref), (f.members.as_str(), json!(members))],
            ),
        );

        let groups = self.tav_groups.entry(tav).or_default();
        groups.push(id);
        let t = &self.schema.tavs;
        self.store
            .update(&t.collection, tav.raw(), &t.exclusions, json!(groups));
        ExclusionGroupId::new(id)
    }

    // === Images ===

    pub fn set_template_image(&self, template: TemplateId, size: ImageSize, bytes: &[u8]) {
        let t = &self.schema.templates;
        self.store.update(
            &t.collection,
            template.raw(),
            t.images.field(size),
            json!(encode_binary(bytes)),
        );
    }

    pub fn set_variant_image(&self, variant: VariantId, size: ImageSize, bytes: &[u8]) {
        let v = &self.schema.variants;
        self.store.update(
            &v.collection,
            variant.raw(),
            v.images.field(size),
            json!(encode_binary(bytes)),
        );
    }

    /// Write a filename companion field on a variant. The schema decides
    /// whether it is ever read.
    pub fn set_variant_field(&self, variant: VariantId, field: &str, value: Value) {
        self.store
            .update(&self.schema.variants.collection, variant.raw(), field, value);
    }

    /// Register `field` on `collection` in the model field registry.
    pub fn add_model_field(&mut self, collection: &str, field: &str) {
        let id = self.allocate(field);
        let r = &self.schema.model_fields;
        self.store.insert(
            &r.collection,
            record(
                id,
                [(r.model.as_str(), json!(collection)), (r.name.as_str(), json!(field))],
            ),
        );
    }

    // === Grids ===

    /// A template with one line per axis and one variant per combination.
    ///
    /// Variants are created in row-major order of `axes`, so the first axis
    /// varies slowest and candidate order follows combination order.
    pub fn grid(&mut self, name: &str, axes: &[(&str, &[&str])]) -> GridTemplate {
        let template = self.add_template(name);
        let mut tavs = Vec::new();
        let mut per_axis: Vec<Vec<(String, String, TavId)>> = Vec::new();

        for (attribute_name, values) in axes {
            let attribute = self.add_attribute(attribute_name);
            let value_ids: Vec<AttributeValueId> = values
                .iter()
                .map(|value| self.add_value(attribute, value))
                .collect();
            self.add_line(template, attribute, &value_ids);

            let mut axis = Vec::new();
            for (value_name, value) in values.iter().zip(value_ids) {
                let tav = self.add_tav(template, value);
                let entry = (attribute_name.to_string(), value_name.to_string(), tav);
                tavs.push(entry.clone());
                axis.push(entry);
            }
            per_axis.push(axis);
        }

        let mut variants = Vec::new();
        for combination in cartesian(&per_axis) {
            let options: Vec<(String, String)> = combination
                .iter()
                .map(|(attribute, value, _)| (attribute.clone(), value.clone()))
                .collect();
            let tav_ids: Vec<TavId> = combination.iter().map(|(_, _, tav)| *tav).collect();
            let label = options
                .iter()
                .map(|(_, value)| value.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let display_name = if label.is_empty() {
                name.to_string()
            } else {
                format!("{} ({})", name, label)
            };
            let id = self.add_variant(template, &tav_ids, &display_name);
            variants.push(GridVariant {
                id,
                options,
                tavs: tav_ids.into_iter().collect(),
                display_name,
            });
        }

        GridTemplate {
            template,
            tavs,
            variants,
        }
    }
}

fn record<'a>(id: RecordId, fields: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("id".into(), json!(id));
    for (field, value) in fields {
        map.insert(field.to_string(), value);
    }
    Value::Object(map)
}

fn raw<T: RecordIdType>(ids: &[T]) -> Vec<RecordId> {
    ids.iter().map(|id| id.get()).collect()
}

fn cartesian<T: Clone>(axes: &[Vec<T>]) -> Vec<Vec<T>> {
    axes.iter().fold(vec![Vec::new()], |acc, axis| {
        acc.iter()
            .flat_map(|prefix| {
                axis.iter().map(move |item| {
                    let mut next = prefix.clone();
                    next.push(item.clone());
                    next
                })
            })
            .collect()
    })
}

/// One variant of a [`GridTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridVariant {
    pub id: VariantId,
    /// `(attribute, value)` per axis, in axis order.
    pub options: Vec<(String, String)>,
    pub tavs: BTreeSet<TavId>,
    pub display_name: String,
}

impl GridVariant {
    /// The full selection naming this variant.
    pub fn selection(&self) -> Selection {
        self.options.iter().cloned().collect()
    }
}

/// A template written by [`CatalogFixture::grid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTemplate {
    pub template: TemplateId,
    /// `(attribute, value, tav)` for every option, in axis order.
    pub tavs: Vec<(String, String, TavId)>,
    pub variants: Vec<GridVariant>,
}

impl GridTemplate {
    pub fn tav(&self, attribute: &str, value: &str) -> Option<TavId> {
        self.tavs
            .iter()
            .find(|(a, v, _)| a == attribute && v == value)
            .map(|(_, _, tav)| *tav)
    }

    /// The variant whose options are exactly `options`, in any order.
    pub fn variant(&self, options: &[(&str, &str)]) -> Option<&GridVariant> {
        self.variants.iter().find(|variant| {
            variant.options.len() == options.len()
                && options.iter().all(|(attribute, value)| {
                    variant
                        .options
                        .iter()
                        .any(|(a, v)| a == attribute && v == value)
                })
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Decilo inputs.

    use super::*;
    use proptest::prelude::*;

    /// A display name like `Size` or `Left`.
    pub fn arb_display_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{2,8}"
    }

    /// Names that stay distinct after trimming and lowercasing.
    pub fn arb_distinct_names(count: std::ops::RangeInclusive<usize>) -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set("[a-z]{3,8}", count).prop_map(|names| {
            names
                .into_iter()
                .map(|name| {
                    let mut chars = name.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => name,
                    }
                })
                .collect()
        })
    }

    /// Attribute axes for [`CatalogFixture::grid`]: one to three attributes,
    /// each with one to three values.
    pub fn arb_axes() -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
        arb_distinct_names(1..=3).prop_flat_map(|attributes| {
            let count = attributes.len();
            prop::collection::vec(arb_distinct_names(1..=3), count).prop_map(move |values| {
                attributes.clone().into_iter().zip(values).collect()
            })
        })
    }

    /// The same name with random letter case and surrounding whitespace.
    pub fn arb_respelling(name: String) -> impl Strategy<Value = String> {
        let len = name.chars().count();
        (
            prop::collection::vec(any::<bool>(), len),
            "[ \t]{0,2}",
            "[ \t]{0,2}",
        )
            .prop_map(move |(upper, lead, trail)| {
                let body: String = name
                    .chars()
                    .zip(upper)
                    .map(|(c, up)| {
                        if up {
                            c.to_uppercase().collect::<String>()
                        } else {
                            c.to_lowercase().collect::<String>()
                        }
                    })
                    .collect();
                format!("{}{}{}", lead, body, trail)
            })
    }

    /// An arbitrary selection of up to three options.
    pub fn arb_selection() -> impl Strategy<Value = Selection> {
        prop::collection::btree_map(arb_display_name(), arb_display_name(), 0..=3)
            .prop_map(Selection::from)
    }

    pub fn arb_image_size() -> impl Strategy<Value = ImageSize> {
        prop::sample::select(ImageSize::ALL.to_vec())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Decilo results and store traffic.

    use super::*;

    /// Assert that a result failed with exactly `expected`.
    #[track_caller]
    pub fn assert_resolution_error<T: std::fmt::Debug>(
        result: &DeciloResult<T>,
        expected: &ResolutionError,
    ) {
        match result {
            Err(DeciloError::Resolution(err)) => assert_eq!(err, expected),
            other => panic!("Expected resolution error {:?}, got: {:?}", expected, other),
        }
    }

    #[track_caller]
    pub fn assert_record_store_error<T: std::fmt::Debug>(result: &DeciloResult<T>) {
        match result {
            Err(DeciloError::RecordStore(_)) => {}
            other => panic!("Expected record store error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &DeciloResult<T>) {
        match result {
            Err(DeciloError::Config(_)) => {}
            other => panic!("Expected config error, got: {:?}", other),
        }
    }

    /// Assert the number of `method` calls made on `collection`.
    #[track_caller]
    pub fn assert_calls(store: &InMemoryRecordStore, collection: &str, method: &str, expected: usize) {
        let actual = store.calls(collection, method);
        assert_eq!(
            actual, expected,
            "Expected {} {}.{} calls, got {}",
            expected, collection, method, actual
        );
    }

    #[track_caller]
    pub fn assert_total_calls_at_most(store: &InMemoryRecordStore, limit: usize) {
        let actual = store.total_calls();
        assert!(
            actual <= limit,
            "Expected at most {} record store calls, got {}",
            limit,
            actual
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_grid_is_readable_through_client() {
        let mut fixture = CatalogFixture::new();
        let grid = fixture.grid("Ear Tip", &[("Size", &["S", "M"]), ("Side", &["Left", "Right"])]);
        assert_eq!(grid.variants.len(), 4);
        assert_eq!(grid.variants[1].display_name, "Ear Tip (S, Right)");

        let client = fixture.client();
        let template = client
            .template(grid.template, "en_US")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.name, "Ear Tip");
        assert_eq!(template.attribute_lines.len(), 2);

        let variants = client
            .variants_for_template(grid.template, "en_US")
            .await
            .unwrap();
        let ids: Vec<VariantId> = variants.iter().map(|v| v.id).collect();
        let expected: Vec<VariantId> = grid.variants.iter().map(|v| v.id).collect();
        assert_eq!(ids, expected);
        assert_eq!(variants[3].tavs, grid.variants[3].tavs);
    }

    #[tokio::test]
    async fn test_exclusions_are_attached_to_tav() {
        let mut fixture = CatalogFixture::new();
        let grid = fixture.grid("Ear Tip", &[("Size", &["S", "M"])]);
        let small = grid.tav("Size", "S").unwrap();
        let medium = grid.tav("Size", "M").unwrap();
        let group = fixture.add_exclusion(small, Some(grid.template), &[medium.raw()]);

        let client = fixture.client();
        let tavs = client
            .template_attribute_values(grid.template, "en_US")
            .await
            .unwrap();
        let declaring = tavs.iter().find(|tav| tav.id == small).unwrap();
        assert_eq!(declaring.exclusion_groups, vec![group]);

        let groups = client.exclusion_groups(&[group]).await.unwrap();
        assert_eq!(groups[0].template, Some(grid.template));
        assert_eq!(groups[0].members, vec![medium.raw()]);
    }

    #[tokio::test]
    async fn test_images_round_trip_through_store() {
        let mut fixture = CatalogFixture::new();
        let grid = fixture.grid("Ear Tip", &[("Size", &["S"])]);
        let variant = grid.variants[0].id;
        fixture.set_variant_image(variant, ImageSize::Small, b"png");

        let client = fixture.client();
        let image = client.variant_image(variant, ImageSize::Small).await.unwrap();
        assert_eq!(image.map(|i| i.bytes), Some(b"png".to_vec()));
        assert!(client
            .template_image(grid.template, ImageSize::Small)
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_grid_lookup_ignores_option_order() {
        let mut fixture = CatalogFixture::new();
        let grid = fixture.grid("Ear Tip", &[("Size", &["S", "M"]), ("Side", &["Left"])]);
        let found = grid.variant(&[("Side", "Left"), ("Size", "M")]).unwrap();
        assert_eq!(found.display_name, "Ear Tip (M, Left)");
        assert_eq!(found.selection().len(), 2);
        assert!(grid.variant(&[("Size", "M")]).is_none());
    }

    #[test]
    fn test_assertion_resolution_error() {
        let result: DeciloResult<()> = Err(ResolutionError::NoMatchingVariant.into());
        assertions::assert_resolution_error(&result, &ResolutionError::NoMatchingVariant);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_axes_have_distinct_names(axes in generators::arb_axes()) {
            let names: BTreeSet<String> = axes.iter().map(|(a, _)| a.to_lowercase()).collect();
            prop_assert_eq!(names.len(), axes.len());
            for (_, values) in &axes {
                prop_assert!(!values.is_empty());
            }
        }

        #[test]
        fn prop_respelling_normalizes_back(
            (name, spelled) in generators::arb_display_name()
                .prop_flat_map(|name| (Just(name.clone()), generators::arb_respelling(name)))
        ) {
            prop_assert_eq!(
                decilo_core::normalize_name(&spelled),
                decilo_core::normalize_name(&name)
            );
        }
    }
}
