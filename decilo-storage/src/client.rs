//! Typed catalog client.
//!
//! Wraps a [`RecordStore`] with one accessor per catalog record kind. Every
//! accessor is a single round trip, and list accessors take whole id batches,
//! so callers control how many calls a query costs.

use decilo_core::{
    raw_ids, Attribute, AttributeId, AttributeLine, AttributeLineId, AttributeValue,
    AttributeValueId, CatalogFilter, CatalogSchema, ExclusionGroup, ExclusionGroupId,
    ImageFields, ImagePayload, ImageSize, RecordId, RecordIdType, RecordStoreError, Ref,
    Template, TemplateAttributeValue, TemplateId, TavId, Variant, VariantId,
};
use std::sync::Arc;

use crate::decode::RecordDecoder;
use crate::record_store::{Domain, ReadOptions, Record, RecordStore, SearchOptions, StoreResult};

/// Listing order for variants. Resolution scans candidates in this order.
pub const VARIANT_ORDER: &str = "id asc";

/// Typed accessor over the record store.
#[derive(Clone)]
pub struct CatalogClient {
    store: Arc<dyn RecordStore>,
    schema: Arc<CatalogSchema>,
}

impl CatalogClient {
    pub fn new(store: Arc<dyn RecordStore>, schema: CatalogSchema) -> Self {
        Self {
            store,
            schema: Arc::new(schema),
        }
    }

    pub fn schema(&self) -> &CatalogSchema {
        &self.schema
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    // ========================================================================
    // TEMPLATES
    // ========================================================================

    fn template_fields(&self) -> Vec<String> {
        let t = &self.schema.templates;
        vec![
            t.name.clone(),
            t.default_variant.clone(),
            t.attribute_lines.clone(),
            t.list_price.clone(),
            t.default_code.clone(),
            t.description.clone(),
        ]
    }

    /// Base listing domain: the configured catalog filter plus an optional
    /// case-insensitive name match.
    pub fn listing_domain(&self, filter: &CatalogFilter, search: Option<&str>) -> Domain {
        let t = &self.schema.templates;
        let mut domain = Domain::new();
        if filter.sellable_only {
            domain = domain.where_eq(t.sale_ok.as_str(), true);
        }
        if let Some(path) = filter.category_path.as_deref() {
            domain = domain.ilike(t.category_path.as_str(), path);
        }
        if let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) {
            domain = domain.ilike(t.name.as_str(), term);
        }
        domain
    }

    pub async fn template(&self, id: TemplateId, lang: &str) -> StoreResult<Option<Template>> {
        Ok(self.templates(&[id], lang).await?.into_iter().next())
    }

    /// Read templates by id. Missing ids are skipped.
    pub async fn templates(&self, ids: &[TemplateId], lang: &str) -> StoreResult<Vec<Template>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let collection = &self.schema.templates.collection;
        let records = self
            .store
            .read(
                collection,
                &raw_ids(ids),
                ReadOptions::fields(self.template_fields()).lang(lang),
            )
            .await?;
        records
            .iter()
            .map(|record| self.decode_template(record))
            .collect()
    }

    pub async fn search_templates(
        &self,
        domain: &Domain,
        options: SearchOptions,
        lang: &str,
    ) -> StoreResult<Vec<Template>> {
        let collection = &self.schema.templates.collection;
        let records = self
            .store
            .search_read(
                collection,
                domain,
                options,
                ReadOptions::fields(self.template_fields()).lang(lang),
            )
            .await?;
        records
            .iter()
            .map(|record| self.decode_template(record))
            .collect()
    }

    pub async fn count_templates(&self, domain: &Domain) -> StoreResult<usize> {
        self.store
            .search_count(&self.schema.templates.collection, domain)
            .await
    }

    fn decode_template(&self, record: &Record) -> StoreResult<Template> {
        let t = &self.schema.templates;
        let d = RecordDecoder::new(&t.collection, record);
        Ok(Template {
            id: TemplateId::new(d.id()?),
            name: d.opt_string(&t.name)?.unwrap_or_default(),
            default_variant: d.reference(&t.default_variant)?.map(|r| r.typed()),
            attribute_lines: typed_ids(d.ids(&t.attribute_lines)?),
            list_price: d.opt_f64(&t.list_price)?,
            default_code: d.opt_string(&t.default_code)?,
            description: d.opt_string(&t.description)?,
        })
    }

    // ========================================================================
    // ATTRIBUTES
    // ========================================================================

    pub async fn attribute_lines(
        &self,
        ids: &[AttributeLineId],
        lang: &str,
    ) -> StoreResult<Vec<AttributeLine>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let f = &self.schema.attribute_lines;
        let records = self
            .store
            .read(
                &f.collection,
                &raw_ids(ids),
                ReadOptions::fields([f.attribute.as_str(), f.values.as_str()]).lang(lang),
            )
            .await?;
        records
            .iter()
            .map(|record| {
                let d = RecordDecoder::new(&f.collection, record);
                let attribute = required(&d, &f.collection, &f.attribute)?;
                Ok(AttributeLine {
                    id: AttributeLineId::new(d.id()?),
                    attribute: attribute.typed(),
                    attribute_name: attribute.display_name,
                    values: typed_ids(d.ids(&f.values)?),
                })
            })
            .collect()
    }

    pub async fn attribute_values(
        &self,
        ids: &[AttributeValueId],
        lang: &str,
    ) -> StoreResult<Vec<AttributeValue>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let f = &self.schema.attribute_values;
        let records = self
            .store
            .read(
                &f.collection,
                &raw_ids(ids),
                ReadOptions::fields([f.name.as_str(), f.attribute.as_str()]).lang(lang),
            )
            .await?;
        records
            .iter()
            .map(|record| {
                let d = RecordDecoder::new(&f.collection, record);
                let attribute = required(&d, &f.collection, &f.attribute)?;
                Ok(AttributeValue {
                    id: AttributeValueId::new(d.id()?),
                    name: d.opt_string(&f.name)?.unwrap_or_default(),
                    attribute: attribute.typed(),
                    attribute_name: attribute.display_name,
                })
            })
            .collect()
    }

    pub async fn attributes(&self, ids: &[AttributeId], lang: &str) -> StoreResult<Vec<Attribute>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let f = &self.schema.attributes;
        let records = self
            .store
            .read(
                &f.collection,
                &raw_ids(ids),
                ReadOptions::fields([f.name.as_str()]).lang(lang),
            )
            .await?;
        records
            .iter()
            .map(|record| {
                let d = RecordDecoder::new(&f.collection, record);
                Ok(Attribute {
                    id: AttributeId::new(d.id()?),
                    name: d.opt_string(&f.name)?.unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Every TAV bound to `template`, with its attribute, attribute value and
    /// declared exclusion groups. `lang` only affects the attribute name.
    pub async fn template_attribute_values(
        &self,
        template: TemplateId,
        lang: &str,
    ) -> StoreResult<Vec<TemplateAttributeValue>> {
        let f = &self.schema.tavs;
        let records = self
            .store
            .search_read(
                &f.collection,
                &Domain::new().where_eq(f.template.as_str(), template.raw()),
                SearchOptions::new().order("id asc"),
                ReadOptions::fields([
                    f.template.as_str(),
                    f.attribute.as_str(),
                    f.attribute_value.as_str(),
                    f.exclusions.as_str(),
                ])
                .lang(lang),
            )
            .await?;
        records
            .iter()
            .map(|record| {
                let d = RecordDecoder::new(&f.collection, record);
                let attribute = d.reference(&f.attribute)?;
                Ok(TemplateAttributeValue {
                    id: TavId::new(d.id()?),
                    template: d
                        .reference(&f.template)?
                        .map_or(template, |r| r.typed()),
                    attribute: attribute.as_ref().map(Ref::typed),
                    attribute_name: attribute.and_then(|r| r.display_name),
                    attribute_value: required(&d, &f.collection, &f.attribute_value)?.typed(),
                    exclusion_groups: typed_ids(d.ids(&f.exclusions)?),
                })
            })
            .collect()
    }

    // ========================================================================
    // VARIANTS & EXCLUSIONS
    // ========================================================================

    /// Every variant of `template`, in [`VARIANT_ORDER`].
    pub async fn variants_for_template(
        &self,
        template: TemplateId,
        lang: &str,
    ) -> StoreResult<Vec<Variant>> {
        let f = &self.schema.variants;
        let records = self
            .store
            .search_read(
                &f.collection,
                &Domain::new().where_eq(f.template.as_str(), template.raw()),
                SearchOptions::new().order(VARIANT_ORDER),
                ReadOptions::fields([f.template.as_str(), f.tavs.as_str(), f.display_name.as_str()])
                    .lang(lang),
            )
            .await?;
        records
            .iter()
            .map(|record| {
                let d = RecordDecoder::new(&f.collection, record);
                Ok(Variant {
                    id: VariantId::new(d.id()?),
                    template: d
                        .reference(&f.template)?
                        .map_or(template, |r| r.typed()),
                    tavs: d.ids(&f.tavs)?.into_iter().map(TavId::new).collect(),
                    display_name: d.opt_string(&f.display_name)?,
                })
            })
            .collect()
    }

    pub async fn exclusion_groups(
        &self,
        ids: &[ExclusionGroupId],
    ) -> StoreResult<Vec<ExclusionGroup>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let f = &self.schema.exclusion_groups;
        let records = self
            .store
            .read(
                &f.collection,
                &raw_ids(ids),
                ReadOptions::fields([f.template.as_str(), f.members.as_str()]),
            )
            .await?;
        records
            .iter()
            .map(|record| {
                let d = RecordDecoder::new(&f.collection, record);
                Ok(ExclusionGroup {
                    id: ExclusionGroupId::new(d.id()?),
                    template: d.reference(&f.template)?.map(|r| r.typed()),
                    members: d.ids(&f.members)?,
                })
            })
            .collect()
    }

    // ========================================================================
    // IMAGES
    // ========================================================================

    /// The template's own image at `size`, or `None` if it has none.
    pub async fn template_image(
        &self,
        template: TemplateId,
        size: ImageSize,
    ) -> StoreResult<Option<ImagePayload>> {
        let t = &self.schema.templates;
        self.image(&t.collection, &t.images, template.raw(), size)
            .await
    }

    /// The variant's own image at `size`, or `None` if it has none.
    pub async fn variant_image(
        &self,
        variant: VariantId,
        size: ImageSize,
    ) -> StoreResult<Option<ImagePayload>> {
        let v = &self.schema.variants;
        self.image(&v.collection, &v.images, variant.raw(), size)
            .await
    }

    async fn image(
        &self,
        collection: &str,
        fields: &ImageFields,
        id: RecordId,
        size: ImageSize,
    ) -> StoreResult<Option<ImagePayload>> {
        let image_field = fields.field(size);
        let mut projection = vec![image_field.to_string()];
        if let Some(filename) = &fields.filename {
            projection.push(filename.clone());
        }

        let records = self
            .store
            .read(collection, &[id], ReadOptions::fields(projection))
            .await?;
        let Some(record) = records.first() else {
            return Ok(None);
        };

        let d = RecordDecoder::new(collection, record);
        let Some(bytes) = d.binary(image_field)? else {
            return Ok(None);
        };
        let filename = match &fields.filename {
            Some(field) => d.opt_string(field)?,
            None => None,
        };
        Ok(Some(ImagePayload { bytes, filename }))
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("schema", &self.schema.version)
            .finish_non_exhaustive()
    }
}

fn typed_ids<T: RecordIdType>(ids: Vec<RecordId>) -> Vec<T> {
    ids.into_iter().map(T::new).collect()
}

fn required(d: &RecordDecoder<'_>, collection: &str, field: &str) -> StoreResult<Ref> {
    d.reference(field)?.ok_or_else(|| RecordStoreError::Decode {
        collection: collection.to_string(),
        field: field.to_string(),
        reason: "required reference is unset".to_string(),
    })
}
