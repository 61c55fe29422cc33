//! Startup resolution of optional schema fields.
//!
//! Some backends carry filename companions for image fields and some do not.
//! Whether they exist is checked once, before the engine is built, and the
//! answer is baked into the [`CatalogSchema`]. Requests never probe.

use decilo_core::{CatalogSchema, ModelFieldsRegistry};

use crate::record_store::{Domain, RecordStore, StoreResult};

/// Does `collection` have a field called `field`?
pub async fn field_exists(
    store: &dyn RecordStore,
    registry: &ModelFieldsRegistry,
    collection: &str,
    field: &str,
) -> StoreResult<bool> {
    let domain = Domain::new()
        .where_eq(registry.model.as_str(), collection)
        .where_eq(registry.name.as_str(), field);
    Ok(store.search_count(&registry.collection, &domain).await? > 0)
}

/// Clear every optional field the backend does not have.
pub async fn probe_optional_fields(
    store: &dyn RecordStore,
    mut schema: CatalogSchema,
) -> StoreResult<CatalogSchema> {
    let registry = schema.model_fields.clone();

    if let Some(field) = schema.templates.images.filename.clone() {
        let exists = field_exists(store, &registry, &schema.templates.collection, &field).await?;
        if !exists {
            tracing::info!(
                collection = %schema.templates.collection,
                field = %field,
                "Optional image filename field not present, disabling"
            );
            schema.templates.images.filename = None;
        }
    }

    if let Some(field) = schema.variants.images.filename.clone() {
        let exists = field_exists(store, &registry, &schema.variants.collection, &field).await?;
        if !exists {
            tracing::info!(
                collection = %schema.variants.collection,
                field = %field,
                "Optional image filename field not present, disabling"
            );
            schema.variants.images.filename = None;
        }
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::InMemoryRecordStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_companions_are_cleared() {
        let store = InMemoryRecordStore::new();
        store.insert(
            "ir.model.fields",
            json!({"model": "product.template", "name": "x_image_filename"}),
        );

        let schema = CatalogSchema::v17()
            .with_template_image_filename("x_image_filename")
            .with_variant_image_filename("x_variant_image_filename");
        let probed = probe_optional_fields(&store, schema).await.unwrap();

        assert_eq!(
            probed.templates.images.filename.as_deref(),
            Some("x_image_filename")
        );
        assert_eq!(probed.variants.images.filename, None);
        assert_eq!(store.calls("ir.model.fields", "search_count"), 2);
    }

    #[tokio::test]
    async fn test_nothing_to_probe() {
        let store = InMemoryRecordStore::new();
        let probed = probe_optional_fields(&store, CatalogSchema::v17())
            .await
            .unwrap();
        assert_eq!(probed, CatalogSchema::v17());
        assert_eq!(store.total_calls(), 0);
    }
}
