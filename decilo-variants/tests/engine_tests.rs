//! End-to-end engine behaviour: listings, details and the facade wiring.

use decilo_core::{
    AmbiguityPolicy, AttributeSummary, CatalogFilter, EngineConfig, ImageSize, ImageSource,
    ResolutionError, Selection, TemplateId,
};
use decilo_storage::ManualClock;
use decilo_test_utils::assertions::{assert_calls, assert_config_error, assert_resolution_error};
use decilo_test_utils::CatalogFixture;
use decilo_variants::{TemplateQuery, VariantEngine};
use std::sync::Arc;
use std::time::Duration;

fn engine(fixture: &CatalogFixture, config: EngineConfig) -> (VariantEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let engine = VariantEngine::new(
        fixture.store(),
        fixture.schema().clone(),
        config,
        clock.clone(),
    )
    .unwrap();
    (engine, clock)
}

fn summary(attribute: &str, values: &[&str]) -> AttributeSummary {
    AttributeSummary {
        attribute: attribute.to_string(),
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}

#[tokio::test]
async fn listing_is_batched_across_templates() {
    let mut fixture = CatalogFixture::new();
    fixture.grid("Ear Tip", &[("Size", &["S", "M"]), ("Material", &["Foam"])]);
    fixture.grid("Dome", &[("Size", &["S", "M", "L"])]);
    fixture.grid("Filter", &[("Pack", &["6", "12"])]);
    let store = fixture.store();
    let (engine, _clock) = engine(&fixture, EngineConfig::default());

    let products = engine.templates(&TemplateQuery::new()).await.unwrap();

    let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Dome", "Ear Tip", "Filter"]);
    assert_eq!(
        products[1].attributes,
        vec![summary("Size", &["S", "M"]), summary("Material", &["Foam"])]
    );
    // One search_read, one line read, one value read; names come with refs.
    assert_eq!(store.total_calls(), 3);
    assert_calls(&store, "product.template", "search_read", 1);
    assert_calls(&store, "product.template.attribute.line", "read", 1);
    assert_calls(&store, "product.attribute.value", "read", 1);
}

#[tokio::test]
async fn listing_pages_and_searches() {
    let mut fixture = CatalogFixture::new();
    for name in ["Alpha Tip", "Beta Tip", "Gamma Dome", "Delta Tip"] {
        fixture.add_template(name);
    }
    let (engine, _clock) = engine(&fixture, EngineConfig::default());

    let query = TemplateQuery::new().search("tip").limit(2).offset(1);
    let page = engine.templates(&query).await.unwrap();
    let names: Vec<&str> = page.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Beta Tip", "Delta Tip"]);
    assert_eq!(engine.count_templates(&query).await.unwrap(), 3);
}

#[tokio::test]
async fn listing_honours_catalog_filter() {
    let mut fixture = CatalogFixture::new();
    let tip = fixture.add_template("Ear Tip");
    let retired = fixture.add_template("Old Tip");
    let charger = fixture.add_template("Charger");
    fixture.set_category(tip, "All / Accessories / Tips");
    fixture.set_category(retired, "All / Accessories / Tips");
    fixture.set_category(charger, "All / Power");
    fixture.set_sellable(retired, false);

    let config = EngineConfig::default().with_catalog_filter(CatalogFilter {
        sellable_only: true,
        category_path: Some("accessories".to_string()),
    });
    let (engine, _clock) = engine(&fixture, config);

    let products = engine.templates(&TemplateQuery::new()).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, tip);

    // Detail views bypass the listing filter.
    let detail = engine.template_detail(retired).await.unwrap().unwrap();
    assert_eq!(detail.name, "Old Tip");
}

#[tokio::test]
async fn missing_template_detail_is_none() {
    let fixture = CatalogFixture::new();
    let (engine, _clock) = engine(&fixture, EngineConfig::default());
    assert!(engine
        .template_detail(TemplateId::from_raw(404))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn detail_carries_price_and_attributes() {
    let mut fixture = CatalogFixture::new();
    let grid = fixture.grid("Dome", &[("Size", &["S", "M"])]);
    fixture.set_list_price(grid.template, 4.5);
    let (engine, _clock) = engine(&fixture, EngineConfig::default());

    let detail = engine.template_detail(grid.template).await.unwrap().unwrap();
    assert_eq!(detail.list_price, Some(4.5));
    assert_eq!(detail.attributes, vec![summary("Size", &["S", "M"])]);
}

#[tokio::test]
async fn resolve_uses_shared_snapshot() {
    let mut fixture = CatalogFixture::new();
    let grid = fixture.grid("Dome", &[("Size", &["S", "M"]), ("Vent", &["Open", "Closed"])]);
    let store = fixture.store();
    let (engine, _clock) = engine(&fixture, EngineConfig::default());

    let selection = Selection::new().with("size", "m").with("vent", "closed");
    let resolved = engine.resolve(grid.template, &selection).await.unwrap();
    let expected = grid.variant(&[("Size", "M"), ("Vent", "Closed")]).unwrap();
    assert_eq!(resolved.variant_id, Some(expected.id));

    let calls = store.total_calls();
    let image = engine
        .variant_image(grid.template, &selection, ImageSize::Medium)
        .await
        .unwrap();
    assert_eq!(image.variant_id, Some(expected.id));
    assert_eq!(image.source, ImageSource::Template);
    // The image path reuses the snapshot; only the two image reads are new.
    assert_eq!(store.total_calls(), calls + 2);

    let stats = engine.cache_stats();
    assert_eq!(stats.snapshots.hits, 1);
    assert_eq!(stats.snapshots.entry_count, 1);
}

#[tokio::test]
async fn reject_policy_surfaces_ambiguity() {
    let mut fixture = CatalogFixture::new();
    let grid = fixture.grid("Dome", &[("Size", &["S", "M"]), ("Vent", &["Open", "Closed"])]);
    let config = EngineConfig::default().with_ambiguity_policy(AmbiguityPolicy::Reject);
    let (engine, _clock) = engine(&fixture, config);

    let result = engine
        .resolve(grid.template, &Selection::new().with("Size", "S"))
        .await;
    let candidates = vec![grid.variants[0].id, grid.variants[1].id];
    assert_resolution_error(&result, &ResolutionError::AmbiguousSelection { candidates });
}

#[tokio::test]
async fn exclusions_through_engine() {
    let mut fixture = CatalogFixture::new();
    let grid = fixture.grid("Dome", &[("Size", &["S", "M"]), ("Vent", &["Open", "Closed"])]);
    let small = grid.tav("Size", "S").unwrap();
    let closed = grid.tav("Vent", "Closed").unwrap();
    fixture.add_exclusion(small, Some(grid.template), &[closed.raw()]);
    let (engine, _clock) = engine(&fixture, EngineConfig::default());

    let exclusions = engine.exclusions(grid.template).await.unwrap();
    assert_eq!(exclusions.len(), 1);
    assert_eq!(exclusions[0].declaring_value_name, "S");
    assert_eq!(exclusions[0].excluded_value_names, vec!["Closed".to_string()]);
}

#[tokio::test]
async fn clear_caches_drops_everything() {
    let mut fixture = CatalogFixture::new();
    let grid = fixture.grid("Dome", &[("Size", &["S"])]);
    let (engine, _clock) = engine(&fixture, EngineConfig::default());

    engine
        .variant_image(grid.template, &Selection::new(), ImageSize::Small)
        .await
        .unwrap();
    assert_eq!(engine.cache_stats().snapshots.entry_count, 1);
    assert_eq!(engine.cache_stats().images.results.entry_count, 1);

    engine.clear_caches();
    let stats = engine.cache_stats();
    assert_eq!(stats.snapshots.entry_count, 0);
    assert_eq!(stats.images.results.entry_count, 0);
    assert_eq!(stats.images.template_images.entry_count, 0);
}

#[tokio::test]
async fn resolve_in_other_locale_builds_its_own_snapshot() {
    let mut fixture = CatalogFixture::new();
    let grid = fixture.grid("Dome", &[("Size", &["S"])]);
    let (engine, _clock) = engine(&fixture, EngineConfig::default());

    let selection = Selection::new().with("Size", "S");
    engine.resolve(grid.template, &selection).await.unwrap();
    engine
        .resolve_in(grid.template, &selection, "it_IT")
        .await
        .unwrap();
    assert_eq!(engine.cache_stats().snapshots.entry_count, 2);
}

#[test]
fn invalid_config_is_rejected() {
    let fixture = CatalogFixture::new();
    let config = EngineConfig::default().with_snapshot_ttl(Duration::ZERO);
    let result = VariantEngine::with_system_clock(fixture.store(), fixture.schema().clone(), config);
    assert_config_error(&result);
}
