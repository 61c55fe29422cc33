//! Variant image resolution, template fallback and the three cache tiers.

use decilo_core::{
    AmbiguityPolicy, CatalogSchema, ImageSize, ImageSource, ResolutionError, Selection,
};
use decilo_storage::ManualClock;
use decilo_test_utils::assertions::{assert_calls, assert_resolution_error};
use decilo_test_utils::{CatalogFixture, GridTemplate};
use decilo_variants::{ImageResolver, TemplateMetadataCache};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(600);

fn hearing_aid(fixture: &mut CatalogFixture) -> GridTemplate {
    fixture.grid(
        "Hearing Aid",
        &[("Side", &["Left", "Right"]), ("Color", &["Beige", "Black"])],
    )
}

fn resolver(fixture: &CatalogFixture) -> (ImageResolver, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let metadata = Arc::new(TemplateMetadataCache::new(
        fixture.client(),
        TTL,
        clock.clone(),
    ));
    let resolver = ImageResolver::new(
        fixture.client(),
        metadata,
        "en_US",
        AmbiguityPolicy::FirstMatch,
        TTL,
        clock.clone(),
    );
    (resolver, clock)
}

fn left_black() -> Selection {
    Selection::new().with("Side", "Left").with("Color", "Black")
}

#[tokio::test]
async fn variant_image_is_preferred() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    let variant = grid.variant(&[("Side", "Left"), ("Color", "Black")]).unwrap().id;
    fixture.set_variant_image(variant, ImageSize::Medium, b"left-black");
    fixture.set_template_image(grid.template, ImageSize::Medium, b"template");
    let (resolver, _clock) = resolver(&fixture);

    let image = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Medium)
        .await
        .unwrap();

    assert_eq!(image.variant_id, Some(variant));
    assert_eq!(image.source, ImageSource::Variant);
    assert_eq!(image.image.as_ref().unwrap().bytes, b"left-black".to_vec());
}

#[tokio::test]
async fn template_image_fills_in() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    fixture.set_template_image(grid.template, ImageSize::Medium, b"template");
    let (resolver, _clock) = resolver(&fixture);

    let image = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Medium)
        .await
        .unwrap();

    assert!(image.variant_id.is_some());
    assert_eq!(image.source, ImageSource::Template);
    assert_eq!(image.image.as_ref().unwrap().bytes, b"template".to_vec());
}

#[tokio::test]
async fn sizes_are_independent() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    let variant = grid.variant(&[("Side", "Left"), ("Color", "Black")]).unwrap().id;
    fixture.set_variant_image(variant, ImageSize::Large, b"large");
    fixture.set_template_image(grid.template, ImageSize::Thumbnail, b"thumb");
    let (resolver, _clock) = resolver(&fixture);

    let large = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Large)
        .await
        .unwrap();
    let thumb = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Thumbnail)
        .await
        .unwrap();

    assert_eq!(large.source, ImageSource::Variant);
    assert_eq!(thumb.source, ImageSource::Template);
    assert_eq!(thumb.image.as_ref().unwrap().bytes, b"thumb".to_vec());
}

#[tokio::test]
async fn no_image_anywhere() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    let (resolver, _clock) = resolver(&fixture);

    let image = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Small)
        .await
        .unwrap();
    assert_eq!(image.source, ImageSource::Template);
    assert!(image.image.is_none());
}

#[tokio::test]
async fn empty_selection_without_default_uses_template() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    fixture.set_template_image(grid.template, ImageSize::Medium, b"template");
    let (resolver, _clock) = resolver(&fixture);

    let image = resolver
        .get_variant_image(grid.template, &Selection::new(), ImageSize::Medium)
        .await
        .unwrap();
    assert_eq!(image.variant_id, None);
    assert_eq!(image.source, ImageSource::Template);
    assert!(image.image.is_some());
}

#[tokio::test]
async fn respelled_selection_hits_result_tier() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    let store = fixture.store();
    let (resolver, _clock) = resolver(&fixture);

    let first = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Medium)
        .await
        .unwrap();
    let calls = store.total_calls();

    let respelled = Selection::new().with("COLOR ", "black").with(" side", "LEFT");
    let second = resolver
        .get_variant_image(grid.template, &respelled, ImageSize::Medium)
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.total_calls(), calls);
    assert_eq!(resolver.stats().results.hits, 1);
}

#[tokio::test]
async fn selections_sharing_a_variant_share_its_image() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    let variant = grid.variant(&[("Side", "Left"), ("Color", "Beige")]).unwrap().id;
    let store = fixture.store();
    let (resolver, _clock) = resolver(&fixture);

    // Both resolve to the first Left variant; neither has an image.
    let full = Selection::new().with("Side", "Left").with("Color", "Beige");
    let partial = Selection::new().with("Side", "Left");
    let a = resolver
        .get_variant_image(grid.template, &full, ImageSize::Medium)
        .await
        .unwrap();
    let b = resolver
        .get_variant_image(grid.template, &partial, ImageSize::Medium)
        .await
        .unwrap();

    assert_eq!(a.variant_id, Some(variant));
    assert_eq!(b.variant_id, Some(variant));
    assert_calls(&store, "product.product", "read", 1);

    let stats = resolver.stats();
    assert_eq!(stats.results.entry_count, 2);
    assert_eq!(stats.variant_images.hits, 1);
    assert_eq!(stats.variant_images.entry_count, 1);
    assert_eq!(stats.template_images.hits, 1);
}

#[tokio::test]
async fn resolution_errors_are_not_cached() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    let (resolver, _clock) = resolver(&fixture);
    let selection = Selection::new().with("Side", "Middle");

    for _ in 0..2 {
        let result = resolver
            .get_variant_image(grid.template, &selection, ImageSize::Medium)
            .await;
        assert_resolution_error(
            &result,
            &ResolutionError::OptionNotAvailable {
                attribute: "Side".to_string(),
                value: "Middle".to_string(),
            },
        );
    }

    let stats = resolver.stats();
    assert_eq!(stats.results.entry_count, 0);
    assert_eq!(stats.results.misses, 2);
}

#[tokio::test]
async fn expired_results_see_new_images() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    let variant = grid.variant(&[("Side", "Left"), ("Color", "Black")]).unwrap().id;
    let (resolver, clock) = resolver(&fixture);

    let before = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Medium)
        .await
        .unwrap();
    assert!(before.image.is_none());

    fixture.set_variant_image(variant, ImageSize::Medium, b"new");
    let cached = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Medium)
        .await
        .unwrap();
    assert!(cached.image.is_none());

    clock.advance(TTL + Duration::from_secs(1));
    let after = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Medium)
        .await
        .unwrap();
    assert_eq!(after.source, ImageSource::Variant);
}

#[tokio::test]
async fn filename_companion_is_returned() {
    let schema = CatalogSchema::v17().with_variant_image_filename("x_image_filename");
    let mut fixture = CatalogFixture::with_schema(schema);
    let grid = hearing_aid(&mut fixture);
    let variant = grid.variant(&[("Side", "Left"), ("Color", "Black")]).unwrap().id;
    fixture.set_variant_image(variant, ImageSize::Medium, b"png");
    fixture.set_variant_field(variant, "x_image_filename", json!("left-black.png"));
    let (resolver, _clock) = resolver(&fixture);

    let image = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Medium)
        .await
        .unwrap();
    assert_eq!(
        image.image.as_ref().unwrap().filename.as_deref(),
        Some("left-black.png")
    );
}

#[tokio::test]
async fn store_failure_is_not_cached() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    let store = fixture.store();
    let (resolver, _clock) = resolver(&fixture);

    store.fail_collection("product.template");
    assert!(resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Medium)
        .await
        .is_err());

    store.heal_collection("product.template");
    let image = resolver
        .get_variant_image(grid.template, &left_black(), ImageSize::Medium)
        .await
        .unwrap();
    assert_eq!(image.source, ImageSource::Template);
}

#[tokio::test]
async fn delimiters_inside_names_do_not_merge_result_entries() {
    let mut fixture = CatalogFixture::new();
    let grid = fixture.grid("Adapter", &[("A", &["b;c=d", "b"]), ("C", &["d", "e"])]);
    let joined_variant = grid.variant(&[("A", "b;c=d"), ("C", "d")]).unwrap().id;
    let split_variant = grid.variant(&[("A", "b"), ("C", "d")]).unwrap().id;
    fixture.set_variant_image(joined_variant, ImageSize::Medium, b"joined");
    fixture.set_variant_image(split_variant, ImageSize::Medium, b"split");
    let (resolver, _clock) = resolver(&fixture);

    let joined = resolver
        .get_variant_image(grid.template, &Selection::new().with("A", "b;c=d"), ImageSize::Medium)
        .await
        .unwrap();
    let split = resolver
        .get_variant_image(
            grid.template,
            &Selection::new().with("A", "b").with("C", "d"),
            ImageSize::Medium,
        )
        .await
        .unwrap();

    assert_eq!(joined.variant_id, Some(joined_variant));
    assert_eq!(joined.image.as_ref().unwrap().bytes, b"joined".to_vec());
    assert_eq!(split.variant_id, Some(split_variant));
    assert_eq!(split.image.as_ref().unwrap().bytes, b"split".to_vec());
    assert_eq!(resolver.stats().results.entry_count, 2);
}

#[tokio::test]
async fn concurrent_lookups_agree() {
    let mut fixture = CatalogFixture::new();
    let grid = hearing_aid(&mut fixture);
    fixture.set_template_image(grid.template, ImageSize::Medium, b"template");
    let (resolver, _clock) = resolver(&fixture);
    let selection = left_black();

    let (a, b) = tokio::join!(
        resolver.get_variant_image(grid.template, &selection, ImageSize::Medium),
        resolver.get_variant_image(grid.template, &selection, ImageSize::Medium),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(*a, *b);
    assert_eq!(a.source, ImageSource::Template);
    let stats = resolver.stats();
    assert_eq!(stats.results.entry_count, 1);
    assert_eq!(stats.variant_images.entry_count, 1);
    assert_eq!(stats.template_images.entry_count, 1);
}
