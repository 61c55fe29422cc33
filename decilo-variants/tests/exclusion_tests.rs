//! Exclusion computation against the in-memory record store.

use decilo_core::Exclusion;
use decilo_test_utils::assertions::assert_calls;
use decilo_test_utils::{CatalogFixture, GridTemplate};
use decilo_variants::ExclusionComputer;

fn tips(fixture: &mut CatalogFixture) -> GridTemplate {
    fixture.grid(
        "Ear Tip",
        &[("Material", &["Silicone", "Foam"]), ("Size", &["S", "M", "L"])],
    )
}

fn computer(fixture: &CatalogFixture) -> ExclusionComputer {
    ExclusionComputer::new(fixture.client(), "en_US")
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn exclusions_are_directional() {
    let mut fixture = CatalogFixture::new();
    let grid = tips(&mut fixture);
    let foam = grid.tav("Material", "Foam").unwrap();
    let large = grid.tav("Size", "L").unwrap();
    fixture.add_exclusion(foam, Some(grid.template), &[large.raw()]);

    let exclusions = computer(&fixture).get_exclusions(grid.template).await.unwrap();

    assert_eq!(
        exclusions,
        vec![Exclusion {
            declaring_value_name: "Foam".to_string(),
            excluded_value_names: names(&["L"]),
        }]
    );
    assert!(!exclusions.iter().any(|e| e.declaring_value_name == "L"));
}

#[tokio::test]
async fn exclusions_cost_three_calls() {
    let mut fixture = CatalogFixture::new();
    let grid = tips(&mut fixture);
    let foam = grid.tav("Material", "Foam").unwrap();
    let silicone = grid.tav("Material", "Silicone").unwrap();
    let small = grid.tav("Size", "S").unwrap();
    let large = grid.tav("Size", "L").unwrap();
    fixture.add_exclusion(foam, Some(grid.template), &[large.raw()]);
    fixture.add_exclusion(silicone, Some(grid.template), &[small.raw()]);
    let store = fixture.store();

    let exclusions = computer(&fixture).get_exclusions(grid.template).await.unwrap();

    assert_eq!(exclusions.len(), 2);
    assert_eq!(store.total_calls(), 3);
    assert_calls(&store, "product.template.attribute.value", "search_read", 1);
    assert_calls(&store, "product.attribute.value", "read", 1);
    assert_calls(&store, "product.template.attribute.exclusion", "read", 1);
}

#[tokio::test]
async fn raw_value_members_are_resolved() {
    let mut fixture = CatalogFixture::new();
    let grid = tips(&mut fixture);
    let foam = grid.tav("Material", "Foam").unwrap();
    let medium = grid.tav("Size", "M").unwrap();

    // A value that belongs to no TAV of this template.
    let size = fixture.add_attribute("Length");
    let long = fixture.add_value(size, "Long");
    fixture.add_exclusion(foam, Some(grid.template), &[medium.raw(), long.raw()]);
    let store = fixture.store();

    let exclusions = computer(&fixture).get_exclusions(grid.template).await.unwrap();

    assert_eq!(exclusions[0].excluded_value_names, names(&["M", "Long"]));
    // One extra batched read for the member that is not a TAV.
    assert_calls(&store, "product.attribute.value", "read", 2);
}

#[tokio::test]
async fn foreign_groups_are_ignored() {
    let mut fixture = CatalogFixture::new();
    let grid = tips(&mut fixture);
    let other = fixture.add_template("Charger");
    let foam = grid.tav("Material", "Foam").unwrap();
    let small = grid.tav("Size", "S").unwrap();
    fixture.add_exclusion(foam, Some(other), &[small.raw()]);
    fixture.add_exclusion(foam, None, &[small.raw()]);

    let exclusions = computer(&fixture).get_exclusions(grid.template).await.unwrap();
    assert!(exclusions.is_empty());
}

#[tokio::test]
async fn groups_on_one_value_are_merged() {
    let mut fixture = CatalogFixture::new();
    let grid = tips(&mut fixture);
    let foam = grid.tav("Material", "Foam").unwrap();
    let small = grid.tav("Size", "S").unwrap();
    let medium = grid.tav("Size", "M").unwrap();
    let large = grid.tav("Size", "L").unwrap();
    fixture.add_exclusion(foam, Some(grid.template), &[large.raw(), small.raw()]);
    fixture.add_exclusion(foam, Some(grid.template), &[small.raw(), medium.raw()]);

    let exclusions = computer(&fixture).get_exclusions(grid.template).await.unwrap();
    assert_eq!(exclusions.len(), 1);
    assert_eq!(exclusions[0].excluded_value_names, names(&["L", "S", "M"]));
}

#[tokio::test]
async fn unresolvable_members_are_dropped() {
    let mut fixture = CatalogFixture::new();
    let grid = tips(&mut fixture);
    let foam = grid.tav("Material", "Foam").unwrap();
    fixture.add_exclusion(foam, Some(grid.template), &[99_999]);

    let exclusions = computer(&fixture).get_exclusions(grid.template).await.unwrap();
    assert!(exclusions.is_empty());
}

#[tokio::test]
async fn template_without_groups_makes_one_call() {
    let mut fixture = CatalogFixture::new();
    let grid = tips(&mut fixture);
    let store = fixture.store();

    let exclusions = computer(&fixture).get_exclusions(grid.template).await.unwrap();
    assert!(exclusions.is_empty());
    assert_eq!(store.total_calls(), 1);
}

#[tokio::test]
async fn store_failure_propagates() {
    let mut fixture = CatalogFixture::new();
    let grid = tips(&mut fixture);
    let foam = grid.tav("Material", "Foam").unwrap();
    let small = grid.tav("Size", "S").unwrap();
    fixture.add_exclusion(foam, Some(grid.template), &[small.raw()]);
    fixture.store().fail_collection("product.template.attribute.exclusion");

    assert!(computer(&fixture).get_exclusions(grid.template).await.is_err());
}
