//! Repository query and CRUD behavior over the in-memory store.

use storefront_common::pagination::SortParams;
use storefront_domain::{Category, Comment, Product, Subcategory};
use storefront_persistence::{Error, Query};
use storefront_testing::{
    create_test_user, memory_unit_of_work, stage_catalog, unit_of_work_over, ProductBuilder,
};
use uuid::Uuid;

#[tokio::test]
async fn test_insert_then_get_by_id_round_trips() {
    let (_store, uow) = memory_unit_of_work();
    let repo = uow.repository::<Category>();

    let category = Category::new("Fragrances");
    repo.insert(&category).unwrap();
    uow.save_changes().await.unwrap();

    let loaded = repo.get_by_id(category.id.as_uuid()).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Fragrances");
}

#[tokio::test]
async fn test_staged_insert_is_visible_in_same_session_before_commit() {
    let (store, uow) = memory_unit_of_work();
    let (category, _, _) = stage_catalog(&uow);

    // A second repository handle from the same unit of work shares the
    // session, so the staged insert reads back before commit.
    let other_handle = uow.repository::<Category>();
    let seen = other_handle
        .get_by_id(category.id.as_uuid())
        .await
        .unwrap();
    assert!(seen.is_some());

    // Nothing is durable yet: a separate unit of work sees an empty store.
    let outsider = unit_of_work_over(store);
    let unseen = outsider
        .repository::<Category>()
        .get_by_id(category.id.as_uuid())
        .await
        .unwrap();
    assert!(unseen.is_none());
}

#[tokio::test]
async fn test_where_if_composes_conditional_filters() {
    let (_store, uow) = memory_unit_of_work();
    stage_catalog(&uow);
    uow.save_changes().await.unwrap();

    let repo = uow.repository::<Product>();
    let name_filter: Option<String> = Some("Oud".to_string());
    let max_price: Option<f64> = None;

    let query = Query::<Product>::new()
        .where_if(name_filter.is_some(), move |p| {
            p.name
                .as_deref()
                .map(|n| n.contains(name_filter.as_deref().unwrap_or_default()))
                .unwrap_or(false)
        })
        .where_if(max_price.is_some(), move |p| {
            p.unit_price.unwrap_or(0.0) <= max_price.unwrap_or(f64::MAX)
        });

    let matched = repo.fetch(&query).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name.as_deref(), Some("Oud Royal"));
}

#[tokio::test]
async fn test_query_where_seeds_the_filter_chain() {
    let (_store, uow) = memory_unit_of_work();
    stage_catalog(&uow);
    uow.save_changes().await.unwrap();

    let repo = uow.repository::<Product>();
    let max_price: Option<f64> = Some(50.0);
    let query = repo.query_where(|chain| {
        chain.where_if(max_price.is_some(), move |p: &Product| {
            p.unit_price.unwrap_or(f64::MAX) <= max_price.unwrap_or(f64::MAX)
        })
    });

    assert!(repo.exists_where(&query).await.unwrap());
    let matched = repo.fetch(&query).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name.as_deref(), Some("Citrus Veil"));
}

#[tokio::test]
async fn test_fetch_page_counts_before_paginating() {
    let (_store, uow) = memory_unit_of_work();
    let (_, subcategory, _) = stage_catalog(&uow);
    let repo = uow.repository::<Product>();
    for i in 0..5 {
        let product = ProductBuilder::new()
            .with_name(format!("Sample {i}"))
            .with_unit_price(10.0 + i as f64)
            .in_subcategory(subcategory.id)
            .build();
        repo.insert(&product).unwrap();
    }
    uow.save_changes().await.unwrap();

    // 7 products total, 5 match the filter; page 2 of size 2 holds 2 rows
    // but the total still reports all 5 matches.
    let query = Query::<Product>::new()
        .filter(|p: &Product| p.name.as_deref().unwrap_or_default().starts_with("Sample"))
        .sort(SortParams::asc("name"))
        .skip(2)
        .take(2);
    let page = repo.fetch_page(&query).await.unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].name.as_deref(), Some("Sample 2"));
    assert!(page.has_more());
}

#[tokio::test]
async fn test_sort_key_resolves_through_allow_list() {
    let (_store, uow) = memory_unit_of_work();
    stage_catalog(&uow);
    uow.save_changes().await.unwrap();

    let repo = uow.repository::<Product>();
    let descending = repo
        .fetch(&Query::new().sort(SortParams::desc("unit_price")))
        .await
        .unwrap();
    assert_eq!(descending[0].name.as_deref(), Some("Oud Royal"));
    assert_eq!(descending[1].name.as_deref(), Some("Citrus Veil"));
}

#[tokio::test]
async fn test_include_hydrates_nested_relation_paths() {
    let (_store, uow) = memory_unit_of_work();
    stage_catalog(&uow);
    uow.save_changes().await.unwrap();

    let categories = uow
        .repository::<Category>()
        .fetch(&Query::new().include("subcategories.products"))
        .await
        .unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].subcategories.len(), 1);
    assert_eq!(categories[0].subcategories[0].products.len(), 2);

    // Without an include the navigation fields stay empty.
    let bare = uow
        .repository::<Category>()
        .fetch(&Query::new())
        .await
        .unwrap();
    assert!(bare[0].subcategories.is_empty());
}

#[tokio::test]
async fn test_include_sees_staged_children_before_commit() {
    let (_store, uow) = memory_unit_of_work();
    let (_, subcategory, _) = stage_catalog(&uow);
    uow.save_changes().await.unwrap();

    // Stage one more product without committing; the include overlay must
    // show it alongside the two durable ones.
    let extra = ProductBuilder::new()
        .with_name("Amber Night")
        .in_subcategory(subcategory.id)
        .build();
    uow.repository::<Product>().insert(&extra).unwrap();

    let subcategories = uow
        .repository::<Subcategory>()
        .fetch(&Query::new().include("products"))
        .await
        .unwrap();
    assert_eq!(subcategories[0].products.len(), 3);
}

#[tokio::test]
async fn test_unknown_include_path_is_a_precondition_error() {
    let (_store, uow) = memory_unit_of_work();
    stage_catalog(&uow);
    uow.save_changes().await.unwrap();

    let err = uow
        .repository::<Category>()
        .fetch(&Query::new().include("nonexistent"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Precondition(_)));
}

#[tokio::test]
async fn test_exists_does_not_track_the_entity() {
    let (_store, uow) = memory_unit_of_work();
    let (category, _, _) = stage_catalog(&uow);
    uow.save_changes().await.unwrap();

    let outsider_id = Uuid::now_v7();
    let repo = uow.repository::<Category>();
    assert!(repo.exists(category.id.as_uuid()).await.unwrap());
    assert!(!repo.exists(outsider_id).await.unwrap());
}

#[tokio::test]
async fn test_delete_by_id_of_missing_entity_is_not_found() {
    let (_store, uow) = memory_unit_of_work();
    let repo = uow.repository::<Comment>();
    let err = repo.delete_by_id(Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "comments", .. }));
}

#[tokio::test]
async fn test_delete_of_staged_insert_unstages_it() {
    let (store, uow) = memory_unit_of_work();
    let user = create_test_user();
    let repo = uow.repository::<storefront_domain::User>();
    repo.insert(&user).unwrap();
    repo.delete(&user).unwrap();
    uow.save_changes().await.unwrap();

    assert_eq!(store.table_len("users"), 0);
}

#[tokio::test]
async fn test_blocking_variants_mirror_async_results() {
    let (_store, uow) = memory_unit_of_work();
    let (category, _, _) = stage_catalog(&uow);

    // Spawn onto a blocking-friendly thread: the blocking forms drive the
    // future on the current thread.
    let handle = uow.repository::<Category>();
    let id = category.id.as_uuid();
    let loaded = tokio::task::spawn_blocking(move || handle.get_by_id_blocking(id))
        .await
        .unwrap()
        .unwrap();
    assert!(loaded.is_some());
}
