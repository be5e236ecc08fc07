//! Fixture functions for persistence tests.

use std::sync::Arc;

use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;

use storefront_domain::{
    storefront_relations, BasketItem, Category, Comment, Order, Product, ProductId, Subcategory,
    User, UserId,
};
use storefront_persistence::{AuditIdentity, MemoryStore, UnitOfWork};

use crate::builders::ProductBuilder;

/// Identity used by test units of work.
pub const TEST_IDENTITY: &str = "storefront";

/// An in-memory store with the full relationship registry, plus a unit of
/// work over it. The store is returned so tests can open further units of
/// work against the same data.
pub fn memory_unit_of_work() -> (Arc<MemoryStore>, UnitOfWork) {
    let store = Arc::new(MemoryStore::new(storefront_relations()));
    let uow = unit_of_work_over(store.clone());
    (store, uow)
}

/// A fresh unit of work over an existing store.
pub fn unit_of_work_over(store: Arc<MemoryStore>) -> UnitOfWork {
    UnitOfWork::new(
        store,
        storefront_relations(),
        AuditIdentity::system(TEST_IDENTITY),
    )
}

/// A user with randomized name, username, and email.
pub fn create_test_user() -> User {
    let mut user = User::new(
        Username().fake::<String>(),
        SafeEmail().fake::<String>(),
        "hash",
        "salt",
    );
    user.first_name = FirstName().fake();
    user.last_name = LastName().fake();
    user
}

/// A category named "Fragrances".
pub fn create_test_category() -> Category {
    Category::new("Fragrances")
}

/// A subcategory under `category`.
pub fn create_test_subcategory(category: &Category) -> Subcategory {
    Subcategory::new("Eau de Parfum", category.id)
}

/// A product under `subcategory`.
pub fn create_test_product(subcategory: &Subcategory) -> Product {
    ProductBuilder::new()
        .with_name("Oud Royal")
        .with_brand("Maison Test")
        .in_subcategory(subcategory.id)
        .build()
}

/// A comment by `user` on `product`.
pub fn create_test_comment(user_id: UserId, product_id: ProductId) -> Comment {
    Comment::new(user_id, product_id, "Lovely scent, lasts all day.")
}

/// A basket line for `user` holding `product`.
pub fn create_test_basket_item(user_id: UserId, product_id: ProductId) -> BasketItem {
    BasketItem::new(user_id, product_id, 1)
}

/// An order by `user` for `product`.
pub fn create_test_order(user_id: UserId, product_id: ProductId) -> Order {
    Order::new(user_id, product_id)
}

/// Stage a small catalog (one category, one subcategory, two products)
/// into `uow` without committing. Returns the staged entities.
pub fn stage_catalog(uow: &UnitOfWork) -> (Category, Subcategory, Vec<Product>) {
    let category = create_test_category();
    let subcategory = create_test_subcategory(&category);
    let products = vec![
        ProductBuilder::new()
            .with_name("Oud Royal")
            .with_unit_price(120.0)
            .in_subcategory(subcategory.id)
            .build(),
        ProductBuilder::new()
            .with_name("Citrus Veil")
            .with_unit_price(45.0)
            .in_subcategory(subcategory.id)
            .build(),
    ];

    uow.repository::<Category>()
        .insert(&category)
        .expect("stage category");
    uow.repository::<Subcategory>()
        .insert(&subcategory)
        .expect("stage subcategory");
    uow.repository::<Product>()
        .insert_range(&products)
        .expect("stage products");

    (category, subcategory, products)
}
