//! Storefront Domain Types
//!
//! This crate provides the entity model shared by the storefront services.
//! It defines strongly-typed identifiers, the audit metadata model, the
//! `Entity` capability trait consumed by the persistence layer, the concrete
//! catalog/auth/basket entities, and the declarative relationship registry
//! (restrict/cascade delete policies).
//!
//! ## Architecture
//!
//! - **identifiers**: UUID-based identifiers for all entities
//! - **audit**: `AuditStamp` value and the `Auditable` capability trait
//! - **entity**: the `Entity` trait binding a type to its storage table,
//!   audit capability, identifier, and sort-key allow-list
//! - **catalog**: categories, subcategories, and products
//! - **users**: user accounts and roles
//! - **commerce**: orders, comments, and basket lines
//! - **relations**: parent/child associations with delete policies
//!
//! ## Usage
//!
//! ```rust
//! use storefront_domain::{Category, CategoryId, Entity};
//!
//! let category = Category::new("Fragrances");
//! assert_eq!(Category::TABLE, "categories");
//! assert!(!category.id.is_nil());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod catalog;
pub mod commerce;
pub mod entity;
pub mod identifiers;
pub mod relations;
pub mod users;

pub use audit::{AuditStamp, Auditable};
pub use catalog::{Category, Product, Subcategory};
pub use commerce::{BasketItem, Comment, Order};
pub use entity::Entity;
pub use identifiers::{
    BasketItemId, CategoryId, CommentId, OrderId, ProductId, SubcategoryId, UserId,
};
pub use relations::{storefront_relations, DeletePolicy, Relation};
pub use users::{Role, User};
