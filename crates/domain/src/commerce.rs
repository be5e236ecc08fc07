//! Orders, product comments, and basket lines.
//!
//! Comments and basket lines are the two audit-bearing leaf associations
//! that cascade when their owning aggregate is deleted; orders restrict
//! deletion of their user and product.

use crate::audit::{by_created, by_last_modified, AuditStamp, Auditable};
use crate::entity::Entity;
use crate::identifiers::{BasketItemId, CommentId, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// A placed order linking a user to a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier, assigned at creation.
    pub id: OrderId,
    /// Purchasing user.
    pub user_id: UserId,
    /// Ordered product.
    pub product_id: ProductId,
    /// Audit metadata, stamped by the session.
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl Order {
    /// Create an order with a fresh identifier.
    pub fn new(user_id: UserId, product_id: ProductId) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            product_id,
            audit: AuditStamp::default(),
        }
    }
}

impl Auditable for Order {
    fn audit(&self) -> &AuditStamp {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}

impl Entity for Order {
    const TABLE: &'static str = "orders";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn compare_by(field: &str, a: &Self, b: &Self) -> Ordering {
        match field.to_ascii_lowercase().as_str() {
            "last_modified" | "lastmodified" => by_last_modified(a, b),
            _ => by_created(a, b),
        }
    }
}

/// A user's comment on a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier, assigned at creation.
    pub id: CommentId,
    /// Commenting user.
    pub user_id: UserId,
    /// Commented product.
    pub product_id: ProductId,
    /// Comment body.
    pub content: Option<String>,
    /// Audit metadata, stamped by the session.
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl Comment {
    /// Create a comment with a fresh identifier.
    pub fn new(user_id: UserId, product_id: ProductId, content: impl Into<String>) -> Self {
        Self {
            id: CommentId::new(),
            user_id,
            product_id,
            content: Some(content.into()),
            audit: AuditStamp::default(),
        }
    }
}

impl Auditable for Comment {
    fn audit(&self) -> &AuditStamp {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}

impl Entity for Comment {
    const TABLE: &'static str = "comments";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn compare_by(field: &str, a: &Self, b: &Self) -> Ordering {
        match field.to_ascii_lowercase().as_str() {
            "last_modified" | "lastmodified" => by_last_modified(a, b),
            _ => by_created(a, b),
        }
    }
}

/// A line in a user's shopping basket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketItem {
    /// Unique identifier, assigned at creation.
    pub id: BasketItemId,
    /// Owning user.
    pub user_id: UserId,
    /// Product in the basket.
    pub product_id: ProductId,
    /// Quantity requested.
    pub quantity: i32,
    /// Audit metadata, stamped by the session.
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl BasketItem {
    /// Create a basket line with a fresh identifier.
    pub fn new(user_id: UserId, product_id: ProductId, quantity: i32) -> Self {
        Self {
            id: BasketItemId::new(),
            user_id,
            product_id,
            quantity,
            audit: AuditStamp::default(),
        }
    }
}

impl Auditable for BasketItem {
    fn audit(&self) -> &AuditStamp {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}

impl Entity for BasketItem {
    const TABLE: &'static str = "basket_items";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn compare_by(field: &str, a: &Self, b: &Self) -> Ordering {
        match field.to_ascii_lowercase().as_str() {
            "quantity" => a.quantity.cmp(&b.quantity),
            "last_modified" | "lastmodified" => by_last_modified(a, b),
            _ => by_created(a, b),
        }
    }
}
