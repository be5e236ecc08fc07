//! Catalog entities: categories, subcategories, and products.
//!
//! Navigation fields (`subcategories`, `products`, `comments`) are never
//! persisted; they are populated only when a query requests eager loading
//! through an include path.

use crate::audit::{by_created, by_last_modified, AuditStamp, Auditable};
use crate::commerce::Comment;
use crate::entity::Entity;
use crate::identifiers::{CategoryId, ProductId, SubcategoryId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// A top-level product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier, assigned at creation.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Audit metadata, stamped by the session.
    #[serde(flatten)]
    pub audit: AuditStamp,
    /// Eagerly-loaded subcategories (include path `"subcategories"`).
    #[serde(default, skip_serializing)]
    pub subcategories: Vec<Subcategory>,
}

impl Category {
    /// Create a category with a fresh identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            audit: AuditStamp::default(),
            subcategories: Vec::new(),
        }
    }
}

impl Auditable for Category {
    fn audit(&self) -> &AuditStamp {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}

impl Entity for Category {
    const TABLE: &'static str = "categories";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn compare_by(field: &str, a: &Self, b: &Self) -> Ordering {
        match field.to_ascii_lowercase().as_str() {
            "name" => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            "last_modified" | "lastmodified" => by_last_modified(a, b),
            _ => by_created(a, b),
        }
    }
}

/// A subcategory under a [`Category`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcategory {
    /// Unique identifier, assigned at creation.
    pub id: SubcategoryId,
    /// Display name.
    pub name: String,
    /// Owning category.
    pub category_id: CategoryId,
    /// Audit metadata, stamped by the session.
    #[serde(flatten)]
    pub audit: AuditStamp,
    /// Eagerly-loaded products (include path `"products"`).
    #[serde(default, skip_serializing)]
    pub products: Vec<Product>,
}

impl Subcategory {
    /// Create a subcategory with a fresh identifier.
    pub fn new(name: impl Into<String>, category_id: CategoryId) -> Self {
        Self {
            id: SubcategoryId::new(),
            name: name.into(),
            category_id,
            audit: AuditStamp::default(),
            products: Vec::new(),
        }
    }
}

impl Auditable for Subcategory {
    fn audit(&self) -> &AuditStamp {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}

impl Entity for Subcategory {
    const TABLE: &'static str = "subcategories";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn compare_by(field: &str, a: &Self, b: &Self) -> Ordering {
        match field.to_ascii_lowercase().as_str() {
            "name" => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            "last_modified" | "lastmodified" => by_last_modified(a, b),
            _ => by_created(a, b),
        }
    }
}

/// A sellable product under a [`Subcategory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier, assigned at creation.
    pub id: ProductId,
    /// Display name.
    pub name: Option<String>,
    /// Brand name.
    pub brand: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Price per unit.
    pub unit_price: Option<f64>,
    /// Units in stock.
    pub unit_quantity: Option<i32>,
    /// Volume in milliliters.
    pub volume: Option<i32>,
    /// Scent family.
    pub scent: Option<String>,
    /// Edition label.
    pub edition: Option<String>,
    /// Owning subcategory.
    pub subcategory_id: SubcategoryId,
    /// Raw image bytes.
    pub image: Option<Vec<u8>>,
    /// MIME type of the image.
    pub image_type: Option<String>,
    /// Audit metadata, stamped by the session.
    #[serde(flatten)]
    pub audit: AuditStamp,
    /// Eagerly-loaded comments (include path `"comments"`).
    #[serde(default, skip_serializing)]
    pub comments: Vec<Comment>,
}

impl Product {
    /// Create a named product with a fresh identifier.
    pub fn new(name: impl Into<String>, subcategory_id: SubcategoryId) -> Self {
        Self {
            id: ProductId::new(),
            name: Some(name.into()),
            brand: None,
            description: None,
            unit_price: None,
            unit_quantity: None,
            volume: None,
            scent: None,
            edition: None,
            subcategory_id,
            image: None,
            image_type: None,
            audit: AuditStamp::default(),
            comments: Vec::new(),
        }
    }
}

impl Auditable for Product {
    fn audit(&self) -> &AuditStamp {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}

impl Entity for Product {
    const TABLE: &'static str = "products";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn compare_by(field: &str, a: &Self, b: &Self) -> Ordering {
        match field.to_ascii_lowercase().as_str() {
            "name" => cmp_opt_str(&a.name, &b.name),
            "brand" => cmp_opt_str(&a.brand, &b.brand),
            "unit_price" | "unitprice" => a
                .unit_price
                .partial_cmp(&b.unit_price)
                .unwrap_or(Ordering::Equal),
            "last_modified" | "lastmodified" => by_last_modified(a, b),
            _ => by_created(a, b),
        }
    }
}

fn cmp_opt_str(a: &Option<String>, b: &Option<String>) -> Ordering {
    let a = a.as_deref().map(str::to_lowercase);
    let b = b.as_deref().map(str::to_lowercase);
    a.cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_fields_not_serialized() {
        let mut category = Category::new("Fragrances");
        category
            .subcategories
            .push(Subcategory::new("Eau de Parfum", category.id));

        let value = serde_json::to_value(&category).unwrap();
        assert!(value.get("subcategories").is_none());
        assert_eq!(value["name"], "Fragrances");
        assert!(value["created"].is_null());
    }

    #[test]
    fn test_navigation_fields_deserialized_when_present() {
        let category = Category::new("Fragrances");
        let sub = Subcategory::new("Eau de Parfum", category.id);

        let mut value = serde_json::to_value(&category).unwrap();
        value["subcategories"] = serde_json::json!([serde_json::to_value(&sub).unwrap()]);

        let hydrated: Category = serde_json::from_value(value).unwrap();
        assert_eq!(hydrated.subcategories.len(), 1);
        assert_eq!(hydrated.subcategories[0].name, "Eau de Parfum");
    }

    #[test]
    fn test_sort_key_allow_list_falls_back_to_created() {
        let mut a = Category::new("B");
        let mut b = Category::new("A");
        a.audit.created = Some(chrono::Utc::now());
        b.audit.created = Some(chrono::Utc::now() + chrono::Duration::seconds(1));

        // Known key sorts by name; unknown key falls back to created.
        assert_eq!(Category::compare_by("name", &a, &b), Ordering::Greater);
        assert_eq!(Category::compare_by("nonsense", &a, &b), Ordering::Less);
    }

    #[test]
    fn test_audit_stamp_flattened_into_entity_json() {
        let product = Product::new("Oud Royal", SubcategoryId::new());
        let value = serde_json::to_value(&product).unwrap();
        assert!(value.get("created").is_some());
        assert!(value.get("audit").is_none());
    }
}
