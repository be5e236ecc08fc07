//! Fluent builders for constructing test entities.
//!
//! Builders cover the entities with enough fields to make literal
//! construction noisy; the simpler entities are served by the fixture
//! functions directly.

use storefront_domain::{
    AuditStamp, Product, ProductId, Role, SubcategoryId, User, UserId,
};

/// Builder for [`Product`] test instances.
#[derive(Clone)]
pub struct ProductBuilder {
    id: ProductId,
    name: Option<String>,
    brand: Option<String>,
    description: Option<String>,
    unit_price: Option<f64>,
    unit_quantity: Option<i32>,
    volume: Option<i32>,
    scent: Option<String>,
    edition: Option<String>,
    subcategory_id: SubcategoryId,
}

impl ProductBuilder {
    pub fn new() -> Self {
        Self {
            id: ProductId::new(),
            name: Some("Test Product".to_string()),
            brand: Some("Test Brand".to_string()),
            description: None,
            unit_price: Some(49.99),
            unit_quantity: Some(10),
            volume: Some(100),
            scent: None,
            edition: None,
            subcategory_id: SubcategoryId::new(),
        }
    }

    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_unit_price(mut self, price: f64) -> Self {
        self.unit_price = Some(price);
        self
    }

    pub fn with_unit_quantity(mut self, quantity: i32) -> Self {
        self.unit_quantity = Some(quantity);
        self
    }

    pub fn with_volume(mut self, volume: i32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_scent(mut self, scent: impl Into<String>) -> Self {
        self.scent = Some(scent.into());
        self
    }

    pub fn with_edition(mut self, edition: impl Into<String>) -> Self {
        self.edition = Some(edition.into());
        self
    }

    pub fn in_subcategory(mut self, subcategory_id: SubcategoryId) -> Self {
        self.subcategory_id = subcategory_id;
        self
    }

    pub fn build(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            brand: self.brand,
            description: self.description,
            unit_price: self.unit_price,
            unit_quantity: self.unit_quantity,
            volume: self.volume,
            scent: self.scent,
            edition: self.edition,
            subcategory_id: self.subcategory_id,
            image: None,
            image_type: None,
            audit: AuditStamp::default(),
            comments: Vec::new(),
        }
    }
}

impl Default for ProductBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`User`] test instances.
#[derive(Clone)]
pub struct UserBuilder {
    id: UserId,
    first_name: String,
    last_name: String,
    username: String,
    role: Role,
    email: String,
}

impl UserBuilder {
    pub fn new() -> Self {
        Self {
            id: UserId::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            username: "testuser".to_string(),
            role: Role::Customer,
            email: "test@example.com".to_string(),
        }
    }

    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn admin(mut self) -> Self {
        self.role = Role::Admin;
        self
    }

    pub fn build(self) -> User {
        User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            role: self.role,
            email: self.email,
            password_hash: "hash".to_string(),
            salt_key: "salt".to_string(),
            audit: AuditStamp::default(),
        }
    }
}

impl Default for UserBuilder {
    fn default() -> Self {
        Self::new()
    }
}
