//! Declarative parent/child associations with delete policies.
//!
//! The storage layer consults this registry when applying a commit batch:
//! a restrict relation rejects deletion of a parent while dependents exist,
//! a cascade relation removes dependents along with the parent. The same
//! registry resolves eager-load include paths (the relation `name` matches
//! the parent's navigation field).

use serde::{Deserialize, Serialize};

/// What happens to dependents when their parent is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletePolicy {
    /// The parent cannot be removed while dependents exist.
    Restrict,
    /// Dependents are removed together with the parent.
    Cascade,
}

/// A parent→children association between two entity tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Navigation field name on the parent (also the include-path segment).
    pub name: &'static str,
    /// Table of the parent entity.
    pub parent_table: &'static str,
    /// Table of the child entity.
    pub child_table: &'static str,
    /// JSON field on the child holding the parent's identifier.
    pub foreign_key: &'static str,
    /// Delete behavior.
    pub on_delete: DeletePolicy,
}

/// The storefront entity relationship model.
///
/// Catalog and order associations restrict deletion; the two audit-bearing
/// leaf associations (comments, basket lines) cascade with their owning
/// aggregate.
pub fn storefront_relations() -> Vec<Relation> {
    vec![
        Relation {
            name: "subcategories",
            parent_table: "categories",
            child_table: "subcategories",
            foreign_key: "category_id",
            on_delete: DeletePolicy::Restrict,
        },
        Relation {
            name: "products",
            parent_table: "subcategories",
            child_table: "products",
            foreign_key: "subcategory_id",
            on_delete: DeletePolicy::Restrict,
        },
        Relation {
            name: "orders",
            parent_table: "users",
            child_table: "orders",
            foreign_key: "user_id",
            on_delete: DeletePolicy::Restrict,
        },
        Relation {
            name: "orders",
            parent_table: "products",
            child_table: "orders",
            foreign_key: "product_id",
            on_delete: DeletePolicy::Restrict,
        },
        Relation {
            name: "comments",
            parent_table: "products",
            child_table: "comments",
            foreign_key: "product_id",
            on_delete: DeletePolicy::Cascade,
        },
        Relation {
            name: "comments",
            parent_table: "users",
            child_table: "comments",
            foreign_key: "user_id",
            on_delete: DeletePolicy::Cascade,
        },
        Relation {
            name: "basket_items",
            parent_table: "products",
            child_table: "basket_items",
            foreign_key: "product_id",
            on_delete: DeletePolicy::Cascade,
        },
        Relation {
            name: "basket_items",
            parent_table: "users",
            child_table: "basket_items",
            foreign_key: "user_id",
            on_delete: DeletePolicy::Cascade,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_match_navigation_fields() {
        let relations = storefront_relations();
        let category_children: Vec<_> = relations
            .iter()
            .filter(|r| r.parent_table == "categories")
            .collect();
        assert_eq!(category_children.len(), 1);
        assert_eq!(category_children[0].name, "subcategories");
        assert_eq!(category_children[0].on_delete, DeletePolicy::Restrict);
    }

    #[test]
    fn test_leaf_associations_cascade() {
        let relations = storefront_relations();
        for rel in relations {
            let expected = matches!(rel.child_table, "comments" | "basket_items");
            assert_eq!(rel.on_delete == DeletePolicy::Cascade, expected);
        }
    }
}
