//! Strongly-typed identifier types for the storefront domain.
//!
//! Each persisted entity gets its own identifier newtype, preventing
//! accidental mixing of different ID types. Identifiers are generated by the
//! caller (UUID v7 for time-ordering) and are immutable once assigned; the
//! persistence layer never generates them.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new ID with a time-ordered UUID v7
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Create an ID from an existing UUID
            #[inline]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the underlying UUID
            #[inline]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Whether this is the all-zero (unassigned) identifier
            #[inline]
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(CategoryId, "Unique identifier for a product category");
define_id!(SubcategoryId, "Unique identifier for a subcategory");
define_id!(ProductId, "Unique identifier for a product");
define_id!(UserId, "Unique identifier for a user account");
define_id!(OrderId, "Unique identifier for an order");
define_id!(CommentId, "Unique identifier for a product comment");
define_id!(BasketItemId, "Unique identifier for a basket line");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_new_ids_are_unique() {
        let a = CategoryId::new();
        let b = CategoryId::new();
        assert_ne!(a, b);
        assert!(!a.is_nil());
    }

    #[test]
    fn test_nil_detection() {
        let nil = ProductId::from_uuid(Uuid::nil());
        assert!(nil.is_nil());
    }

    #[test]
    fn test_roundtrip_through_string() {
        let id = UserId::new();
        let parsed = UserId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_serde_transparent() {
        let id = OrderId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn test_v7_ids_are_time_ordered() {
        let earlier = CommentId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = CommentId::new();
        assert!(earlier < later);
    }
}
