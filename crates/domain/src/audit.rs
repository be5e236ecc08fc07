//! Audit metadata model.
//!
//! Every audited entity carries four fields: who created it and when, and
//! who last modified it and when. The persistence session stamps these at
//! commit time; entity code never writes them directly.
//!
//! `created`/`created_by` are write-once: once an entity has been inserted,
//! no update may change them. The session enforces this by copying the
//! stored values over whatever the in-memory object carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Audit fields attached to auditable entities.
///
/// All fields are unset until the first successful commit. Audited entities
/// must embed this with `#[serde(flatten)]` so the stamp appears at the top
/// level of their serialized form; the session stamps snapshots through
/// those keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditStamp {
    /// Set exactly once, at first successful insert (UTC).
    pub created: Option<DateTime<Utc>>,
    /// Principal that performed the insert, or the configured system identity.
    pub created_by: Option<String>,
    /// Set on every successful update; unset until the first update.
    pub last_modified: Option<DateTime<Utc>>,
    /// Principal that performed the last update.
    pub last_modified_by: Option<String>,
}

/// Capability trait for entities that carry audit metadata.
///
/// The session tests for this capability (via [`Entity::AUDITED`]) rather
/// than relying on any base-type hierarchy.
///
/// [`Entity::AUDITED`]: crate::entity::Entity::AUDITED
pub trait Auditable {
    /// The entity's audit stamp.
    fn audit(&self) -> &AuditStamp;

    /// Mutable access to the audit stamp.
    fn audit_mut(&mut self) -> &mut AuditStamp;
}

/// Order two auditable entities by creation time, unset timestamps first.
///
/// This is the default sort key for listing endpoints.
pub fn by_created<T: Auditable>(a: &T, b: &T) -> Ordering {
    a.audit().created.cmp(&b.audit().created)
}

/// Order two auditable entities by last-modified time, unset timestamps first.
pub fn by_last_modified<T: Auditable>(a: &T, b: &T) -> Ordering {
    a.audit().last_modified.cmp(&b.audit().last_modified)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stamped(AuditStamp);

    impl Auditable for Stamped {
        fn audit(&self) -> &AuditStamp {
            &self.0
        }
        fn audit_mut(&mut self) -> &mut AuditStamp {
            &mut self.0
        }
    }

    #[test]
    fn test_default_stamp_is_unset() {
        let stamp = AuditStamp::default();
        assert!(stamp.created.is_none());
        assert!(stamp.created_by.is_none());
        assert!(stamp.last_modified.is_none());
        assert!(stamp.last_modified_by.is_none());
    }

    #[test]
    fn test_by_created_orders_unset_first() {
        let unset = Stamped(AuditStamp::default());
        let set = Stamped(AuditStamp {
            created: Some(Utc::now()),
            ..Default::default()
        });
        assert_eq!(by_created(&unset, &set), Ordering::Less);
        assert_eq!(by_created(&set, &unset), Ordering::Greater);
    }

    #[test]
    fn test_stamp_serializes_flat_keys() {
        let stamp = AuditStamp {
            created: Some(Utc::now()),
            created_by: Some("system".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&stamp).unwrap();
        assert!(value.get("created").is_some());
        assert!(value.get("created_by").is_some());
        assert!(value["last_modified"].is_null());
    }
}
