//! The `Entity` trait binding a domain type to the persistence layer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

/// A persisted record.
///
/// Implementors supply their storage table name, whether they carry audit
/// metadata, their caller-assigned identifier, and an explicit allow-list of
/// sortable field names. The generic repository and session are written
/// against this trait alone.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Storage table name backing this entity type.
    const TABLE: &'static str;

    /// Whether the session stamps audit fields on this type.
    ///
    /// Audited types must also implement [`Auditable`] and flatten their
    /// [`AuditStamp`] into their serialized form.
    ///
    /// [`Auditable`]: crate::audit::Auditable
    /// [`AuditStamp`]: crate::audit::AuditStamp
    const AUDITED: bool = true;

    /// The entity's globally unique identifier.
    ///
    /// Assigned by the caller at creation (the repository never generates
    /// identifiers) and immutable thereafter.
    fn id(&self) -> Uuid;

    /// Resolve a caller-supplied sort key name to an ordering.
    ///
    /// Unrecognized key names fall back to the default sort key (creation
    /// time for audited types), so dynamic sort input from untrusted callers
    /// never selects an unlisted field.
    fn compare_by(field: &str, a: &Self, b: &Self) -> Ordering;
}
