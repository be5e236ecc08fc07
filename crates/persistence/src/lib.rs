//! Transactional data-access layer for the storefront platform.
//!
//! This crate provides the generic persistence core shared by every
//! business service:
//!
//! - **query**: composable filter/sort/include/paging query descriptions,
//!   including the conditional `where_if` predicate chain
//! - **store**: the storage backend seam with in-memory and PostgreSQL
//!   implementations
//! - **session**: the change-tracking session that stamps audit metadata
//!   on every commit
//! - **repository**: the per-entity CRUD and query surface
//! - **unit_of_work**: the scope object owning one session and lending out
//!   repositories bound to it
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_domain::{storefront_relations, Category};
//! use storefront_persistence::{AuditIdentity, MemoryStore, UnitOfWork};
//!
//! # async fn example() -> storefront_persistence::Result<()> {
//! let store = Arc::new(MemoryStore::new(storefront_relations()));
//! let uow = UnitOfWork::new(store, storefront_relations(), AuditIdentity::system("storefront"));
//!
//! let categories = uow.repository::<Category>();
//! categories.insert(&Category::new("Fragrances"))?;
//! uow.save_changes().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Nothing a repository stages becomes durable before `save_changes`; all
//! staged writes in one call commit atomically or not at all.

pub mod query;
pub mod repository;
pub mod session;
pub mod store;
pub mod unit_of_work;

pub use query::{FilterChain, Include, Query};
pub use repository::Repository;
pub use session::{AuditIdentity, EntityState, Session};
pub use store::memory::MemoryStore;
pub use store::postgres::{DatabasePool, PgStore};
pub use store::{CommitBatch, Store, WriteOp};
pub use unit_of_work::UnitOfWork;

use uuid::Uuid;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Persistence-level errors.
///
/// The core never swallows storage failures: they are enriched with the
/// operation context (entity type, identifier) where feasible and re-raised.
/// No variant is retried automatically; retry policy belongs to callers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The targeted record does not exist. Reported, never fatal.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity table name
        entity: &'static str,
        /// Targeted identifier
        id: Uuid,
    },

    /// A referential or uniqueness rule rejected the commit.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The record changed between load and commit.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Transport or storage-engine failure.
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Snapshot serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Programmer error in the calling code (disposed unit of work, nil
    /// identifier, unknown include path). Non-recoverable.
    #[error("Precondition violation: {0}")]
    Precondition(String),

    /// The operation's cancellation signal fired before any state changed.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether a caller-level retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Persistence(_) | Error::ConcurrencyConflict(_)
        )
    }

    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        Error::NotFound { entity, id }
    }
}

/// Run a future to completion on the current thread.
///
/// Backs the `*_blocking` repository and unit-of-work variants so the
/// synchronous surface is exactly "run the asynchronous form to completion".
/// Must not be called from inside an async runtime.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> F::Output {
    futures::executor::block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_includes_context() {
        let id = Uuid::now_v7();
        let err = Error::not_found("categories", id);
        let text = err.to_string();
        assert!(text.contains("categories"));
        assert!(text.contains(&id.to_string()));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::ConcurrencyConflict("version mismatch".into()).is_retryable());
        assert!(!Error::ConstraintViolation("fk".into()).is_retryable());
        assert!(!Error::Precondition("disposed".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }
}
