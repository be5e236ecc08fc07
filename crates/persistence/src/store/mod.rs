//! Storage backend seam.
//!
//! The session serializes tracked entities into JSON document snapshots and
//! hands the backend a [`CommitBatch`]; the backend makes the whole batch
//! durable atomically or rejects it as a unit. Two implementations ship:
//! an in-memory store for tests and single-process use, and a
//! PostgreSQL-backed store.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::Result;

/// One staged write inside a commit batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert a new row; rejects the batch if the identifier already exists.
    Insert {
        /// Target table
        table: &'static str,
        /// Row identifier
        id: Uuid,
        /// Document snapshot to persist
        doc: Value,
    },
    /// Replace an existing row; rejects the batch if it does not exist.
    Update {
        /// Target table
        table: &'static str,
        /// Row identifier
        id: Uuid,
        /// Document snapshot to persist
        doc: Value,
    },
    /// Remove a row, honoring the relationship delete policies.
    Delete {
        /// Target table
        table: &'static str,
        /// Row identifier
        id: Uuid,
    },
}

impl WriteOp {
    /// Table this operation targets.
    pub fn table(&self) -> &'static str {
        match self {
            WriteOp::Insert { table, .. }
            | WriteOp::Update { table, .. }
            | WriteOp::Delete { table, .. } => table,
        }
    }

    /// Identifier this operation targets.
    pub fn id(&self) -> Uuid {
        match self {
            WriteOp::Insert { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id, .. } => {
                *id
            }
        }
    }
}

/// An ordered group of writes that must become durable together.
#[derive(Debug, Clone, Default)]
pub struct CommitBatch {
    /// The staged writes, inserts first, then updates, then deletes.
    pub ops: Vec<WriteOp>,
}

impl CommitBatch {
    /// Whether the batch contains no writes.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of writes in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// A durable backing store for entity document snapshots.
///
/// Implementations must provide all-or-nothing semantics for
/// [`apply`](Store::apply): on failure, no operation of the batch may be
/// visible to any reader.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch one row's document by identifier.
    async fn get(&self, table: &str, id: Uuid) -> Result<Option<Value>>;

    /// Fetch all rows of a table.
    async fn scan(&self, table: &str) -> Result<Vec<(Uuid, Value)>>;

    /// Make the whole batch durable atomically.
    async fn apply(&self, batch: CommitBatch) -> Result<()>;

    /// Begin a fresh logical transaction on the same underlying resource.
    ///
    /// Backends without per-session transaction state treat this as a
    /// connectivity check.
    async fn restart(&self) -> Result<()> {
        Ok(())
    }
}
