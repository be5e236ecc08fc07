//! Change-tracking session with audit interception.
//!
//! A session owns the explicit map from `(table, id)` to a document
//! snapshot and its state (unchanged/added/modified/deleted) for one
//! logical operation. Repositories stage mutations into it; nothing
//! touches storage until `save_changes`, which stamps audit metadata and
//! delegates the whole batch to the backend atomically.
//!
//! Write-once audit fields: on update, `created`/`created_by` are copied
//! from the stored row over whatever the in-memory object carries, so they
//! can never be overwritten after the first insert.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

use storefront_common::datetime::now_utc;
use storefront_domain::{Entity, Relation};

use crate::query::Include;
use crate::store::{CommitBatch, Store, WriteOp};
use crate::{Error, Result};

/// Identity stamped into the `*_by` audit fields.
///
/// Constructed explicitly per unit of work; there is no ambient principal
/// lookup. When no principal is present (system jobs, anonymous writes) the
/// configured system identity is used.
#[derive(Debug, Clone)]
pub struct AuditIdentity {
    principal: Option<String>,
    system_identity: String,
}

impl AuditIdentity {
    /// Identity for an authenticated principal.
    pub fn principal(name: impl Into<String>, system_identity: impl Into<String>) -> Self {
        Self {
            principal: Some(name.into()),
            system_identity: system_identity.into(),
        }
    }

    /// Identity for writes with no authenticated principal.
    pub fn system(system_identity: impl Into<String>) -> Self {
        Self {
            principal: None,
            system_identity: system_identity.into(),
        }
    }

    /// The name recorded in audit fields.
    pub fn effective(&self) -> &str {
        self.principal.as_deref().unwrap_or(&self.system_identity)
    }
}

/// Tracking state of one entity within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Loaded and unmodified.
    Unchanged,
    /// Staged for insert.
    Added,
    /// Staged for full-record replace.
    Modified,
    /// Staged for removal.
    Deleted,
}

#[derive(Debug, Clone)]
struct Tracked {
    state: EntityState,
    doc: Value,
    /// Snapshot at load/commit time, used by `revert_changes`.
    original: Option<Value>,
    audited: bool,
}

type TrackKey = (&'static str, Uuid);

struct Inner {
    open: bool,
    tracked: HashMap<TrackKey, Tracked>,
}

/// The live set of tracked entities for one logical operation.
///
/// Not safe for concurrent use from multiple tasks: the internal lock only
/// satisfies `Send`, it does not make interleaved staging meaningful. One
/// session per inbound operation.
pub struct Session {
    store: Arc<dyn Store>,
    relations: Vec<Relation>,
    identity: AuditIdentity,
    cancel: Option<CancellationToken>,
    inner: Mutex<Inner>,
}

impl Session {
    /// Create a session over a backend with the given relationship registry
    /// and audit identity.
    pub fn new(store: Arc<dyn Store>, relations: Vec<Relation>, identity: AuditIdentity) -> Self {
        Self {
            store,
            relations,
            identity,
            cancel: None,
            inner: Mutex::new(Inner {
                open: true,
                tracked: HashMap::new(),
            }),
        }
    }

    /// Attach a cancellation signal observed before storage I/O and before
    /// the commit is applied. A cancelled operation leaves tracked state
    /// unchanged.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The backend this session writes through.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Whether the session is still usable.
    pub fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    /// Tracking state of an entity, if tracked.
    pub fn state_of(&self, table: &'static str, id: Uuid) -> Option<EntityState> {
        self.inner.lock().tracked.get(&(table, id)).map(|t| t.state)
    }

    /// Number of entities currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.inner.lock().tracked.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.lock().open {
            Ok(())
        } else {
            Err(Error::Precondition(
                "session used after its unit of work was disposed".to_string(),
            ))
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Staging
    // ------------------------------------------------------------------

    pub(crate) fn stage_insert<T: Entity>(&self, entity: &T) -> Result<()> {
        self.ensure_open()?;
        let id = entity.id();
        if id.is_nil() {
            return Err(Error::Precondition(format!(
                "insert into {} requires a non-nil identifier",
                T::TABLE
            )));
        }

        let doc = serde_json::to_value(entity)?;
        let mut inner = self.inner.lock();
        let key = (T::TABLE, id);
        if inner.tracked.contains_key(&key) {
            return Err(Error::Precondition(format!(
                "{} {} is already tracked by this session",
                T::TABLE,
                id
            )));
        }
        inner.tracked.insert(
            key,
            Tracked {
                state: EntityState::Added,
                doc,
                original: None,
                audited: T::AUDITED,
            },
        );
        debug!(table = T::TABLE, %id, "Staged insert");
        Ok(())
    }

    pub(crate) fn stage_update<T: Entity>(&self, entity: &T) -> Result<()> {
        self.ensure_open()?;
        let id = entity.id();
        if id.is_nil() {
            return Err(Error::Precondition(format!(
                "update of {} requires a non-nil identifier",
                T::TABLE
            )));
        }

        let doc = serde_json::to_value(entity)?;
        let mut inner = self.inner.lock();
        let key = (T::TABLE, id);
        match inner.tracked.get_mut(&key) {
            Some(tracked) => match tracked.state {
                EntityState::Deleted => {
                    return Err(Error::Precondition(format!(
                        "{} {} is staged for deletion and cannot be updated",
                        T::TABLE,
                        id
                    )));
                }
                EntityState::Added => {
                    // Not yet persisted: the staged insert absorbs the change.
                    tracked.doc = doc;
                }
                EntityState::Unchanged | EntityState::Modified => {
                    tracked.state = EntityState::Modified;
                    tracked.doc = doc;
                }
            },
            None => {
                inner.tracked.insert(
                    key,
                    Tracked {
                        state: EntityState::Modified,
                        doc,
                        original: None,
                        audited: T::AUDITED,
                    },
                );
            }
        }
        debug!(table = T::TABLE, %id, "Staged update");
        Ok(())
    }

    pub(crate) fn stage_delete(&self, table: &'static str, id: Uuid, audited: bool) -> Result<()> {
        self.ensure_open()?;
        if id.is_nil() {
            return Err(Error::Precondition(format!(
                "delete from {} requires a non-nil identifier",
                table
            )));
        }

        let mut inner = self.inner.lock();
        let key = (table, id);
        let staged_insert = matches!(
            inner.tracked.get(&key),
            Some(t) if t.state == EntityState::Added
        );
        if staged_insert {
            // Never persisted: dropping the staged insert is enough.
            inner.tracked.remove(&key);
        } else if let Some(tracked) = inner.tracked.get_mut(&key) {
            tracked.state = EntityState::Deleted;
        } else {
            inner.tracked.insert(
                key,
                Tracked {
                    state: EntityState::Deleted,
                    doc: Value::Null,
                    original: None,
                    audited,
                },
            );
        }
        debug!(table, %id, "Staged delete");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Load one entity, preferring the tracked instance.
    ///
    /// Staged deletes read as absent; a fresh load is tracked as unchanged
    /// so later reads return the same snapshot.
    pub(crate) async fn load<T: Entity>(&self, id: Uuid) -> Result<Option<T>> {
        self.ensure_open()?;
        self.check_cancelled()?;

        {
            let inner = self.inner.lock();
            if let Some(tracked) = inner.tracked.get(&(T::TABLE, id)) {
                if tracked.state == EntityState::Deleted {
                    return Ok(None);
                }
                return Ok(Some(serde_json::from_value(tracked.doc.clone())?));
            }
        }

        let Some(doc) = self.store.get(T::TABLE, id).await? else {
            return Ok(None);
        };

        let entity: T = serde_json::from_value(doc.clone())?;
        let mut inner = self.inner.lock();
        // Re-check: the caller may have staged this entity while we awaited.
        inner.tracked.entry((T::TABLE, id)).or_insert(Tracked {
            state: EntityState::Unchanged,
            doc: doc.clone(),
            original: Some(doc),
            audited: T::AUDITED,
        });
        Ok(Some(entity))
    }

    /// Whether an entity exists, without materializing or tracking it.
    ///
    /// Staged deletes count as absent; staged inserts count as present.
    pub(crate) async fn exists(&self, table: &'static str, id: Uuid) -> Result<bool> {
        self.ensure_open()?;
        self.check_cancelled()?;

        {
            let inner = self.inner.lock();
            if let Some(tracked) = inner.tracked.get(&(table, id)) {
                return Ok(tracked.state != EntityState::Deleted);
            }
        }
        Ok(self.store.get(table, id).await?.is_some())
    }

    /// All documents of a table with staged changes overlaid and include
    /// paths hydrated. Same-session read-your-writes: staged inserts and
    /// updates are visible, staged deletes are not.
    pub(crate) async fn scan_docs(
        &self,
        table: &'static str,
        include: &Include,
    ) -> Result<Vec<Value>> {
        self.ensure_open()?;
        self.check_cancelled()?;

        let rows = self.store.scan(table).await?;
        let mut docs = self.overlay(table, rows);
        for path in include.paths() {
            let segments: Vec<String> = path.split('.').map(str::to_string).collect();
            self.embed(&mut docs, table, &segments).await?;
        }
        Ok(docs)
    }

    fn overlay(&self, table: &'static str, rows: Vec<(Uuid, Value)>) -> Vec<Value> {
        let inner = self.inner.lock();
        let mut docs = Vec::with_capacity(rows.len());
        for (id, doc) in rows {
            match inner.tracked.get(&(table, id)) {
                Some(tracked) if tracked.state == EntityState::Deleted => {}
                Some(tracked) if tracked.state == EntityState::Modified => {
                    docs.push(tracked.doc.clone());
                }
                _ => docs.push(doc),
            }
        }
        for ((t, _), tracked) in inner.tracked.iter() {
            if *t == table && tracked.state == EntityState::Added {
                docs.push(tracked.doc.clone());
            }
        }
        docs
    }

    /// Hydrate one include path level, recursing into the remainder.
    fn embed<'a>(
        &'a self,
        rows: &'a mut [Value],
        table: &'static str,
        segments: &'a [String],
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let Some((head, rest)) = segments.split_first() else {
                return Ok(());
            };
            let relation = *self
                .relations
                .iter()
                .find(|r| r.parent_table == table && r.name == head.as_str())
                .ok_or_else(|| {
                    Error::Precondition(format!(
                        "unknown include path segment '{}' for {}",
                        head, table
                    ))
                })?;

            let scanned = self.store.scan(relation.child_table).await?;
            let mut children = self.overlay(relation.child_table, scanned);
            self.embed(&mut children, relation.child_table, rest).await?;

            let mut by_parent: HashMap<String, Vec<Value>> = HashMap::new();
            for child in children {
                if let Some(parent_id) = child.get(relation.foreign_key).and_then(Value::as_str) {
                    by_parent.entry(parent_id.to_string()).or_default().push(child);
                }
            }

            for row in rows.iter_mut() {
                let matched = row
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|id| by_parent.remove(id))
                    .unwrap_or_default();
                if let Some(obj) = row.as_object_mut() {
                    obj.insert(relation.name.to_string(), Value::Array(matched));
                }
            }
            Ok(())
        })
    }

    /// Nesting depth of each table in the relation registry, parents
    /// shallower than their children.
    fn table_depths(&self) -> HashMap<&'static str, usize> {
        let mut depths: HashMap<&'static str, usize> = HashMap::new();
        for relation in &self.relations {
            depths.entry(relation.parent_table).or_insert(0);
            depths.entry(relation.child_table).or_insert(0);
        }
        // The registry is acyclic, so a fixpoint is reached within one
        // pass per table; the bound also guards against a cyclic registry.
        for _ in 0..depths.len() {
            let mut changed = false;
            for relation in &self.relations {
                let parent = depths.get(relation.parent_table).copied().unwrap_or(0);
                let child = depths.entry(relation.child_table).or_insert(0);
                if *child < parent + 1 {
                    *child = parent + 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        depths
    }

    // ------------------------------------------------------------------
    // Commit and lifecycle
    // ------------------------------------------------------------------

    /// Stamp audit metadata and commit all staged mutations atomically.
    ///
    /// On failure nothing is durable and staged entities remain attached so
    /// the caller can inspect, correct, and retry. On success staged
    /// entries become tracked-unchanged with their stamped snapshots.
    #[instrument(skip(self), fields(identity = self.identity.effective()))]
    pub async fn save_changes(&self) -> Result<()> {
        self.ensure_open()?;
        self.check_cancelled()?;

        let staged: Vec<(TrackKey, Tracked)> = {
            let inner = self.inner.lock();
            inner
                .tracked
                .iter()
                .filter(|(_, t)| t.state != EntityState::Unchanged)
                .map(|(k, t)| (*k, t.clone()))
                .collect()
        };
        if staged.is_empty() {
            return Ok(());
        }

        let now = now_utc();
        let by = self.identity.effective().to_string();

        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        let mut deletes = Vec::new();
        let mut stamped: HashMap<TrackKey, Value> = HashMap::new();

        for ((table, id), tracked) in &staged {
            let (table, id) = (*table, *id);
            match tracked.state {
                EntityState::Added => {
                    let mut doc = tracked.doc.clone();
                    if tracked.audited {
                        if let Some(obj) = doc.as_object_mut() {
                            obj.insert("created".into(), serde_json::to_value(now)?);
                            obj.insert("created_by".into(), Value::String(by.clone()));
                            obj.insert("last_modified".into(), Value::Null);
                            obj.insert("last_modified_by".into(), Value::Null);
                        }
                    }
                    stamped.insert((table, id), doc.clone());
                    inserts.push(WriteOp::Insert { table, id, doc });
                }
                EntityState::Modified => {
                    self.check_cancelled()?;
                    let stored = self
                        .store
                        .get(table, id)
                        .await?
                        .ok_or_else(|| Error::not_found(table, id))?;

                    let mut doc = tracked.doc.clone();
                    if tracked.audited {
                        if let Some(obj) = doc.as_object_mut() {
                            // Write-once: the stored values win over whatever
                            // the in-memory object carries.
                            obj.insert(
                                "created".into(),
                                stored.get("created").cloned().unwrap_or(Value::Null),
                            );
                            obj.insert(
                                "created_by".into(),
                                stored.get("created_by").cloned().unwrap_or(Value::Null),
                            );
                            obj.insert("last_modified".into(), serde_json::to_value(now)?);
                            obj.insert("last_modified_by".into(), Value::String(by.clone()));
                        }
                    }
                    stamped.insert((table, id), doc.clone());
                    updates.push(WriteOp::Update { table, id, doc });
                }
                EntityState::Deleted => deletes.push(WriteOp::Delete { table, id }),
                EntityState::Unchanged => unreachable!("unchanged entities are filtered out"),
            }
        }

        self.check_cancelled()?;

        // The tracked map's iteration order must not influence the batch:
        // parents insert before their children, children delete before
        // their parents, so any valid staged set commits deterministically.
        let depths = self.table_depths();
        let depth_of = |table: &str| depths.get(table).copied().unwrap_or(0);
        inserts.sort_by_key(|op| depth_of(op.table()));
        deletes.sort_by_key(|op| std::cmp::Reverse(depth_of(op.table())));

        let mut ops = inserts;
        ops.append(&mut updates);
        ops.append(&mut deletes);
        let op_count = ops.len();
        self.store.apply(CommitBatch { ops }).await?;

        let mut inner = self.inner.lock();
        for ((table, id), tracked) in staged {
            let key = (table, id);
            match tracked.state {
                EntityState::Deleted => {
                    inner.tracked.remove(&key);
                }
                _ => {
                    if let Some(doc) = stamped.remove(&key) {
                        inner.tracked.insert(
                            key,
                            Tracked {
                                state: EntityState::Unchanged,
                                doc: doc.clone(),
                                original: Some(doc),
                                audited: tracked.audited,
                            },
                        );
                    }
                }
            }
        }
        debug!(ops = op_count, "Session committed");
        Ok(())
    }

    /// Discard all staged mutations; tracked-but-unmodified entities stay
    /// tracked. Entities never loaded through this session stop being
    /// tracked entirely.
    pub fn revert_changes(&self) -> Result<()> {
        self.ensure_open()?;
        let mut inner = self.inner.lock();
        let keys: Vec<TrackKey> = inner.tracked.keys().copied().collect();
        for key in keys {
            let revert = match inner.tracked.get(&key) {
                Some(t) if t.state != EntityState::Unchanged => Some(t.original.clone()),
                _ => None,
            };
            match revert {
                Some(Some(original)) => {
                    if let Some(t) = inner.tracked.get_mut(&key) {
                        t.state = EntityState::Unchanged;
                        t.doc = original;
                    }
                }
                Some(None) => {
                    inner.tracked.remove(&key);
                }
                None => {}
            }
        }
        debug!("Staged changes reverted");
        Ok(())
    }

    /// Stop tracking all entities. Uncommitted staged changes are lost.
    pub fn detach_all(&self) -> Result<()> {
        self.ensure_open()?;
        self.inner.lock().tracked.clear();
        debug!("All entities detached");
        Ok(())
    }

    /// Clear tracked state and begin a fresh logical transaction without
    /// reallocating the underlying connection resource.
    pub async fn restart(&self) -> Result<()> {
        self.ensure_open()?;
        self.inner.lock().tracked.clear();
        self.store.restart().await?;
        debug!("Session restarted");
        Ok(())
    }

    /// Close the session; all further use fails fast.
    pub(crate) fn close(&self) {
        let mut inner = self.inner.lock();
        inner.open = false;
        inner.tracked.clear();
    }
}
