//! Unit of work: one session, many repositories, one commit.
//!
//! A unit of work is created per logical operation. Repositories obtained
//! from it all share its session, so their staged writes accumulate into a
//! single atomic `save_changes`. Disposal closes the session; any use after
//! disposal fails fast with a precondition error.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use storefront_domain::{Entity, Relation};

use crate::repository::Repository;
use crate::session::{AuditIdentity, EntityState, Session};
use crate::store::Store;
use crate::{block_on, Result};

/// Transactional scope owning one change-tracking session.
pub struct UnitOfWork {
    session: Arc<Session>,
    repositories: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl UnitOfWork {
    /// Create a unit of work over a backend.
    pub fn new(store: Arc<dyn Store>, relations: Vec<Relation>, identity: AuditIdentity) -> Self {
        Self::from_session(Session::new(store, relations, identity))
    }

    /// Create a unit of work whose operations observe a cancellation signal.
    ///
    /// A cancelled operation returns [`Error::Cancelled`](crate::Error) and
    /// leaves both tracked and durable state unchanged.
    pub fn with_cancellation(
        store: Arc<dyn Store>,
        relations: Vec<Relation>,
        identity: AuditIdentity,
        token: CancellationToken,
    ) -> Self {
        Self::from_session(Session::new(store, relations, identity).with_cancellation(token))
    }

    fn from_session(session: Session) -> Self {
        Self {
            session: Arc::new(session),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// The repository for entity type `T`.
    ///
    /// Repositories are cached per type: every call for the same `T`
    /// returns a handle onto the same session, so a write staged through
    /// one is visible through all the others before commit.
    pub fn repository<T: Entity>(&self) -> Repository<T> {
        let mut repos = self.repositories.lock();
        if let Some(repo) = repos
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Repository<T>>())
        {
            return repo.clone();
        }
        let repo = Repository::<T>::new(self.session.clone());
        repos.insert(TypeId::of::<T>(), Box::new(repo.clone()));
        repo
    }

    /// The session shared by this scope's repositories.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Tracking state of an entity, if the session tracks it.
    pub fn state_of<T: Entity>(&self, id: Uuid) -> Option<EntityState> {
        self.session.state_of(T::TABLE, id)
    }

    /// Commit all staged changes atomically, stamping audit metadata.
    pub async fn save_changes(&self) -> Result<()> {
        self.session.save_changes().await
    }

    /// Blocking form of [`save_changes`](Self::save_changes).
    pub fn save_changes_blocking(&self) -> Result<()> {
        block_on(self.save_changes())
    }

    /// Discard staged changes without touching storage.
    pub fn revert_changes(&self) -> Result<()> {
        self.session.revert_changes()
    }

    /// Stop tracking every entity.
    pub fn detach_all(&self) -> Result<()> {
        self.session.detach_all()
    }

    /// Discard tracked state and begin a fresh logical transaction on the
    /// same underlying resource.
    pub async fn restart(&self) -> Result<()> {
        self.session.restart().await
    }

    /// Close the scope. All further use of it or its repositories fails
    /// fast. Idempotent; also runs on drop.
    pub fn dispose(&self) {
        if self.session.is_open() {
            self.session.close();
            debug!("Unit of work disposed");
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("open", &self.session.is_open())
            .field("tracked", &self.session.tracked_count())
            .finish()
    }
}
