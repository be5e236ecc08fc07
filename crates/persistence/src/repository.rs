//! Generic per-entity repository.
//!
//! One repository type serves every entity; there are no hand-written
//! per-entity repositories. A repository is a thin, cheaply-clonable handle
//! onto its unit of work's session: reads go through the session's overlay
//! (so staged writes are visible before commit) and mutations only stage
//! changes, never touch storage.
//!
//! Staging (`insert`/`update`/`delete`) is synchronous since it performs no
//! I/O; reads are async with `*_blocking` variants that run the async form
//! to completion.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use storefront_common::pagination::PaginatedResult;
use storefront_domain::Entity;

use crate::query::{FilterChain, Query};
use crate::session::Session;
use crate::{block_on, Error, Result};

/// CRUD and query surface over one entity type, bound to a session.
pub struct Repository<T: Entity> {
    session: Arc<Session>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            _marker: PhantomData,
        }
    }

    /// A fresh query over this entity type.
    pub fn query(&self) -> Query<T> {
        Query::new()
    }

    /// A query seeded through the conditional-filter composer.
    ///
    /// ```rust,ignore
    /// let query = repo.query_where(|chain| {
    ///     chain
    ///         .where_if(name.is_some(), move |p| p.name == name)
    ///         .where_if(max.is_some(), move |p| p.price <= max.unwrap())
    /// });
    /// ```
    pub fn query_where<F>(&self, build: F) -> Query<T>
    where
        F: FnOnce(FilterChain<T>) -> FilterChain<T>,
    {
        Query::with_filter(build(FilterChain::new()))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Load one entity by identifier.
    ///
    /// Returns the tracked instance when the session already holds one;
    /// a staged delete reads as `None`.
    #[instrument(skip(self), fields(entity = T::TABLE))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<T>> {
        self.session.load(id).await
    }

    /// Like [`get_by_id`](Self::get_by_id), but absence is an error.
    pub async fn require(&self, id: Uuid) -> Result<T> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(T::TABLE, id))
    }

    /// Whether an entity with this identifier exists.
    ///
    /// Never materializes or tracks the entity.
    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        self.session.exists(T::TABLE, id).await
    }

    /// Whether any entity matches the query's filter.
    ///
    /// Short-circuits on the first match; ordering, includes, and paging
    /// on the query are ignored.
    pub async fn exists_where(&self, query: &Query<T>) -> Result<bool> {
        let docs = self
            .session
            .scan_docs(T::TABLE, &crate::query::Include::new())
            .await?;
        for doc in docs {
            let entity: T = serde_json::from_value(doc)?;
            if query.filter.matches(&entity) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Number of entities matching the query's filter.
    pub async fn count(&self, query: &Query<T>) -> Result<u64> {
        let docs = self
            .session
            .scan_docs(T::TABLE, &crate::query::Include::new())
            .await?;
        let mut n = 0u64;
        for doc in docs {
            let entity: T = serde_json::from_value(doc)?;
            if query.filter.matches(&entity) {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Execute a query: filter, sort, hydrate includes, then apply
    /// skip/take.
    #[instrument(skip(self, query), fields(entity = T::TABLE))]
    pub async fn fetch(&self, query: &Query<T>) -> Result<Vec<T>> {
        let mut items = self.fetch_filtered_sorted(query).await?;
        let offset = query.page.offset().min(items.len());
        let mut page: Vec<T> = items.drain(offset..).collect();
        if let Some(limit) = query.page.limit() {
            page.truncate(limit);
        }
        Ok(page)
    }

    /// Execute a query and report the total match count alongside the page.
    ///
    /// The total is counted over the filtered result before skip/take are
    /// applied.
    #[instrument(skip(self, query), fields(entity = T::TABLE))]
    pub async fn fetch_page(&self, query: &Query<T>) -> Result<PaginatedResult<T>> {
        let mut items = self.fetch_filtered_sorted(query).await?;
        let total = items.len() as u64;
        let offset = query.page.offset().min(items.len());
        let mut page: Vec<T> = items.drain(offset..).collect();
        if let Some(limit) = query.page.limit() {
            page.truncate(limit);
        }
        Ok(PaginatedResult::new(page, total, query.page))
    }

    /// First entity matching the query, after filter and sort.
    pub async fn first(&self, query: &Query<T>) -> Result<Option<T>> {
        let mut items = self.fetch_filtered_sorted(query).await?;
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(items.swap_remove(0)))
        }
    }

    async fn fetch_filtered_sorted(&self, query: &Query<T>) -> Result<Vec<T>> {
        let docs = self.session.scan_docs(T::TABLE, &query.include).await?;
        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            let entity: T = serde_json::from_value(doc)?;
            if query.filter.matches(&entity) {
                items.push(entity);
            }
        }
        query.apply_sort(&mut items);
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Staged mutations
    // ------------------------------------------------------------------

    /// Stage an insert. Durable only after `save_changes`.
    pub fn insert(&self, entity: &T) -> Result<()> {
        self.session.stage_insert(entity)
    }

    /// Stage an insert for each entity.
    pub fn insert_range<'a, I>(&self, entities: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        for entity in entities {
            self.session.stage_insert(entity)?;
        }
        Ok(())
    }

    /// Stage a full-record replace. Durable only after `save_changes`,
    /// which fails with [`Error::NotFound`] if the record no longer exists.
    pub fn update(&self, entity: &T) -> Result<()> {
        self.session.stage_update(entity)
    }

    /// Stage a delete of this entity.
    ///
    /// Deleting an entity whose insert is staged but uncommitted simply
    /// unstages the insert.
    pub fn delete(&self, entity: &T) -> Result<()> {
        self.session.stage_delete(T::TABLE, entity.id(), T::AUDITED)
    }

    /// Load an entity by identifier and stage its delete.
    ///
    /// Fails immediately with [`Error::NotFound`] if no such entity exists.
    pub async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        if !self.exists(id).await? {
            return Err(Error::not_found(T::TABLE, id));
        }
        self.session.stage_delete(T::TABLE, id, T::AUDITED)
    }

    // ------------------------------------------------------------------
    // Blocking variants
    // ------------------------------------------------------------------

    /// Blocking form of [`get_by_id`](Self::get_by_id).
    pub fn get_by_id_blocking(&self, id: Uuid) -> Result<Option<T>> {
        block_on(self.get_by_id(id))
    }

    /// Blocking form of [`exists`](Self::exists).
    pub fn exists_blocking(&self, id: Uuid) -> Result<bool> {
        block_on(self.exists(id))
    }

    /// Blocking form of [`exists_where`](Self::exists_where).
    pub fn exists_where_blocking(&self, query: &Query<T>) -> Result<bool> {
        block_on(self.exists_where(query))
    }

    /// Blocking form of [`fetch`](Self::fetch).
    pub fn fetch_blocking(&self, query: &Query<T>) -> Result<Vec<T>> {
        block_on(self.fetch(query))
    }

    /// Blocking form of [`fetch_page`](Self::fetch_page).
    pub fn fetch_page_blocking(&self, query: &Query<T>) -> Result<PaginatedResult<T>> {
        block_on(self.fetch_page(query))
    }

    /// Blocking form of [`delete_by_id`](Self::delete_by_id).
    pub fn delete_by_id_blocking(&self, id: Uuid) -> Result<()> {
        block_on(self.delete_by_id(id))
    }
}
