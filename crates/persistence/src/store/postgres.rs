//! PostgreSQL store - connection pool and document-table backend.
//!
//! Each entity table is a document table `(id uuid primary key, doc jsonb)`.
//! Foreign keys live inside the JSON documents, so the database schema
//! carries no referential constraints; the store enforces the relationship
//! delete policies itself, inside the commit transaction, by consulting the
//! relation registry. Schema and migration tooling live outside this crate;
//! the store only requires that the table shape matches the entity model.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use storefront_common::config::DatabaseConfig;
use storefront_domain::{DeletePolicy, Relation};

use crate::store::{CommitBatch, Store, WriteOp};
use crate::{Error, Result};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Create a new database pool with the given configuration.
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::Configuration("database.url not set".to_string()));
        }

        info!("Initializing database connection pool");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // All persisted timestamps are UTC
                    sqlx::query("SET timezone = 'UTC'").execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect(&config.url)
            .await?;

        info!("Database pool initialized successfully");
        Ok(Self { pool })
    }

    /// Get reference to the underlying pool.
    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check connectivity by executing a trivial query.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePool")
            .field("size", &self.pool.size())
            .field("idle", &self.pool.num_idle())
            .finish()
    }
}

/// PostgreSQL [`Store`] implementation over document tables.
pub struct PgStore {
    pool: DatabasePool,
    relations: Vec<Relation>,
}

impl PgStore {
    /// Create a store over an initialized pool, enforcing the given
    /// relationship registry.
    pub fn new(pool: DatabasePool, relations: Vec<Relation>) -> Self {
        Self { pool, relations }
    }

    /// Remove a row inside `tx`, honoring the delete policies.
    ///
    /// Restrict relations reject the batch while dependents remain; cascade
    /// relations delete dependents recursively (via an explicit worklist).
    /// Rows removed earlier in the same transaction no longer count as
    /// dependents.
    async fn delete_with_policies(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        table: &'static str,
        id: Uuid,
    ) -> Result<()> {
        let mut worklist: Vec<(&'static str, Uuid)> = vec![(table, id)];

        while let Some((current_table, current_id)) = worklist.pop() {
            for relation in self
                .relations
                .iter()
                .filter(|r| r.parent_table == current_table)
            {
                match relation.on_delete {
                    DeletePolicy::Restrict => {
                        let sql = format!(
                            "SELECT count(*) FROM {} WHERE doc->>'{}' = $1",
                            relation.child_table, relation.foreign_key
                        );
                        let dependents: i64 = sqlx::query_scalar(&sql)
                            .bind(current_id.to_string())
                            .fetch_one(&mut **tx)
                            .await
                            .map_err(map_sqlx_error)?;
                        if dependents > 0 {
                            return Err(Error::ConstraintViolation(format!(
                                "cannot delete {} {}: {} dependent row(s) in {}",
                                current_table, current_id, dependents, relation.child_table,
                            )));
                        }
                    }
                    DeletePolicy::Cascade => {
                        let sql = format!(
                            "DELETE FROM {} WHERE doc->>'{}' = $1 RETURNING id",
                            relation.child_table, relation.foreign_key
                        );
                        let removed = sqlx::query(&sql)
                            .bind(current_id.to_string())
                            .fetch_all(&mut **tx)
                            .await
                            .map_err(map_sqlx_error)?;
                        worklist.extend(
                            removed
                                .iter()
                                .map(|row| (relation.child_table, row.get::<Uuid, _>("id"))),
                        );
                    }
                }
            }

            let sql = format!("DELETE FROM {} WHERE id = $1", current_table);
            let done = sqlx::query(&sql)
                .bind(current_id)
                .execute(&mut **tx)
                .await
                .map_err(map_sqlx_error)?;
            if done.rows_affected() == 0 && (current_table, current_id) == (table, id) {
                return Err(Error::not_found(table, id));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self))]
    async fn get(&self, table: &str, id: Uuid) -> Result<Option<Value>> {
        let sql = format!("SELECT doc FROM {} WHERE id = $1", table);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(|r| r.get::<Value, _>("doc")))
    }

    #[instrument(skip(self))]
    async fn scan(&self, table: &str) -> Result<Vec<(Uuid, Value)>> {
        let sql = format!("SELECT id, doc FROM {}", table);
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<Uuid, _>("id"), r.get::<Value, _>("doc")))
            .collect())
    }

    #[instrument(skip(self, batch), fields(ops = batch.len()))]
    async fn apply(&self, batch: CommitBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.pool().begin().await.map_err(map_sqlx_error)?;

        for op in &batch.ops {
            let result = match op {
                WriteOp::Insert { table, id, doc } => {
                    let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", table);
                    sqlx::query(&sql)
                        .bind(id)
                        .bind(doc)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)
                        .map(|_| ())
                }
                WriteOp::Update { table, id, doc } => {
                    let sql = format!("UPDATE {} SET doc = $2 WHERE id = $1", table);
                    match sqlx::query(&sql)
                        .bind(id)
                        .bind(doc)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)
                    {
                        Ok(done) if done.rows_affected() == 0 => {
                            Err(Error::not_found(op.table(), *id))
                        }
                        Ok(_) => Ok(()),
                        Err(e) => Err(e),
                    }
                }
                WriteOp::Delete { .. } => {
                    self.delete_with_policies(&mut tx, op.table(), op.id()).await
                }
            };

            if let Err(e) = result {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Failed to rollback transaction");
                }
                return Err(e);
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(ops = batch.len(), "Batch committed");
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        self.pool.health_check().await
    }
}

/// Translate database errors into the persistence taxonomy.
///
/// SQLSTATE 23xxx classes are integrity violations; 40001 is a
/// serialization failure under concurrent commits.
fn map_sqlx_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(ref db_err) = err {
        if let Some(code) = db_err.code() {
            return match code.as_ref() {
                "23503" | "23505" | "23514" => Error::ConstraintViolation(db_err.to_string()),
                "40001" => Error::ConcurrencyConflict(db_err.to_string()),
                _ => Error::Persistence(err),
            };
        }
    }
    Error::Persistence(err)
}
