//! In-memory store.
//!
//! Keeps every table as a map of JSON document snapshots and enforces the
//! relationship delete policies itself. A batch is validated against a
//! prospective copy of the state and published with a single swap, so
//! readers never observe a partially applied commit.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use storefront_domain::{DeletePolicy, Relation};

use crate::store::{CommitBatch, Store, WriteOp};
use crate::{Error, Result};

type Tables = HashMap<&'static str, BTreeMap<Uuid, Value>>;

/// In-memory [`Store`] implementation.
///
/// Shared across units of work via `Arc`; staged changes live in each
/// session until commit, so one session's uncommitted writes are never
/// visible through another.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    relations: Vec<Relation>,
}

impl MemoryStore {
    /// Create an empty store enforcing the given relationship registry.
    pub fn new(relations: Vec<Relation>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            relations,
        }
    }

    /// Number of rows currently in `table`.
    pub fn table_len(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    /// Remove a row and apply delete policies against `state`.
    ///
    /// Restrict relations reject the batch while dependents remain; cascade
    /// relations delete dependents recursively (via an explicit worklist).
    fn delete_with_policies(
        &self,
        state: &mut Tables,
        table: &'static str,
        id: Uuid,
    ) -> Result<()> {
        let mut worklist: Vec<(&'static str, Uuid)> = vec![(table, id)];

        while let Some((current_table, current_id)) = worklist.pop() {
            let removed = state
                .get_mut(current_table)
                .and_then(|rows| rows.remove(&current_id));
            if removed.is_none() && (current_table, current_id) == (table, id) {
                return Err(Error::not_found(table, id));
            }

            for relation in self
                .relations
                .iter()
                .filter(|r| r.parent_table == current_table)
            {
                let dependents = dependents_of(state, relation, current_id);
                match relation.on_delete {
                    DeletePolicy::Restrict => {
                        if !dependents.is_empty() {
                            return Err(Error::ConstraintViolation(format!(
                                "cannot delete {} {}: {} dependent row(s) in {}",
                                current_table,
                                current_id,
                                dependents.len(),
                                relation.child_table,
                            )));
                        }
                    }
                    DeletePolicy::Cascade => {
                        worklist.extend(
                            dependents
                                .into_iter()
                                .map(|dep| (relation.child_table, dep)),
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

fn dependents_of(state: &Tables, relation: &Relation, parent_id: Uuid) -> Vec<Uuid> {
    let parent = parent_id.to_string();
    state
        .get(relation.child_table)
        .map(|rows| {
            rows.iter()
                .filter(|(_, doc)| {
                    doc.get(relation.foreign_key).and_then(Value::as_str) == Some(parent.as_str())
                })
                .map(|(id, _)| *id)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, table: &str, id: Uuid) -> Result<Option<Value>> {
        Ok(self
            .tables
            .read()
            .get(table)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    async fn scan(&self, table: &str) -> Result<Vec<(Uuid, Value)>> {
        Ok(self
            .tables
            .read()
            .get(table)
            .map(|rows| rows.iter().map(|(id, doc)| (*id, doc.clone())).collect())
            .unwrap_or_default())
    }

    async fn apply(&self, batch: CommitBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        // Validate and build the post-batch state on a copy, then publish
        // it with one swap so the commit is all-or-nothing.
        let mut state = self.tables.read().clone();

        for op in &batch.ops {
            match op {
                WriteOp::Insert { table, id, doc } => {
                    let rows = state.entry(*table).or_default();
                    if rows.contains_key(id) {
                        return Err(Error::ConstraintViolation(format!(
                            "duplicate identifier {} in {}",
                            id, table
                        )));
                    }
                    rows.insert(*id, doc.clone());
                }
                WriteOp::Update { table, id, doc } => {
                    let rows = state.entry(*table).or_default();
                    if !rows.contains_key(id) {
                        return Err(Error::not_found(*table, *id));
                    }
                    rows.insert(*id, doc.clone());
                }
                WriteOp::Delete { table, id } => {
                    self.delete_with_policies(&mut state, *table, *id)?;
                }
            }
        }

        debug!(ops = batch.len(), "Memory store batch applied");
        *self.tables.write() = state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storefront_domain::storefront_relations;

    fn op_insert(table: &'static str, id: Uuid, doc: Value) -> WriteOp {
        WriteOp::Insert { table, id, doc }
    }

    #[tokio::test]
    async fn test_apply_and_read_back() {
        let store = MemoryStore::new(vec![]);
        let id = Uuid::now_v7();
        store
            .apply(CommitBatch {
                ops: vec![op_insert("categories", id, json!({"name": "Fragrances"}))],
            })
            .await
            .unwrap();

        let doc = store.get("categories", id).await.unwrap().unwrap();
        assert_eq!(doc["name"], "Fragrances");
        assert_eq!(store.table_len("categories"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejects_whole_batch() {
        let store = MemoryStore::new(vec![]);
        let id = Uuid::now_v7();
        store
            .apply(CommitBatch {
                ops: vec![op_insert("products", id, json!({}))],
            })
            .await
            .unwrap();

        let other = Uuid::now_v7();
        let err = store
            .apply(CommitBatch {
                ops: vec![
                    op_insert("products", other, json!({})),
                    op_insert("products", id, json!({})),
                ],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));

        // The first op of the failed batch must not be visible.
        assert!(store.get("products", other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = MemoryStore::new(vec![]);
        let err = store
            .apply(CommitBatch {
                ops: vec![WriteOp::Update {
                    table: "users",
                    id: Uuid::now_v7(),
                    doc: json!({}),
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "users", .. }));
    }

    #[tokio::test]
    async fn test_restrict_delete_with_dependents() {
        let store = MemoryStore::new(storefront_relations());
        let category = Uuid::now_v7();
        let subcategory = Uuid::now_v7();
        store
            .apply(CommitBatch {
                ops: vec![
                    op_insert("categories", category, json!({"name": "Fragrances"})),
                    op_insert(
                        "subcategories",
                        subcategory,
                        json!({"name": "Eau de Parfum", "category_id": category.to_string()}),
                    ),
                ],
            })
            .await
            .unwrap();

        let err = store
            .apply(CommitBatch {
                ops: vec![WriteOp::Delete {
                    table: "categories",
                    id: category,
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert!(store.get("categories", category).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_parent_and_children_in_one_batch() {
        let store = MemoryStore::new(storefront_relations());
        let category = Uuid::now_v7();
        let subcategory = Uuid::now_v7();
        store
            .apply(CommitBatch {
                ops: vec![
                    op_insert("categories", category, json!({})),
                    op_insert(
                        "subcategories",
                        subcategory,
                        json!({"category_id": category.to_string()}),
                    ),
                ],
            })
            .await
            .unwrap();

        // Children removed earlier in the batch no longer block the parent.
        store
            .apply(CommitBatch {
                ops: vec![
                    WriteOp::Delete {
                        table: "subcategories",
                        id: subcategory,
                    },
                    WriteOp::Delete {
                        table: "categories",
                        id: category,
                    },
                ],
            })
            .await
            .unwrap();
        assert_eq!(store.table_len("categories"), 0);
    }

    #[tokio::test]
    async fn test_cascade_delete_removes_leaf_rows() {
        let store = MemoryStore::new(storefront_relations());
        let product = Uuid::now_v7();
        let comment = Uuid::now_v7();
        let basket_line = Uuid::now_v7();
        store
            .apply(CommitBatch {
                ops: vec![
                    op_insert("products", product, json!({})),
                    op_insert(
                        "comments",
                        comment,
                        json!({"product_id": product.to_string()}),
                    ),
                    op_insert(
                        "basket_items",
                        basket_line,
                        json!({"product_id": product.to_string()}),
                    ),
                ],
            })
            .await
            .unwrap();

        store
            .apply(CommitBatch {
                ops: vec![WriteOp::Delete {
                    table: "products",
                    id: product,
                }],
            })
            .await
            .unwrap();

        assert!(store.get("comments", comment).await.unwrap().is_none());
        assert!(store.get("basket_items", basket_line).await.unwrap().is_none());
    }
}
