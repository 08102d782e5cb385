//! In-process store.
//!
//! Keys are random UUIDs. `update` and `delete` run inside one store-wide
//! critical section so read-modify-write sequences never lose updates;
//! `persist` only relies on the map's per-entry atomicity because its key is
//! freshly generated.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::types::{Item, StoreResult};
use crate::store::Store;

/// A concurrent in-memory item store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: DashMap<String, Item>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_all(&self) -> StoreResult<Vec<Item>> {
        Ok(self.items.iter().map(|r| r.value().clone()).collect())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Item>> {
        Ok(self.items.get(id).map(|r| r.value().clone()))
    }

    async fn persist(&self, item: Item) -> StoreResult<Item> {
        let id = Uuid::new_v4().to_string();
        let stored = item.with_id(id.clone());
        self.items.insert(id, stored.clone());
        tracing::debug!(id = ?stored.id, "Item persisted in memory");
        Ok(stored)
    }

    async fn update(&self, id: &str, item: Item) -> StoreResult<Option<Item>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut existing) = self.items.get_mut(id) else {
            return Ok(None);
        };
        // Order is kept as stored; only title and completion change.
        existing.title = item.title;
        existing.completed = item.completed;
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.items.remove(id).is_none() {
            tracing::debug!(id = %id, "Delete of unknown id ignored");
        }
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.items.len())
    }
}
