use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{CatalogError, ImageCatalog, ImageRecord, NewImage};

/// In-process catalog with the same uniqueness rule as the database table.
#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    last_id: i32,
    rows: BTreeMap<i32, ImageRecord>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageCatalog for MemoryCatalog {
    async fn count_by_hash(&self, hash: &str) -> Result<u64, CatalogError> {
        let state = self.state.lock().await;
        Ok(state.rows.values().filter(|r| r.hash == hash).count() as u64)
    }

    async fn insert(&self, image: NewImage) -> Result<i32, CatalogError> {
        let mut state = self.state.lock().await;
        if state.rows.values().any(|r| r.hash == image.hash) {
            return Err(CatalogError::Duplicate(image.hash));
        }

        state.last_id += 1;
        let id = state.last_id;
        state.rows.insert(
            id,
            ImageRecord {
                id,
                name: image.name,
                path: image.path,
                hash: image.hash,
                size: image.size,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<ImageRecord>, CatalogError> {
        let state = self.state.lock().await;
        Ok(state.rows.values().cloned().collect())
    }

    async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<ImageRecord>, CatalogError> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .values()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        Ok(self.state.lock().await.rows.len() as u64)
    }

    async fn get(&self, id: i32) -> Result<ImageRecord, CatalogError> {
        self.state
            .lock()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    async fn delete(&self, id: i32) -> Result<bool, CatalogError> {
        Ok(self.state.lock().await.rows.remove(&id).is_some())
    }

    async fn all_paths(&self) -> Result<Vec<String>, CatalogError> {
        let state = self.state.lock().await;
        Ok(state.rows.values().map(|r| r.path.clone()).collect())
    }
}
