//! Metadata catalog: the relational record of which images exist and where
//! their blobs live.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;

use crate::entity::image;

pub use memory::MemoryCatalog;
pub use postgres::SeaOrmCatalog;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("image {0} not found")]
    NotFound(i32),

    #[error("an image with hash {0} already exists")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// A catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: i32,
    pub name: String,
    pub path: String,
    pub hash: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// Values for a row about to be inserted. The id is assigned by the catalog.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub name: String,
    pub path: String,
    pub hash: String,
    pub size: i64,
}

impl From<image::Model> for ImageRecord {
    fn from(model: image::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            path: model.path,
            hash: model.hash,
            size: model.size,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Number of rows carrying this content hash.
    async fn count_by_hash(&self, hash: &str) -> Result<u64, CatalogError>;

    /// Insert a row and return its id.
    ///
    /// Fails with [`CatalogError::Duplicate`] when a row with the same hash
    /// exists; the check and the insert are a single atomic step.
    async fn insert(&self, image: NewImage) -> Result<i32, CatalogError>;

    /// Every row, ordered by id.
    async fn list_all(&self) -> Result<Vec<ImageRecord>, CatalogError>;

    /// One window of rows, ordered by id.
    async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<ImageRecord>, CatalogError>;

    /// Total number of rows.
    async fn count(&self) -> Result<u64, CatalogError>;

    async fn get(&self, id: i32) -> Result<ImageRecord, CatalogError>;

    async fn get_path(&self, id: i32) -> Result<String, CatalogError> {
        Ok(self.get(id).await?.path)
    }

    /// Delete a row. Returns `false` if no row matched.
    async fn delete(&self, id: i32) -> Result<bool, CatalogError>;

    /// Blob paths referenced by any row.
    async fn all_paths(&self) -> Result<Vec<String>, CatalogError>;
}
