//! Image repository: composes the content hasher, blob store and catalog into
//! ingest, list, fetch, remove and reconcile.

use std::collections::HashSet;
use std::sync::Arc;

use common::storage::{BlobStore, BoxReader, ContentHash, StagedBlob, StorageError};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::catalog::{CatalogError, ImageCatalog, ImageRecord, NewImage};
use crate::utils::filename::validate_upload_filename;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Carries the hash of the content that is already stored.
    #[error("duplicate content: {0}")]
    DuplicateContent(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl From<StorageError> for RepositoryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SizeLimitExceeded { limit, .. } => {
                RepositoryError::InvalidInput(format!("File exceeds maximum size of {limit} bytes"))
            }
            other => RepositoryError::StorageFailure(other.to_string()),
        }
    }
}

impl From<CatalogError> for RepositoryError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => RepositoryError::NotFound(format!("image {id}")),
            CatalogError::Duplicate(hash) => RepositoryError::DuplicateContent(hash),
            CatalogError::Database(e) => RepositoryError::StorageFailure(e.to_string()),
        }
    }
}

/// Result of a successful ingest.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub id: i32,
    pub hash: ContentHash,
    pub path: String,
    pub size: u64,
}

/// An image whose blob was readable at listing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageView {
    pub id: i32,
    pub name: String,
    pub data: Vec<u8>,
}

/// One page of the listing. `total` counts catalog rows, including rows
/// whose blob turned out to be missing.
#[derive(Debug)]
pub struct ImagePage {
    pub images: Vec<ImageView>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Staged uploads that were never committed or discarded.
    pub staged_purged: usize,
    /// Blobs no catalog row referenced.
    pub orphan_blobs_removed: usize,
    /// Rows whose blob is missing or whose path is unusable. Reported only.
    pub dangling_rows: Vec<i32>,
}

pub struct ImageRepository {
    catalog: Arc<dyn ImageCatalog>,
    blobs: Arc<dyn BlobStore>,
}

impl ImageRepository {
    pub fn new(catalog: Arc<dyn ImageCatalog>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { catalog, blobs }
    }

    /// Store an uploaded image unless identical content is already stored.
    #[instrument(skip(self, content))]
    pub async fn ingest(
        &self,
        name: &str,
        content: BoxReader,
    ) -> Result<IngestOutcome, RepositoryError> {
        let name = validate_upload_filename(name)
            .map_err(|e| RepositoryError::InvalidInput(e.message().into()))?
            .to_string();

        let staged = self.blobs.stage(content).await?;
        if staged.size() == 0 {
            self.discard(staged).await;
            return Err(RepositoryError::InvalidInput(
                "No content was supplied".into(),
            ));
        }

        let hash = staged.hash();
        let size = staged.size();

        match self.catalog.count_by_hash(&hash.to_hex()).await {
            Ok(0) => {}
            Ok(_) => {
                self.discard(staged).await;
                info!(%hash, "Rejected duplicate upload");
                return Err(RepositoryError::DuplicateContent(hash.to_hex()));
            }
            Err(e) => {
                self.discard(staged).await;
                return Err(e.into());
            }
        }

        let path = self.blobs.commit(staged).await?;

        let new_image = NewImage {
            name,
            path: path.clone(),
            hash: hash.to_hex(),
            size: i64::try_from(size).unwrap_or(i64::MAX),
        };

        match self.catalog.insert(new_image).await {
            Ok(id) => {
                info!(id, %hash, size, "Stored image");
                Ok(IngestOutcome {
                    id,
                    hash,
                    path,
                    size,
                })
            }
            Err(CatalogError::Duplicate(existing)) => {
                // A concurrent upload of the same bytes won; its row owns the blob.
                info!(%hash, "Rejected duplicate upload after losing insert race");
                Err(RepositoryError::DuplicateContent(existing))
            }
            Err(e) => {
                // Another upload of the same bytes may already rely on this
                // blob; reconcile removes it if it stays unreferenced.
                warn!(%hash, %path, "Catalog insert failed, leaving image file for reconcile");
                Err(e.into())
            }
        }
    }

    /// Every image whose blob can be read. Rows with a missing blob are skipped.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ImageView>, RepositoryError> {
        let records = self.catalog.list_all().await?;
        self.load_views(records).await
    }

    /// One page of [`Self::list`]. `page` is 1-based; `per_page` is clamped to
    /// `1..=max_per_page`.
    #[instrument(skip(self))]
    pub async fn list_page(
        &self,
        page: u64,
        per_page: u64,
        max_per_page: u64,
    ) -> Result<ImagePage, RepositoryError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, max_per_page.max(1));

        let total = self.catalog.count().await?;
        let offset = (page - 1).saturating_mul(per_page);
        let records = self.catalog.list_page(offset, per_page).await?;
        let images = self.load_views(records).await?;

        Ok(ImagePage {
            images,
            page,
            per_page,
            total,
        })
    }

    /// Catalog row and a stream of the blob bytes.
    #[instrument(skip(self))]
    pub async fn fetch(&self, id: i32) -> Result<(ImageRecord, BoxReader), RepositoryError> {
        let record = self.catalog.get(id).await?;
        match self.blobs.read_stream(&record.path).await {
            Ok(reader) => Ok((record, reader)),
            Err(StorageError::NotFound(path)) => {
                warn!(id, %path, "Image file not found");
                Err(RepositoryError::NotFound(format!("file for image {id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the blob, then the row. A blob that is already gone does not
    /// stop the row from being deleted.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> Result<(), RepositoryError> {
        let path = self.catalog.get_path(id).await?;

        if !self.blobs.delete(&path).await? {
            warn!(id, %path, "Image file not found");
        }

        if !self.catalog.delete(id).await? {
            warn!(id, "Catalog row disappeared before it was deleted");
        }

        info!(id, "Removed image");
        Ok(())
    }

    /// Repair drift between the blob store and the catalog left behind by
    /// interrupted operations.
    ///
    /// Must not run while uploads are in flight: staged files and freshly
    /// committed blobs without a row yet would be removed.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<ReconcileReport, RepositoryError> {
        let mut report = ReconcileReport {
            staged_purged: self.blobs.purge_staging().await?,
            ..Default::default()
        };

        let referenced: HashSet<String> = self.catalog.all_paths().await?.into_iter().collect();
        for path in self.blobs.list().await? {
            if !referenced.contains(&path) && self.blobs.delete(&path).await? {
                info!(%path, "Removed orphaned image file");
                report.orphan_blobs_removed += 1;
            }
        }

        for record in self.catalog.list_all().await? {
            match self.blobs.exists(&record.path).await {
                Ok(true) => {}
                Ok(false) | Err(StorageError::InvalidPath(_)) => {
                    warn!(id = record.id, path = %record.path, "Catalog row has no image file");
                    report.dangling_rows.push(record.id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }

    async fn load_views(
        &self,
        records: Vec<ImageRecord>,
    ) -> Result<Vec<ImageView>, RepositoryError> {
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            match self.blobs.read(&record.path).await {
                Ok(data) => views.push(ImageView {
                    id: record.id,
                    name: record.name,
                    data,
                }),
                Err(StorageError::NotFound(path) | StorageError::InvalidPath(path)) => {
                    warn!(id = record.id, %path, "Image file not found, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(views)
    }

    async fn discard(&self, staged: StagedBlob) {
        if let Err(e) = self.blobs.discard(staged).await {
            warn!("Failed to discard staged upload: {e}");
        }
    }
}
