use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Bytes written to the staging area and hashed, not yet visible under
/// their content-addressed location.
#[derive(Debug)]
pub struct StagedBlob {
    hash: ContentHash,
    size: u64,
    temp_path: PathBuf,
}

impl StagedBlob {
    pub fn new(hash: ContentHash, size: u64, temp_path: PathBuf) -> Self {
        Self {
            hash,
            size,
            temp_path,
        }
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }
}

/// Content-addressed blob storage.
///
/// Blobs are addressed by a root-relative path derived from their content
/// hash (see [`ContentHash::locator`]).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return the content hash and blob path.
    async fn put(&self, data: &[u8]) -> Result<(ContentHash, String), StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        let staged = self.stage(reader).await?;
        let hash = staged.hash();
        let path = self.commit(staged).await?;
        Ok((hash, path))
    }

    /// Write data from an async reader into the staging area, hashing as it goes.
    async fn stage(&self, reader: BoxReader) -> Result<StagedBlob, StorageError>;

    /// Move a staged blob to its content-addressed location and return the path.
    async fn commit(&self, staged: StagedBlob) -> Result<String, StorageError>;

    /// Drop a staged blob without committing it.
    async fn discard(&self, staged: StagedBlob) -> Result<(), StorageError>;

    /// Retrieve all bytes for a blob.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.read_stream(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn read_stream(&self, path: &str) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;

    /// Paths of every committed blob.
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    /// Remove every file left in the staging area and return how many were removed.
    async fn purge_staging(&self) -> Result<usize, StorageError>;
}
