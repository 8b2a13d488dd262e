use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{BlobStore, BoxReader, StagedBlob};

const STAGING_DIR: &str = ".tmp";

/// Filesystem-backed content-addressed blob store.
///
/// Blobs are stored in a Git-style sharded directory layout:
/// `{base_path}/{first 2 hex chars}/{remaining 62 hex chars}`.
/// Uploads are staged under `{base_path}/.tmp` and renamed into place on commit.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store, creating the root if absent.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(STAGING_DIR)).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Compute the filesystem path for a given content hash.
    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.base_path
            .join(hash.shard_prefix())
            .join(hash.shard_suffix())
    }

    /// Map a blob path back to its file, rejecting anything that is not a
    /// content-addressed location.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let hash = ContentHash::from_locator(path)?;
        Ok(self.blob_path(&hash))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(STAGING_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_staged(
        &self,
        temp_path: &Path,
        reader: &mut BoxReader,
    ) -> Result<(ContentHash, u64), StorageError> {
        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        let mut temp_file = fs::File::create(temp_path).await?;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            hasher.update(&buf[..n]);
            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        temp_file.sync_all().await?;

        Ok((ContentHash::from_bytes(hasher.finalize().into()), total_bytes))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn stage(&self, mut reader: BoxReader) -> Result<StagedBlob, StorageError> {
        let temp_path = self.temp_path();
        match self.write_staged(&temp_path, &mut reader).await {
            Ok((hash, size)) => Ok(StagedBlob::new(hash, size, temp_path)),
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(e)
            }
        }
    }

    async fn commit(&self, staged: StagedBlob) -> Result<String, StorageError> {
        let hash = staged.hash();
        let blob_path = self.blob_path(&hash);

        if fs::try_exists(&blob_path).await? {
            let _ = fs::remove_file(staged.temp_path()).await;
            return Ok(hash.locator());
        }

        let mut result = Err(std::io::ErrorKind::NotFound.into());
        // A concurrent delete may remove the shard directory between the two calls.
        for _ in 0..2 {
            if let Some(parent) = blob_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            result = fs::rename(staged.temp_path(), &blob_path).await;
            match &result {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                _ => break,
            }
        }

        if let Err(e) = result {
            let _ = fs::remove_file(staged.temp_path()).await;
            return Err(e.into());
        }

        Ok(hash.locator())
    }

    async fn discard(&self, staged: StagedBlob) -> Result<(), StorageError> {
        match fs::remove_file(staged.temp_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_stream(&self, path: &str) -> Result<BoxReader, StorageError> {
        let blob_path = self.resolve(path)?;
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let blob_path = self.resolve(path)?;
        Ok(fs::try_exists(&blob_path).await?)
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let blob_path = self.resolve(path)?;
        match fs::remove_file(&blob_path).await {
            Ok(()) => {
                // Fails while other blobs share the shard; that is fine.
                if let Some(shard) = blob_path.parent() {
                    let _ = fs::remove_dir(shard).await;
                }
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut paths = Vec::new();
        let mut shards = fs::read_dir(&self.base_path).await?;

        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let Some(prefix) = shard.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if prefix == STAGING_DIR {
                continue;
            }

            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let Some(suffix) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                let locator = format!("{prefix}/{suffix}");
                if ContentHash::from_locator(&locator).is_ok() {
                    paths.push(locator);
                }
            }
        }

        paths.sort();
        Ok(paths)
    }

    async fn purge_staging(&self) -> Result<usize, StorageError> {
        let staging = self.base_path.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;

        let mut removed = 0;
        let mut entries = fs::read_dir(&staging).await?;
        while let Some(entry) = entries.next_entry().await? {
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}
