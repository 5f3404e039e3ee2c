//! src/services/object_store.rs
//!
//! Object store boundary used by the snapshot reader, plus `LocalObjectStore`,
//! an on-disk implementation that keeps payloads sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{key}`.

use crate::models::storage_object::ListedObject;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    io::{self, ErrorKind},
    path::{Component, Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid object key `{0}`")]
    InvalidObjectKey(String),
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-side view of an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Full listing of every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ListedObject>>;
}

const MAX_OBJECT_KEY_LEN: usize = 1024;
const TMP_FILE_PREFIX: &str = ".tmp-";

/// Disk-backed object store for a single bucket.
#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    /// Base directory on disk where buckets live.
    pub base_path: PathBuf,

    /// Bucket served by this store.
    pub bucket: String,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            bucket: bucket.into(),
        }
    }

    /// Rejects empty/oversized keys, absolute keys, `..` and control bytes.
    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        let invalid = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key.starts_with('/')
            || key.ends_with('/')
            || key.contains("..")
            || key
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if invalid {
            return Err(StoreError::InvalidObjectKey(key.to_string()));
        }
        Ok(())
    }

    fn bucket_root(&self) -> PathBuf {
        self.base_path.join(&self.bucket)
    }

    /// Two-level shard ids from MD5(bucket/key), as lowercase hex.
    fn object_shards(bucket: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Where `key` lives on disk.
    pub fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(&self.bucket, key);
        let mut path = self.bucket_root();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Write `data` under `key` through a temp file renamed into place, so a
    /// listing never sees a partial object.
    pub async fn put_object(&self, key: &str, data: Bytes) -> StoreResult<ListedObject> {
        self.ensure_key_safe(key)?;

        let file_path = self.object_path(key);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::other("object path missing parent directory"))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!("{}{}", TMP_FILE_PREFIX, Uuid::new_v4()));
        if let Err(err) = fs::write(&tmp_path, &data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        Ok(ListedObject {
            key: key.to_string(),
            size_bytes: data.len() as i64,
            last_modified: Utc::now(),
        })
    }

    /// Recover the object key from a payload path, or `None` for anything that
    /// is not a committed object (temp files, stray files outside the shards).
    fn key_from_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(self.bucket_root()).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        if parts.len() < 3 {
            return None;
        }
        if parts.last()?.starts_with(TMP_FILE_PREFIX) {
            return None;
        }

        let key = parts[2..].join("/");
        let (shard_a, shard_b) = Self::object_shards(&self.bucket, &key);
        if parts[0] != shard_a || parts[1] != shard_b {
            debug!("ignoring unsharded file {}", path.display());
            return None;
        }
        Some(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ListedObject>> {
        let root = self.bucket_root();
        if !fs::try_exists(&root).await? {
            return Err(StoreError::Unavailable(format!(
                "bucket directory {} does not exist",
                root.display()
            )));
        }

        let mut objects = Vec::new();
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            let Some(mut entries) = vanished_as_none(fs::read_dir(&dir).await)? else {
                if dir == root {
                    return Err(StoreError::Unavailable(format!(
                        "bucket directory {} disappeared during listing",
                        root.display()
                    )));
                }
                continue;
            };
            while let Some(entry) = entries.next_entry().await? {
                let Some(file_type) = vanished_as_none(entry.file_type().await)? else {
                    continue;
                };
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }
                let Some(key) = self.key_from_path(&path) else {
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }

                let Some(meta) = vanished_as_none(entry.metadata().await)? else {
                    debug!("object {} removed during listing", key);
                    continue;
                };
                let last_modified = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                objects.push(ListedObject {
                    key,
                    size_bytes: meta.len() as i64,
                    last_modified,
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

/// Entries removed while the walk is running are skipped; any other I/O
/// error fails the listing.
fn vanished_as_none<T>(result: io::Result<T>) -> StoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StoreError::Io(err)),
    }
}
