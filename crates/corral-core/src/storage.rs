//! Storage backend abstraction for object storage (GCS, S3, local).
//!
//! The catalog core needs exactly two primitives from its storage
//! collaborator: "does this location exist" and "delete this location
//! recursively". `put` and `list` are carried for data-file enumeration and
//! for tests; no partial-object or range operations are ever required.
//!
//! Locations are flat object keys with `/`-separated segments. A "location"
//! is treated as a directory prefix: it exists when at least one object
//! lives at or under it, and recursive deletion removes every such object.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// Storage backend trait for object storage.
///
/// All storage backends (GCS, S3, memory) implement this trait. The
/// contract is designed for cloud object storage semantics: no rename,
/// no partial writes, prefix-based listing.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Returns true if at least one object exists at or under `location`.
    ///
    /// An exact-key object and a directory-style prefix are both reported
    /// as existing.
    async fn exists(&self, location: &str) -> Result<bool>;

    /// Deletes every object at or under `location`, returning the number
    /// of objects removed.
    ///
    /// Idempotent: deleting an absent location succeeds with `Ok(0)`.
    async fn delete_recursive(&self, location: &str) -> Result<u64>;

    /// Writes an object at the exact key `location`.
    async fn put(&self, location: &str, data: Bytes) -> Result<()>;

    /// Lists object keys under the given prefix.
    ///
    /// Returns an empty vec if no objects match. Keys are returned in
    /// lexicographic order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<BTreeMap<String, Bytes>>>,
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored objects.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }
}

/// Returns true if `key` is the location itself or lives under it as a
/// directory-style prefix.
fn covered_by(key: &str, location: &str) -> bool {
    if key == location {
        return true;
    }
    let prefix = if location.ends_with('/') {
        location.to_string()
    } else {
        format!("{location}/")
    };
    key.starts_with(&prefix)
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn exists(&self, location: &str) -> Result<bool> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;
        Ok(objects.keys().any(|k| covered_by(k, location)))
    }

    async fn delete_recursive(&self, location: &str) -> Result<u64> {
        let mut objects = self.objects.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;
        let doomed: Vec<String> = objects
            .keys()
            .filter(|k| covered_by(k, location))
            .cloned()
            .collect();
        for key in &doomed {
            objects.remove(key);
        }
        Ok(doomed.len() as u64)
    }

    async fn put(&self, location: &str, data: Bytes) -> Result<()> {
        if location.is_empty() {
            return Err(Error::InvalidInput("empty object key".into()));
        }
        self.objects
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .insert(location.to_string(), data);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;
        Ok(objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exists_exact_key_and_prefix() {
        let backend = MemoryBackend::new();
        backend
            .put("warehouse/db/t1/part-0.parquet", Bytes::from("x"))
            .await
            .expect("put should succeed");

        assert!(backend.exists("warehouse/db/t1/part-0.parquet").await.unwrap());
        assert!(backend.exists("warehouse/db/t1").await.unwrap());
        assert!(backend.exists("warehouse/db").await.unwrap());
        assert!(!backend.exists("warehouse/db/t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_does_not_match_sibling_prefix() {
        let backend = MemoryBackend::new();
        backend
            .put("warehouse/db/t1_backup/file", Bytes::from("x"))
            .await
            .unwrap();

        // "t1" must not match "t1_backup"
        assert!(!backend.exists("warehouse/db/t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_recursive_removes_subtree_only() {
        let backend = MemoryBackend::new();
        backend.put("a/t1/f1", Bytes::from("1")).await.unwrap();
        backend.put("a/t1/sub/f2", Bytes::from("2")).await.unwrap();
        backend.put("a/t2/f3", Bytes::from("3")).await.unwrap();

        let deleted = backend.delete_recursive("a/t1").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(!backend.exists("a/t1").await.unwrap());
        assert!(backend.exists("a/t2/f3").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_recursive_idempotent() {
        let backend = MemoryBackend::new();
        let deleted = backend.delete_recursive("nowhere").await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_list_sorted_by_key() {
        let backend = MemoryBackend::new();
        backend.put("p/b", Bytes::from("b")).await.unwrap();
        backend.put("p/a", Bytes::from("a")).await.unwrap();
        backend.put("q/c", Bytes::from("c")).await.unwrap();

        let keys = backend.list("p/").await.unwrap();
        assert_eq!(keys, vec!["p/a".to_string(), "p/b".to_string()]);
    }

    #[tokio::test]
    async fn test_put_empty_key_rejected() {
        let backend = MemoryBackend::new();
        let result = backend.put("", Bytes::from("x")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
