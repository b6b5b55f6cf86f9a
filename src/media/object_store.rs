//! Object storage seam.
//!
//! The upload router writes through this trait so tests can substitute the
//! in-memory backend. Writes never overwrite: collisions surface as
//! [`ObjectStoreError::AlreadyExists`] instead of clobbering an object.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object already exists at '{0}'")]
    AlreadyExists(String),

    #[error("object store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist a payload at `path`. Fails rather than overwrite.
    async fn put(&self, path: &str, data: Bytes, content_type: &str)
        -> Result<(), ObjectStoreError>;

    /// Fetch a stored payload, `None` if absent.
    async fn get(&self, path: &str) -> Result<Option<Bytes>, ObjectStoreError>;
}

/// Filesystem-backed object store rooted at a configured directory. Payloads
/// are staged under a temporary name and published with a link, so the final
/// path holds either the complete object or nothing; a failed write never
/// leaves a partial object visible. The content type is not persisted; local
/// serving re-derives it from the filename extension.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ObjectStoreError> {
        // Paths are built from sanitized segments upstream, but a second
        // guard here keeps the store safe on its own
        if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(ObjectStoreError::Backend(format!(
                "invalid object path '{path}'"
            )));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        }

        // Stage next to the final path, then publish with a link. The link
        // fails on collision instead of overwriting, and an interrupted write
        // only ever touches the staging name.
        let staging = full.with_file_name(format!(".{}.staging", Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&staging, &data).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(ObjectStoreError::Backend(e.to_string()));
        }

        let published = tokio::fs::hard_link(&staging, &full).await;
        let _ = tokio::fs::remove_file(&staging).await;
        published.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => ObjectStoreError::AlreadyExists(path.to_string()),
            _ => ObjectStoreError::Backend(e.to_string()),
        })
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, ObjectStoreError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ObjectStoreError::Backend(e.to_string())),
        }
    }
}

/// In-memory object store for tests.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| ObjectStoreError::Backend("lock poisoned".to_string()))?;
        if objects.contains_key(path) {
            return Err(ObjectStoreError::AlreadyExists(path.to_string()));
        }
        objects.insert(path.to_string(), data);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, ObjectStoreError> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| ObjectStoreError::Backend("lock poisoned".to_string()))?;
        Ok(objects.get(path).cloned())
    }
}
