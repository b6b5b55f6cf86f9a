//! Upload router.
//!
//! Validates a payload against the category table, derives a
//! collision-free storage path and persists it through the object store.
//! Path layout: `owner/category[/folder]/<prefix>_<name>`, where the prefix
//! combines a millisecond timestamp with a process-local monotonic counter
//! so concurrent uploads of identically named files land at distinct paths.

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::error::ApiError;
use crate::media::{validate, MediaCategory, MediaError, ObjectStore, ObjectStoreError, UrlSigner, Visibility};

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("upload failed: {0}")]
    Failed(String),
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Media(e) => e.into(),
            UploadError::Failed(msg) => {
                tracing::error!("object store write failed: {}", msg);
                ApiError::upload_failed("Failed to store uploaded file")
            }
        }
    }
}

/// A validated upload ready for storage.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Bytes,
    pub content_type: String,
    pub category: MediaCategory,
    pub owner_id: String,
    pub folder: Option<String>,
    pub original_name: String,
}

/// Reference to a stored object, as returned to upload callers.
#[derive(Debug, Clone, Serialize)]
pub struct StoredObjectRef {
    pub url: String,
    pub path: String,
    pub bucket: String,
}

pub struct UploadRouter {
    objects: Arc<dyn ObjectStore>,
    signer: Arc<UrlSigner>,
    public_base_url: String,
    bucket: String,
}

impl UploadRouter {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        signer: Arc<UrlSigner>,
        public_base_url: &str,
        bucket: &str,
    ) -> Self {
        Self {
            objects,
            signer,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        }
    }

    /// Validate and persist an upload. Validation runs strictly first: a
    /// rejected payload performs zero storage writes.
    pub async fn store(&self, request: UploadRequest) -> Result<StoredObjectRef, UploadError> {
        validate(
            request.category,
            &request.content_type,
            request.payload.len() as u64,
        )?;

        let path = object_path(
            &request.owner_id,
            request.category,
            request.folder.as_deref(),
            &request.original_name,
        );

        self.objects
            .put(&path, request.payload, &request.content_type)
            .await
            .map_err(|e| match e {
                ObjectStoreError::AlreadyExists(p) => {
                    UploadError::Failed(format!("path collision at '{p}'"))
                }
                ObjectStoreError::Backend(msg) => UploadError::Failed(msg),
            })?;

        let url = match request.category.spec().visibility {
            Visibility::Public => format!("{}/{}", self.public_base_url, path),
            Visibility::Private => self.signer.sign(&path).url,
        };

        Ok(StoredObjectRef {
            url,
            path,
            bucket: self.bucket.clone(),
        })
    }
}

/// Derive the storage path for an upload.
pub fn object_path(
    owner_id: &str,
    category: MediaCategory,
    folder: Option<&str>,
    original_name: &str,
) -> String {
    let prefix = format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed)
    );
    let filename = format!("{}_{}", prefix, sanitize_segment(original_name));

    match folder {
        Some(folder) => format!(
            "{}/{}/{}/{}",
            sanitize_segment(owner_id),
            category,
            sanitize_segment(folder),
            filename
        ),
        None => format!("{}/{}/{}", sanitize_segment(owner_id), category, filename),
    }
}

/// Restrict a path segment to a safe character set. Anything else becomes
/// '_'; an empty result falls back to "file".
fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MemoryObjectStore;

    fn router(objects: Arc<dyn ObjectStore>) -> UploadRouter {
        let signer = Arc::new(UrlSigner::new(
            "test-secret",
            "https://media.test.example",
            3600,
        ));
        UploadRouter::new(objects, signer, "https://media.test.example", "test-bucket")
    }

    fn request(category: MediaCategory, name: &str) -> UploadRequest {
        UploadRequest {
            payload: Bytes::from_static(b"\xff\xd8\xff\xe0fake-jpeg"),
            content_type: "image/jpeg".to_string(),
            category,
            owner_id: "u1".to_string(),
            folder: None,
            original_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn identical_names_get_distinct_paths() {
        let objects = Arc::new(MemoryObjectStore::new());
        let router = router(objects.clone());

        let a = router.store(request(MediaCategory::Avatar, "me.jpg")).await.unwrap();
        let b = router.store(request(MediaCategory::Avatar, "me.jpg")).await.unwrap();

        assert_ne!(a.path, b.path);
        assert!(objects.get(&a.path).await.unwrap().is_some());
        assert!(objects.get(&b.path).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rejected_payload_writes_nothing() {
        let objects = Arc::new(MemoryObjectStore::new());
        let router = router(objects.clone());

        let mut req = request(MediaCategory::Avatar, "virus.exe");
        req.content_type = "application/x-msdownload".to_string();
        let err = router.store(req).await.unwrap_err();
        assert!(matches!(err, UploadError::Media(MediaError::UnsupportedType { .. })));

        // Nothing landed in the store
        assert!(objects.get("u1/avatar/virus.exe").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn public_and_private_urls_differ_in_shape() {
        let objects = Arc::new(MemoryObjectStore::new());
        let router = router(objects);

        let public = router.store(request(MediaCategory::Avatar, "a.jpg")).await.unwrap();
        assert_eq!(
            public.url,
            format!("https://media.test.example/{}", public.path)
        );

        let private = router.store(request(MediaCategory::Journal, "b.jpg")).await.unwrap();
        assert!(private.url.contains("/sign/"));
        assert!(private.url.contains("token="));
    }

    #[tokio::test]
    async fn folder_lands_between_category_and_filename() {
        let objects = Arc::new(MemoryObjectStore::new());
        let router = router(objects);

        let mut req = request(MediaCategory::Archive, "scan.pdf");
        req.content_type = "application/pdf".to_string();
        req.folder = Some("2024".to_string());
        let stored = router.store(req).await.unwrap();

        let segments: Vec<&str> = stored.path.split('/').collect();
        assert_eq!(segments[0], "u1");
        assert_eq!(segments[1], "archive");
        assert_eq!(segments[2], "2024");
        assert!(segments[3].ends_with("_scan.pdf"));
    }

    #[test]
    fn sanitize_strips_traversal_material() {
        assert_eq!(sanitize_segment("../../etc"), "_.._etc");
        assert_eq!(sanitize_segment("my photo.jpg"), "my_photo.jpg");
        assert_eq!(sanitize_segment(""), "file");
        assert_eq!(sanitize_segment(".."), "file");
    }
}
