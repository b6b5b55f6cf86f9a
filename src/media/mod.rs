//! Media validation and storage.
//!
//! One category table is the single source of truth for allowed content
//! types, size ceilings and visibility. The validator consults it before any
//! storage write; the upload router and signed-URL issuer consume the same
//! table, so enforced and advertised limits cannot drift apart.

pub mod object_store;
pub mod signer;
pub mod upload;

pub use object_store::{LocalObjectStore, MemoryObjectStore, ObjectStore, ObjectStoreError};
pub use signer::{AccessGrantEntry, UrlSigner};
pub use upload::{StoredObjectRef, UploadRequest, UploadRouter};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MIB: u64 = 1024 * 1024;

/// Upload classification. Determines the content-type allow-list, the size
/// ceiling and whether stored objects are publicly addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Avatar,
    Post,
    Journal,
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Per-category upload rules.
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub allowed_types: &'static [&'static str],
    pub max_bytes: u64,
    pub visibility: Visibility,
}

impl MediaCategory {
    pub fn spec(&self) -> &'static CategorySpec {
        match self {
            MediaCategory::Avatar => &CategorySpec {
                allowed_types: &[
                    "image/jpeg",
                    "image/png",
                    "image/gif",
                    "image/webp",
                    "image/heic",
                    "image/heif",
                ],
                max_bytes: 5 * MIB,
                visibility: Visibility::Public,
            },
            MediaCategory::Post => &CategorySpec {
                allowed_types: &[
                    "image/jpeg",
                    "image/png",
                    "image/gif",
                    "image/webp",
                    "image/heic",
                    "image/heif",
                    "video/mp4",
                    "video/webm",
                ],
                max_bytes: 10 * MIB,
                visibility: Visibility::Public,
            },
            MediaCategory::Journal => &CategorySpec {
                allowed_types: &[
                    "image/jpeg",
                    "image/png",
                    "image/gif",
                    "image/webp",
                    "image/heic",
                    "image/heif",
                ],
                max_bytes: 10 * MIB,
                visibility: Visibility::Private,
            },
            MediaCategory::Archive => &CategorySpec {
                allowed_types: &[
                    "image/jpeg",
                    "image/png",
                    "image/gif",
                    "image/webp",
                    "image/heic",
                    "image/heif",
                    "video/mp4",
                    "video/webm",
                    "audio/mpeg",
                    "audio/wav",
                    "application/pdf",
                ],
                max_bytes: 20 * MIB,
                visibility: Visibility::Private,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Avatar => "avatar",
            MediaCategory::Post => "post",
            MediaCategory::Journal => "journal",
            MediaCategory::Archive => "archive",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaCategory {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avatar" => Ok(MediaCategory::Avatar),
            "post" => Ok(MediaCategory::Post),
            "journal" => Ok(MediaCategory::Journal),
            "archive" => Ok(MediaCategory::Archive),
            other => Err(MediaError::UnknownCategory(other.to_string())),
        }
    }
}

/// Media validation failures. All map to 400 at the API boundary.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("content type '{content_type}' is not allowed for {category} uploads")]
    UnsupportedType {
        category: MediaCategory,
        content_type: String,
    },

    #[error(
        "file size {} exceeds the {} limit for {category} uploads",
        human_size(*actual),
        human_size(*max)
    )]
    TooLarge {
        category: MediaCategory,
        actual: u64,
        max: u64,
    },

    #[error("unknown media category '{0}'")]
    UnknownCategory(String),
}

/// Check a declared content type and payload size against the category
/// table. Runs strictly before any storage write; a rejection here means
/// zero storage side effects.
pub fn validate(
    category: MediaCategory,
    content_type: &str,
    size_bytes: u64,
) -> Result<(), MediaError> {
    let spec = category.spec();

    if !spec.allowed_types.contains(&content_type) {
        return Err(MediaError::UnsupportedType {
            category,
            content_type: content_type.to_string(),
        });
    }

    if size_bytes > spec.max_bytes {
        return Err(MediaError::TooLarge {
            category,
            actual: size_bytes,
            max: spec.max_bytes,
        });
    }

    Ok(())
}

/// Render a byte count in human units for error messages.
pub fn human_size(bytes: u64) -> String {
    if bytes >= MIB {
        let mib = bytes as f64 / MIB as f64;
        if (mib - mib.round()).abs() < 0.05 {
            format!("{:.0} MiB", mib)
        } else {
            format!("{:.1} MiB", mib)
        }
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}
