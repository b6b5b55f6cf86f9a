use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A feed post. Owner-scoped: only `owner_id` may update or delete it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    /// Opaque actor identifier from the external identity provider
    pub owner_id: String,
    pub content: String,
    pub tags: Vec<String>,
    pub content_warning: Option<String>,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A comment on a post. Owner-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub owner_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A journal entry. Owner-scoped, private by default.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub body: String,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An archive item. Owner-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArchiveItem {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An album. Administrative scope: no owner column, the moderation surface
/// in front of this layer decides who may call its mutators.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Album {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A like relation. The existence of the row IS the liked state; there is no
/// boolean flag anywhere. Unique per (actor_id, target_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ToggleEdge {
    pub actor_id: String,
    pub target_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Which edge table a toggle operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    PostLike,
    ArchiveLike,
}

impl EdgeKind {
    pub fn table(&self) -> &'static str {
        match self {
            EdgeKind::PostLike => "post_likes",
            EdgeKind::ArchiveLike => "archive_likes",
        }
    }
}
