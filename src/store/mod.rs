//! Data store seam.
//!
//! Handlers talk to the backing database through the [`DataStore`] trait so
//! the Postgres implementation can be swapped for the in-memory one in tests.
//! The handle is constructed once at process start and passed in explicitly;
//! nothing in this layer reaches for a global connection.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Album, ArchiveItem, Comment, EdgeKind, JournalEntry, Post};

/// Errors from the data store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-constraint violation. The toggle engine treats this as the
    /// benign "edge already exists" outcome; everywhere else it surfaces.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store unreachable (connection refused, pool timeout).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Single-record operations against the backing database.
///
/// Deletes for owner-scoped records take the owner as part of the predicate
/// (id AND owner), so an ownership change between the preceding read and the
/// delete can never remove someone else's record. Edge inserts rely on the
/// unique (actor, target) constraint as the backstop for concurrent toggles.
#[async_trait]
pub trait DataStore: Send + Sync {
    // Posts
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;
    async fn update_post(&self, post: &Post) -> Result<bool, StoreError>;
    async fn delete_post(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError>;

    // Comments
    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError>;
    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;
    async fn update_comment(&self, comment: &Comment) -> Result<bool, StoreError>;
    async fn delete_comment(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError>;

    // Journal entries
    async fn insert_journal_entry(&self, entry: &JournalEntry) -> Result<(), StoreError>;
    async fn get_journal_entry(&self, id: Uuid) -> Result<Option<JournalEntry>, StoreError>;
    async fn update_journal_entry(&self, entry: &JournalEntry) -> Result<bool, StoreError>;
    async fn delete_journal_entry(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError>;

    // Archive items
    async fn insert_archive_item(&self, item: &ArchiveItem) -> Result<(), StoreError>;
    async fn get_archive_item(&self, id: Uuid) -> Result<Option<ArchiveItem>, StoreError>;
    async fn update_archive_item(&self, item: &ArchiveItem) -> Result<bool, StoreError>;
    async fn delete_archive_item(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError>;

    // Albums (administrative scope: delete is id-only)
    async fn insert_album(&self, album: &Album) -> Result<(), StoreError>;
    async fn get_album(&self, id: Uuid) -> Result<Option<Album>, StoreError>;
    async fn update_album(&self, album: &Album) -> Result<bool, StoreError>;
    async fn delete_album(&self, id: Uuid) -> Result<bool, StoreError>;

    // Toggle edges
    async fn edge_exists(
        &self,
        kind: EdgeKind,
        actor_id: &str,
        target_id: Uuid,
    ) -> Result<bool, StoreError>;
    async fn insert_edge(
        &self,
        kind: EdgeKind,
        actor_id: &str,
        target_id: Uuid,
    ) -> Result<(), StoreError>;
    async fn delete_edge(
        &self,
        kind: EdgeKind,
        actor_id: &str,
        target_id: Uuid,
    ) -> Result<bool, StoreError>;

    /// Connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
