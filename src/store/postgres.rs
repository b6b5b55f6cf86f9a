use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{Album, ArchiveItem, Comment, EdgeKind, JournalEntry, Post};
use crate::store::{DataStore, StoreError};

/// Postgres-backed store. Connects with the privileged service credential;
/// every ownership decision has already been made by the policy gate upstream.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Build the pool once at startup and run pending migrations.
    pub async fn connect(database_url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        info!("connected to database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataStore for PostgresStore {
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO posts (id, owner_id, content, tags, content_warning, media_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(post.id)
        .bind(&post.owner_id)
        .bind(&post.content)
        .bind(&post.tags)
        .bind(&post.content_warning)
        .bind(&post.media_url)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn update_post(&self, post: &Post) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE posts SET content = $2, tags = $3, content_warning = $4, media_url = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(post.id)
        .bind(&post.content)
        .bind(&post.tags)
        .bind(&post.content_warning)
        .bind(&post.media_url)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_post(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        // Compound predicate: the delete itself is ownership-scoped
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, owner_id, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(&comment.owner_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE comments SET content = $2, updated_at = $3 WHERE id = $1")
            .bind(comment.id)
            .bind(&comment.content)
            .bind(comment.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comment(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_journal_entry(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO journal_entries (id, owner_id, title, body, is_private, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(&entry.owner_id)
        .bind(&entry.title)
        .bind(&entry.body)
        .bind(entry.is_private)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_journal_entry(&self, id: Uuid) -> Result<Option<JournalEntry>, StoreError> {
        let entry = sqlx::query_as::<_, JournalEntry>("SELECT * FROM journal_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn update_journal_entry(&self, entry: &JournalEntry) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE journal_entries SET title = $2, body = $3, is_private = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(entry.id)
        .bind(&entry.title)
        .bind(&entry.body)
        .bind(entry.is_private)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_journal_entry(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM journal_entries WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_archive_item(&self, item: &ArchiveItem) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO archive_items (id, owner_id, title, description, media_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(item.id)
        .bind(&item.owner_id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.media_url)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_archive_item(&self, id: Uuid) -> Result<Option<ArchiveItem>, StoreError> {
        let item = sqlx::query_as::<_, ArchiveItem>("SELECT * FROM archive_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn update_archive_item(&self, item: &ArchiveItem) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE archive_items SET title = $2, description = $3, media_url = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.media_url)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_archive_item(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM archive_items WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_album(&self, album: &Album) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO albums (id, title, description, cover_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(album.id)
        .bind(&album.title)
        .bind(&album.description)
        .bind(&album.cover_url)
        .bind(album.created_at)
        .bind(album.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_album(&self, id: Uuid) -> Result<Option<Album>, StoreError> {
        let album = sqlx::query_as::<_, Album>("SELECT * FROM albums WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(album)
    }

    async fn update_album(&self, album: &Album) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE albums SET title = $2, description = $3, cover_url = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(album.id)
        .bind(&album.title)
        .bind(&album.description)
        .bind(&album.cover_url)
        .bind(album.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_album(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM albums WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn edge_exists(
        &self,
        kind: EdgeKind,
        actor_id: &str,
        target_id: Uuid,
    ) -> Result<bool, StoreError> {
        // Table names come from EdgeKind::table, a closed set of constants
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE actor_id = $1 AND target_id = $2)",
            kind.table()
        );
        let exists: (bool,) = sqlx::query_as(&sql)
            .bind(actor_id)
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists.0)
    }

    async fn insert_edge(
        &self,
        kind: EdgeKind,
        actor_id: &str,
        target_id: Uuid,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (actor_id, target_id, created_at) VALUES ($1, $2, $3)",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(actor_id)
            .bind(target_id)
            .bind(chrono::Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_edge(
        &self,
        kind: EdgeKind,
        actor_id: &str,
        target_id: Uuid,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE actor_id = $1 AND target_id = $2",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(actor_id)
            .bind(target_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
