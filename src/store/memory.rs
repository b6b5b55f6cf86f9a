//! In-memory store used by the test suite.
//!
//! Mirrors the Postgres implementation's semantics: inserts fail with
//! [`StoreError::Conflict`] on duplicate keys (the unique-constraint
//! backstop), deletes of owner-scoped records carry the compound
//! (id AND owner) predicate, and edge insertion is atomic under its lock.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{Album, ArchiveItem, Comment, EdgeKind, JournalEntry, Post};
use crate::store::{DataStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    posts: Mutex<HashMap<Uuid, Post>>,
    comments: Mutex<HashMap<Uuid, Comment>>,
    journal_entries: Mutex<HashMap<Uuid, JournalEntry>>,
    archive_items: Mutex<HashMap<Uuid, ArchiveItem>>,
    albums: Mutex<HashMap<Uuid, Album>>,
    post_likes: Mutex<HashSet<(String, Uuid)>>,
    archive_likes: Mutex<HashSet<(String, Uuid)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn edges(&self, kind: EdgeKind) -> &Mutex<HashSet<(String, Uuid)>> {
        match kind {
            EdgeKind::PostLike => &self.post_likes,
            EdgeKind::ArchiveLike => &self.archive_likes,
        }
    }

    fn lock_poisoned() -> StoreError {
        StoreError::Backend("memory store lock poisoned".to_string())
    }

    fn insert_unique<T: Clone>(
        map: &Mutex<HashMap<Uuid, T>>,
        id: Uuid,
        record: &T,
        label: &str,
    ) -> Result<(), StoreError> {
        let mut map = map.lock().map_err(|_| Self::lock_poisoned())?;
        if map.contains_key(&id) {
            return Err(StoreError::Conflict(format!("duplicate {} id {}", label, id)));
        }
        map.insert(id, record.clone());
        Ok(())
    }

    fn get_cloned<T: Clone>(
        map: &Mutex<HashMap<Uuid, T>>,
        id: Uuid,
    ) -> Result<Option<T>, StoreError> {
        let map = map.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(map.get(&id).cloned())
    }

    fn replace_existing<T: Clone>(
        map: &Mutex<HashMap<Uuid, T>>,
        id: Uuid,
        record: &T,
    ) -> Result<bool, StoreError> {
        let mut map = map.lock().map_err(|_| Self::lock_poisoned())?;
        match map.get_mut(&id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_owned<T>(
        map: &Mutex<HashMap<Uuid, T>>,
        id: Uuid,
        owner_id: &str,
        owner_of: impl Fn(&T) -> &str,
    ) -> Result<bool, StoreError> {
        let mut map = map.lock().map_err(|_| Self::lock_poisoned())?;
        match map.get(&id) {
            Some(existing) if owner_of(existing) == owner_id => {
                map.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        Self::insert_unique(&self.posts, post.id, post, "post")
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Self::get_cloned(&self.posts, id)
    }

    async fn update_post(&self, post: &Post) -> Result<bool, StoreError> {
        Self::replace_existing(&self.posts, post.id, post)
    }

    async fn delete_post(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        Self::remove_owned(&self.posts, id, owner_id, |p: &Post| &p.owner_id)
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        Self::insert_unique(&self.comments, comment.id, comment, "comment")
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Self::get_cloned(&self.comments, id)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<bool, StoreError> {
        Self::replace_existing(&self.comments, comment.id, comment)
    }

    async fn delete_comment(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        Self::remove_owned(&self.comments, id, owner_id, |c: &Comment| &c.owner_id)
    }

    async fn insert_journal_entry(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        Self::insert_unique(&self.journal_entries, entry.id, entry, "journal entry")
    }

    async fn get_journal_entry(&self, id: Uuid) -> Result<Option<JournalEntry>, StoreError> {
        Self::get_cloned(&self.journal_entries, id)
    }

    async fn update_journal_entry(&self, entry: &JournalEntry) -> Result<bool, StoreError> {
        Self::replace_existing(&self.journal_entries, entry.id, entry)
    }

    async fn delete_journal_entry(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        Self::remove_owned(&self.journal_entries, id, owner_id, |e: &JournalEntry| {
            &e.owner_id
        })
    }

    async fn insert_archive_item(&self, item: &ArchiveItem) -> Result<(), StoreError> {
        Self::insert_unique(&self.archive_items, item.id, item, "archive item")
    }

    async fn get_archive_item(&self, id: Uuid) -> Result<Option<ArchiveItem>, StoreError> {
        Self::get_cloned(&self.archive_items, id)
    }

    async fn update_archive_item(&self, item: &ArchiveItem) -> Result<bool, StoreError> {
        Self::replace_existing(&self.archive_items, item.id, item)
    }

    async fn delete_archive_item(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        Self::remove_owned(&self.archive_items, id, owner_id, |i: &ArchiveItem| {
            &i.owner_id
        })
    }

    async fn insert_album(&self, album: &Album) -> Result<(), StoreError> {
        Self::insert_unique(&self.albums, album.id, album, "album")
    }

    async fn get_album(&self, id: Uuid) -> Result<Option<Album>, StoreError> {
        Self::get_cloned(&self.albums, id)
    }

    async fn update_album(&self, album: &Album) -> Result<bool, StoreError> {
        Self::replace_existing(&self.albums, album.id, album)
    }

    async fn delete_album(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut map = self.albums.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(map.remove(&id).is_some())
    }

    async fn edge_exists(
        &self,
        kind: EdgeKind,
        actor_id: &str,
        target_id: Uuid,
    ) -> Result<bool, StoreError> {
        let set = self.edges(kind).lock().map_err(|_| Self::lock_poisoned())?;
        Ok(set.contains(&(actor_id.to_string(), target_id)))
    }

    async fn insert_edge(
        &self,
        kind: EdgeKind,
        actor_id: &str,
        target_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut set = self.edges(kind).lock().map_err(|_| Self::lock_poisoned())?;
        // HashSet::insert is the unique-constraint stand-in: false means the
        // edge already existed
        if !set.insert((actor_id.to_string(), target_id)) {
            return Err(StoreError::Conflict(format!(
                "duplicate key on {}",
                kind.table()
            )));
        }
        Ok(())
    }

    async fn delete_edge(
        &self,
        kind: EdgeKind,
        actor_id: &str,
        target_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut set = self.edges(kind).lock().map_err(|_| Self::lock_poisoned())?;
        Ok(set.remove(&(actor_id.to_string(), target_id)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
