use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::message::Message;
use crate::domain::post::Post;
use crate::infra::repository::{
    Cursor, MessageRepository, NewMessage, NewPost, PostChanges, PostFilter, PostRepository,
    StoreError,
};

/// In-process post storage for local runs and tests.
#[derive(Clone, Default)]
pub struct MemoryPostRepository {
    inner: Arc<RwLock<PostTable>>,
}

#[derive(Default)]
struct PostTable {
    rows: HashMap<Uuid, Post>,
    clock: Clock,
}

impl PostTable {
    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.rows
            .values()
            .any(|post| post.slug == slug && Some(post.id) != except)
    }
}

impl MemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut table = self.inner.write().await;
        if table.slug_taken(&post.slug, None) {
            return Err(StoreError::DuplicateSlug(post.slug));
        }

        let now = table.clock.tick();
        let post = Post {
            id: Uuid::new_v4(),
            slug: post.slug,
            title: post.title,
            body: post.body,
            author_id: post.author_id,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let table = self.inner.read().await;
        Ok(table.rows.values().find(|post| post.slug == slug).cloned())
    }

    async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, StoreError> {
        let mut table = self.inner.write().await;
        if table.slug_taken(&changes.slug, Some(id)) {
            return Err(StoreError::DuplicateSlug(changes.slug));
        }

        let now = table.clock.tick();
        let Some(post) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        post.slug = changes.slug;
        post.title = changes.title;
        post.body = changes.body;
        post.updated_at = now;
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.rows.remove(&id).is_some())
    }

    async fn list(
        &self,
        filter: PostFilter,
        after: Option<Cursor>,
        limit: i64,
    ) -> Result<Vec<Post>, StoreError> {
        let table = self.inner.read().await;
        let posts = table
            .rows
            .values()
            .filter(|post| filter.matches(post))
            .cloned()
            .collect();
        Ok(newest_first(posts, Post::cursor, after, limit))
    }

    async fn slugs_with_base(&self, base: &str) -> Result<Vec<String>, StoreError> {
        let prefix = format!("{base}-");
        let table = self.inner.read().await;
        Ok(table
            .rows
            .values()
            .filter(|post| post.slug == base || post.slug.starts_with(&prefix))
            .map(|post| post.slug.clone())
            .collect())
    }

    async fn count(&self, filter: PostFilter) -> Result<i64, StoreError> {
        let table = self.inner.read().await;
        let count = table.rows.values().filter(|post| filter.matches(post)).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[derive(Clone, Default)]
pub struct MemoryMessageRepository {
    inner: Arc<RwLock<MessageTable>>,
}

#[derive(Default)]
struct MessageTable {
    rows: HashMap<Uuid, Message>,
    clock: Clock,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError> {
        let mut table = self.inner.write().await;
        let message = Message {
            id: Uuid::new_v4(),
            sender_name: message.sender_name,
            sender_email: message.sender_email,
            body: message.body,
            created_at: table.clock.tick(),
        };
        table.rows.insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.rows.remove(&id).is_some())
    }

    async fn list(&self, after: Option<Cursor>, limit: i64) -> Result<Vec<Message>, StoreError> {
        let table = self.inner.read().await;
        let messages = table.rows.values().cloned().collect();
        Ok(newest_first(messages, Message::cursor, after, limit))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count = self.inner.read().await.rows.len();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

/// Hands out strictly increasing timestamps so creation order is total even
/// when two rows land within the same clock reading.
#[derive(Default)]
struct Clock {
    last: Option<OffsetDateTime>,
}

impl Clock {
    fn tick(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.last {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last = Some(next);
        next
    }
}

fn newest_first<T>(
    mut items: Vec<T>,
    key: impl Fn(&T) -> Cursor,
    after: Option<Cursor>,
    limit: i64,
) -> Vec<T> {
    if let Some(cursor) = after {
        items.retain(|item| key(item) < cursor);
    }
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items.truncate(usize::try_from(limit).unwrap_or(0));
    items
}
