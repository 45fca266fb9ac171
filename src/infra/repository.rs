use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::message::Message;
use crate::domain::post::Post;

/// Keyset position: `(created_at, id)` of the last item already seen.
pub type Cursor = (OffsetDateTime, Uuid);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("slug already in use: {0}")]
    DuplicateSlug(String),
    #[error(transparent)]
    Backend(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub slug: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct PostChanges {
    pub slug: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub author_id: Option<Uuid>,
}

impl PostFilter {
    pub fn by_author(author_id: Uuid) -> Self {
        Self {
            author_id: Some(author_id),
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        self.author_id.map_or(true, |author| post.author_id == author)
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_name: String,
    pub sender_email: String,
    pub body: String,
}

/// Durable storage for posts.
///
/// Listing is newest first, ordered by `(created_at DESC, id DESC)`, and only
/// returns rows strictly older than `after` when a cursor is given.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Fails with [`StoreError::DuplicateSlug`] when the slug is taken.
    async fn insert(&self, post: NewPost) -> Result<Post, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError>;

    /// Returns `None` when the post no longer exists.
    async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list(
        &self,
        filter: PostFilter,
        after: Option<Cursor>,
        limit: i64,
    ) -> Result<Vec<Post>, StoreError>;

    /// Slugs equal to `base` or starting with `base-`.
    async fn slugs_with_base(&self, base: &str) -> Result<Vec<String>, StoreError>;

    async fn count(&self, filter: PostFilter) -> Result<i64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Durable storage for contact messages.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list(&self, after: Option<Cursor>, limit: i64) -> Result<Vec<Message>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
