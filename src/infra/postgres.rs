use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::message::Message;
use crate::domain::post::Post;
use crate::infra::db::Db;
use crate::infra::repository::{
    Cursor, MessageRepository, NewMessage, NewPost, PostChanges, PostFilter, PostRepository,
    StoreError,
};

const POST_COLUMNS: &str = "id, slug, title, body, author_id, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, sender_name, sender_email, body, created_at";

#[derive(Clone)]
pub struct PgPostRepository {
    db: Db,
}

impl PgPostRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO posts (slug, title, body, author_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.author_id)
        .fetch_one(self.db.pool())
        .await
        .map_err(|err| slug_conflict(err, &post.slug))?;

        Ok(post_from_row(&row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE posts \
             SET slug = $2, title = $3, body = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.slug)
        .bind(&changes.title)
        .bind(&changes.body)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|err| slug_conflict(err, &changes.slug))?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        filter: PostFilter,
        after: Option<Cursor>,
        limit: i64,
    ) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE ($1::uuid IS NULL OR author_id = $1) \
               AND ($2::timestamptz IS NULL \
                    OR created_at < $2 \
                    OR (created_at = $2 AND id < $3)) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $4"
        ))
        .bind(filter.author_id)
        .bind(after.map(|(created_at, _)| created_at))
        .bind(after.map(|(_, id)| id))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn slugs_with_base(&self, base: &str) -> Result<Vec<String>, StoreError> {
        // Slugs are restricted to [a-z0-9-], so `base` never carries LIKE wildcards.
        let slugs = sqlx::query_scalar(
            "SELECT slug FROM posts WHERE slug = $1 OR slug LIKE ($1 || '-%')",
        )
        .bind(base)
        .fetch_all(self.db.pool())
        .await?;

        Ok(slugs)
    }

    async fn count(&self, filter: PostFilter) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE ($1::uuid IS NULL OR author_id = $1)",
        )
        .bind(filter.author_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.db.ping().await?)
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    db: Db,
}

impl PgMessageRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO messages (sender_name, sender_email, body) \
             VALUES ($1, $2, $3) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message.sender_name)
        .bind(message.sender_email)
        .bind(message.body)
        .fetch_one(self.db.pool())
        .await?;

        Ok(message_from_row(&row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(message_from_row))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, after: Option<Cursor>, limit: i64) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE $1::timestamptz IS NULL \
                OR created_at < $1 \
                OR (created_at = $1 AND id < $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        ))
        .bind(after.map(|(created_at, _)| created_at))
        .bind(after.map(|(_, id)| id))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.db.ping().await?)
    }
}

fn slug_conflict(err: sqlx::Error, slug: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateSlug(slug.to_string());
        }
    }
    StoreError::Backend(err)
}

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        body: row.get("body"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        sender_name: row.get("sender_name"),
        sender_email: row.get("sender_email"),
        body: row.get("body"),
        created_at: row.get("created_at"),
    }
}
