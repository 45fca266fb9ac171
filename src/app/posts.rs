use futures::{stream, Stream, TryStreamExt};
use std::sync::Arc;
use uuid::Uuid;

use crate::app::slug::{first_free, slugify};
use crate::app::{check_page_size, require_text, require_user, Page, ServiceError};
use crate::domain::identity::Identity;
use crate::domain::post::Post;
use crate::infra::repository::{
    Cursor, NewPost, PostChanges, PostFilter, PostRepository, StoreError,
};

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_BODY_CHARS: usize = 50_000;

const STREAM_PAGE_SIZE: i64 = 50;

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn PostRepository>,
}

enum Scan {
    Start,
    After(Cursor),
    Done,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_posts(
        &self,
        after: Option<Cursor>,
        limit: i64,
    ) -> Result<Page<Post>, ServiceError> {
        self.list(PostFilter::default(), after, limit).await
    }

    pub async fn list_posts_by_author(
        &self,
        identity: &Identity,
        after: Option<Cursor>,
        limit: i64,
    ) -> Result<Page<Post>, ServiceError> {
        let author_id = require_user(identity)?;
        self.list(PostFilter::by_author(author_id), after, limit).await
    }

    /// Every post, newest first, fetched lazily page by page. Each call
    /// starts a fresh scan from the newest post.
    pub fn posts(&self) -> impl Stream<Item = Result<Post, ServiceError>> + '_ {
        stream::try_unfold(Scan::Start, move |scan| self.next_batch(scan))
            .map_ok(|posts| stream::iter(posts.into_iter().map(Ok::<Post, ServiceError>)))
            .try_flatten()
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> Result<Post, ServiceError> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or(ServiceError::NotFound("post"))
    }

    /// The post behind an edit form; only its author may open it.
    pub async fn post_for_edit(&self, identity: &Identity, slug: &str) -> Result<Post, ServiceError> {
        let post = self.get_post_by_slug(slug).await?;
        ensure_author(identity, &post)?;
        Ok(post)
    }

    pub async fn create_post(
        &self,
        identity: &Identity,
        title: &str,
        body: &str,
    ) -> Result<Post, ServiceError> {
        let author_id = require_user(identity)?;
        let title = require_text("title", title, MAX_TITLE_CHARS)?;
        let body = require_text("body", body, MAX_BODY_CHARS)?;
        let base = slugify(&title);

        let mut retried = false;
        loop {
            let slug = self.free_slug(&base, None).await?;
            let new_post = NewPost {
                author_id,
                slug,
                title: title.clone(),
                body: body.clone(),
            };

            match self.repo.insert(new_post).await {
                Ok(post) => {
                    tracing::info!(post_id = %post.id, slug = %post.slug, author_id = %author_id, "post created");
                    return Ok(post);
                }
                Err(StoreError::DuplicateSlug(slug)) if !retried => {
                    tracing::warn!(%slug, "slug claimed concurrently, retrying insert");
                    retried = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn update_post(
        &self,
        identity: &Identity,
        slug: &str,
        new_title: &str,
        new_body: &str,
    ) -> Result<Post, ServiceError> {
        let post = self.get_post_by_slug(slug).await?;
        ensure_author(identity, &post)?;
        let title = require_text("title", new_title, MAX_TITLE_CHARS)?;
        let body = require_text("body", new_body, MAX_BODY_CHARS)?;

        let mut retried = false;
        loop {
            let slug = if title == post.title {
                post.slug.clone()
            } else {
                self.free_slug(&slugify(&title), Some(&post.slug)).await?
            };
            let changes = PostChanges {
                slug,
                title: title.clone(),
                body: body.clone(),
            };

            match self.repo.update(post.id, changes).await {
                Ok(Some(updated)) => {
                    tracing::info!(post_id = %updated.id, slug = %updated.slug, "post updated");
                    return Ok(updated);
                }
                Ok(None) => return Err(ServiceError::NotFound("post")),
                Err(StoreError::DuplicateSlug(slug)) if !retried => {
                    tracing::warn!(%slug, post_id = %post.id, "slug claimed concurrently, retrying update");
                    retried = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn delete_post(&self, identity: &Identity, id: Uuid) -> Result<(), ServiceError> {
        let post = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("post"))?;
        ensure_author(identity, &post)?;

        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound("post"));
        }

        tracing::info!(post_id = %id, slug = %post.slug, "post deleted");
        Ok(())
    }

    pub async fn count_posts(&self, identity: &Identity) -> Result<i64, ServiceError> {
        let author_id = require_user(identity)?;
        Ok(self.repo.count(PostFilter::by_author(author_id)).await?)
    }

    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.repo.ping().await?)
    }

    async fn list(
        &self,
        filter: PostFilter,
        after: Option<Cursor>,
        limit: i64,
    ) -> Result<Page<Post>, ServiceError> {
        let limit = check_page_size(limit)?;
        let posts = self.repo.list(filter, after, limit + 1).await?;
        Ok(Page::from_overfetch(posts, limit, Post::cursor))
    }

    async fn next_batch(&self, scan: Scan) -> Result<Option<(Vec<Post>, Scan)>, ServiceError> {
        let after = match scan {
            Scan::Start => None,
            Scan::After(cursor) => Some(cursor),
            Scan::Done => return Ok(None),
        };

        let posts = self
            .repo
            .list(PostFilter::default(), after, STREAM_PAGE_SIZE + 1)
            .await?;
        let page = Page::from_overfetch(posts, STREAM_PAGE_SIZE, Post::cursor);
        let next = page.next_cursor.map_or(Scan::Done, Scan::After);
        Ok(Some((page.items, next)))
    }

    async fn free_slug(&self, base: &str, own: Option<&str>) -> Result<String, ServiceError> {
        let taken = self.repo.slugs_with_base(base).await?;
        first_free(base, &taken, own)
            .ok_or_else(|| ServiceError::Conflict(format!("no free slug left for {base}")))
    }
}

fn ensure_author(identity: &Identity, post: &Post) -> Result<(), ServiceError> {
    match identity.user_id() {
        Some(user_id) if post.is_authored_by(user_id) => Ok(()),
        _ => Err(ServiceError::Forbidden("only the author may change this post")),
    }
}
