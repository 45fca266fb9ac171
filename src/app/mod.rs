pub mod contact;
pub mod identity;
pub mod posts;
pub mod slug;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::identity::Identity;
use crate::infra::repository::{Cursor, StoreError};

pub const DEFAULT_PAGE_SIZE: i64 = 30;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("storage unavailable")]
    Unavailable(#[source] StoreError),
}

impl ServiceError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateSlug(slug) => {
                Self::Conflict(format!("slug {slug} is already taken"))
            }
            other => Self::Unavailable(other),
        }
    }
}

/// One page of a newest-first listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Position of the last returned item when more items follow.
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// Builds a page from a fetch of `limit + 1` rows; the surplus row only
    /// signals that another page exists.
    pub(crate) fn from_overfetch(mut items: Vec<T>, limit: i64, key: impl Fn(&T) -> Cursor) -> Self {
        let limit = usize::try_from(limit).unwrap_or(0);
        let next_cursor = if items.len() > limit {
            items.truncate(limit);
            items.last().map(key)
        } else {
            None
        };
        Self { items, next_cursor }
    }
}

pub(crate) fn check_page_size(limit: i64) -> Result<i64, ServiceError> {
    if (1..=MAX_PAGE_SIZE).contains(&limit) {
        Ok(limit)
    } else {
        Err(ServiceError::validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )))
    }
}

/// Trims `value` and rejects it when empty or longer than `max_chars`.
pub(crate) fn require_text(field: &str, value: &str, max_chars: usize) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max_chars {
        return Err(ServiceError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value.to_string())
}

pub(crate) fn require_user(identity: &Identity) -> Result<Uuid, ServiceError> {
    identity
        .user_id()
        .ok_or(ServiceError::Forbidden("authentication required"))
}
