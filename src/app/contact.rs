use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::app::{check_page_size, require_text, require_user, Page, ServiceError};
use crate::domain::identity::Identity;
use crate::domain::message::Message;
use crate::infra::repository::{Cursor, MessageRepository, NewMessage};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_EMAIL_CHARS: usize = 254;
pub const MAX_MESSAGE_CHARS: usize = 5_000;

#[derive(Clone)]
pub struct ContactService {
    repo: Arc<dyn MessageRepository>,
}

impl ContactService {
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self { repo }
    }

    /// Stores a contact-form submission. Open to anonymous visitors.
    pub async fn submit_message(
        &self,
        name: &str,
        email: &str,
        body: &str,
    ) -> Result<Message, ServiceError> {
        let sender_name = require_text("name", name, MAX_NAME_CHARS)?;
        let sender_email = require_text("email", email, MAX_EMAIL_CHARS)?;
        if !sender_email.validate_email() {
            return Err(ServiceError::validation("email is not a valid address"));
        }
        let body = require_text("body", body, MAX_MESSAGE_CHARS)?;

        let message = self
            .repo
            .insert(NewMessage {
                sender_name,
                sender_email,
                body,
            })
            .await?;

        tracing::info!(message_id = %message.id, "contact message received");
        Ok(message)
    }

    pub async fn list_messages(
        &self,
        identity: &Identity,
        after: Option<Cursor>,
        limit: i64,
    ) -> Result<Page<Message>, ServiceError> {
        require_user(identity)?;
        let limit = check_page_size(limit)?;
        let messages = self.repo.list(after, limit + 1).await?;
        Ok(Page::from_overfetch(messages, limit, Message::cursor))
    }

    pub async fn get_message(&self, identity: &Identity, id: Uuid) -> Result<Message, ServiceError> {
        require_user(identity)?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("message"))
    }

    pub async fn delete_message(&self, identity: &Identity, id: Uuid) -> Result<(), ServiceError> {
        let reviewer_id = require_user(identity)?;
        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound("message"));
        }

        tracing::info!(message_id = %id, reviewer_id = %reviewer_id, "contact message deleted");
        Ok(())
    }

    pub async fn count_messages(&self, identity: &Identity) -> Result<i64, ServiceError> {
        require_user(identity)?;
        Ok(self.repo.count().await?)
    }

    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.repo.ping().await?)
    }
}
