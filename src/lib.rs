pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use anyhow::Result;
use std::sync::Arc;

use crate::app::identity::TokenAuthority;
use crate::config::{AppConfig, StorageBackend};
use crate::infra::db::Db;
use crate::infra::memory::{MemoryMessageRepository, MemoryPostRepository};
use crate::infra::postgres::{PgMessageRepository, PgPostRepository};
use crate::infra::repository::{MessageRepository, PostRepository};

#[derive(Clone)]
pub struct AppState {
    pub post_repo: Arc<dyn PostRepository>,
    pub message_repo: Arc<dyn MessageRepository>,
    pub identity: TokenAuthority,
    pub app_name: String,
    pub login_url: String,
    pub max_body_bytes: usize,
}

impl AppState {
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let post_repo: Arc<dyn PostRepository>;
        let message_repo: Arc<dyn MessageRepository>;
        match config.storage_backend {
            StorageBackend::Postgres => {
                let db = Db::connect(config).await?;
                post_repo = Arc::new(PgPostRepository::new(db.clone()));
                message_repo = Arc::new(PgMessageRepository::new(db));
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on shutdown");
                post_repo = Arc::new(MemoryPostRepository::new());
                message_repo = Arc::new(MemoryMessageRepository::new());
            }
        }

        Ok(Self {
            post_repo,
            message_repo,
            identity: TokenAuthority::new(
                config.token_key,
                config.token_issuer.clone(),
                config.token_ttl_minutes,
            ),
            app_name: config.app_name.clone(),
            login_url: config.login_url.clone(),
            max_body_bytes: config.max_body_bytes,
        })
    }
}
