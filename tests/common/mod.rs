#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use scriptorium::app::contact::ContactService;
use scriptorium::app::identity::TokenAuthority;
use scriptorium::app::posts::PostService;
use scriptorium::domain::identity::Identity;
use scriptorium::domain::message::Message;
use scriptorium::domain::post::Post;
use scriptorium::infra::memory::{MemoryMessageRepository, MemoryPostRepository};
use scriptorium::infra::repository::{MessageRepository, PostRepository};
use scriptorium::AppState;

pub const TEST_TOKEN_KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";
pub const TEST_ISSUER: &str = "scriptorium-test";
pub const LOGIN_URL: &str = "/login";

// ---------------------------------------------------------------------------
// TestApp: one fresh in-memory instance per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub access_token: String,
}

impl TestUser {
    pub fn identity(&self) -> Identity {
        Identity::User(self.id)
    }
}

pub fn app() -> TestApp {
    app_with(
        Arc::new(MemoryPostRepository::new()),
        Arc::new(MemoryMessageRepository::new()),
    )
}

/// Builds the app over caller-supplied storage, e.g. a failing stub.
pub fn app_with(
    post_repo: Arc<dyn PostRepository>,
    message_repo: Arc<dyn MessageRepository>,
) -> TestApp {
    let state = AppState {
        post_repo,
        message_repo,
        identity: TokenAuthority::new(TEST_TOKEN_KEY, TEST_ISSUER, 15),
        app_name: "Scriptorium Test".to_string(),
        login_url: LOGIN_URL.to_string(),
        max_body_bytes: 64 * 1024,
    };
    let router = scriptorium::http::router(state.clone());

    TestApp { router, state }
}

impl TestApp {
    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = if let Some(body) = body {
            let body = serde_json::to_string(&body).unwrap();
            builder
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().unwrap().to_string());
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            location,
            body_bytes,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, None, token).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Mints a bearer token the way the identity provider would.
    pub fn create_user(&self) -> TestUser {
        let id = Uuid::new_v4();
        let issued = self.state.identity.issue(id).expect("issue token failed");
        TestUser {
            id,
            access_token: issued.token,
        }
    }

    pub fn posts(&self) -> PostService {
        PostService::new(self.state.post_repo.clone())
    }

    pub fn contact(&self) -> ContactService {
        ContactService::new(self.state.message_repo.clone())
    }

    /// Creates a post directly through the service layer.
    pub async fn create_post_for_user(&self, user: &TestUser, title: &str) -> Post {
        self.posts()
            .create_post(&user.identity(), title, "Some body text.")
            .await
            .expect("create post failed")
    }

    pub async fn create_message(&self, name: &str) -> Message {
        self.contact()
            .submit_message(name, &format!("{}@example.com", name.to_lowercase()), "Hello there")
            .await
            .expect("submit message failed")
    }
}
