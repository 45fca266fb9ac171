//! Landing, dashboard, health and login-redirect tests

mod common;

use axum::http::StatusCode;
use common::{app, LOGIN_URL, TEST_ISSUER};
use scriptorium::app::identity::TokenAuthority;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn landing_is_public() {
    let app = app();

    for path in ["/", "/home"] {
        let resp = app.get(path, None).await;
        assert_eq!(resp.status, StatusCode::OK);
        let body = resp.json();
        assert_eq!(body["name"], "Scriptorium Test");
        assert_eq!(body["blog"], "/blog");
        assert_eq!(body["contact"], "/contact");
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();

    let resp = app.get("/health", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "ok");
}

#[tokio::test]
async fn dashboard_counts() {
    let app = app();
    let user = app.create_user();
    let other = app.create_user();
    app.create_post_for_user(&user, "One").await;
    app.create_post_for_user(&user, "Two").await;
    app.create_post_for_user(&other, "Elsewhere").await;
    app.create_message("Ada").await;

    let resp = app.get("/dashboard", Some(&user.access_token)).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["user_id"].as_str().unwrap(), user.id.to_string());
    assert_eq!(body["post_count"], 2);
    assert_eq!(body["message_count"], 1);
}

// ===========================================================================
// Login redirects
// ===========================================================================

#[tokio::test]
async fn anonymous_dashboard_redirects_to_login() {
    let app = app();

    let resp = app.get("/dashboard", None).await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(
        resp.location.as_deref(),
        Some(format!("{}?next=%2Fdashboard", LOGIN_URL).as_str())
    );
}

#[tokio::test]
async fn redirect_keeps_query_string() {
    let app = app();

    let resp = app.get("/all-posts?limit=5", None).await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(
        resp.location.as_deref(),
        Some("/login?next=%2Fall-posts%3Flimit%3D5")
    );
}

#[tokio::test]
async fn anonymous_create_is_redirected_and_stores_nothing() {
    let app = app();

    let resp = app
        .post_json(
            "/new-post",
            json!({ "title": "Sneaky", "body": "Not allowed" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);

    let resp = app.get("/blog", None).await;
    assert_eq!(resp.json()["items"], json!([]));
}

#[tokio::test]
async fn invalid_tokens_are_treated_as_anonymous() {
    let app = app();

    let resp = app.get("/new-post", Some("v4.local.garbage")).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);

    let foreign = TokenAuthority::new([42; 32], TEST_ISSUER, 15)
        .issue(Uuid::new_v4())
        .unwrap();
    let resp = app.get("/new-post", Some(&foreign.token)).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/login?next=%2Fnew-post"));
}

#[tokio::test]
async fn public_pages_ignore_bad_tokens() {
    let app = app();

    let resp = app.get("/blog", Some("not-a-token")).await;

    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = app();

    let resp = app
        .post_json(
            "/contact",
            json!({ "name": "Ada", "email": "ada@example.com", "body": "x".repeat(70_000) }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn malformed_ids_still_redirect_anonymous_callers() {
    let app = app();

    let resp = app.get("/delete/not-a-uuid", None).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/login?next=%2Fdelete%2Fnot-a-uuid"));

    let resp = app.post_empty("/message/not-a-uuid", None).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/login?next=%2Fmessage%2Fnot-a-uuid"));

    let resp = app.get("/message/not-a-uuid", None).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn malformed_ids_are_rejected_after_login() {
    let app = app();
    let user = app.create_user();

    let resp = app.get("/delete/not-a-uuid", Some(&user.access_token)).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app.get("/message/not-a-uuid", Some(&user.access_token)).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}
