use axum::{routing::get, routing::post, Router};

use crate::AppState;
use crate::http::handlers;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn pages() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::landing))
        .route("/home", get(handlers::landing))
        .route("/dashboard", get(handlers::dashboard))
}

pub fn blog() -> Router<AppState> {
    Router::new()
        .route("/blog", get(handlers::list_posts))
        .route("/blog/:slug", get(handlers::show_post))
        .route(
            "/new-post",
            get(handlers::new_post_form).post(handlers::create_post),
        )
        .route("/edit/:slug", get(handlers::edit_post_form))
        .route("/update", post(handlers::update_post))
        // Deletion over GET mirrors the links rendered by the blog front end.
        .route("/delete/:id", get(handlers::delete_post))
        .route("/all-posts", get(handlers::my_posts))
}

pub fn contact() -> Router<AppState> {
    Router::new()
        .route("/contact", post(handlers::submit_message))
        .route("/message", get(handlers::list_messages))
        .route(
            "/message/:id",
            get(handlers::get_message).post(handlers::delete_message),
        )
}
