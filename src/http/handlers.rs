use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::contact::ContactService;
use crate::app::posts::PostService;
use crate::app::DEFAULT_PAGE_SIZE;
use crate::domain::message::Message;
use crate::domain::post::Post;
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let (timestamp, id) = cursor
        .split_once('/')
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let posts = PostService::new(state.post_repo.clone()).ping().await.is_ok();
    let messages = ContactService::new(state.message_repo.clone())
        .ping()
        .await
        .is_ok();
    let status = if posts && messages { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

#[derive(Serialize)]
pub struct LandingResponse {
    pub name: String,
    pub blog: &'static str,
    pub contact: &'static str,
}

pub async fn landing(State(state): State<AppState>) -> Json<LandingResponse> {
    Json(LandingResponse {
        name: state.app_name.clone(),
        blog: "/blog",
        contact: "/contact",
    })
}

#[derive(Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub body: String,
}

pub async fn submit_message(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let service = ContactService::new(state.message_repo.clone());
    let message = service
        .submit_message(&payload.name, &payload.email, &payload.body)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let cursor = parse_cursor(query.cursor)?;
    let service = PostService::new(state.post_repo.clone());
    let page = service
        .list_posts(cursor, query.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;

    Ok(Json(ListResponse {
        items: page.items,
        next_cursor: encode_cursor(page.next_cursor),
    }))
}

pub async fn show_post(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.post_repo.clone());
    let post = service.get_post_by_slug(&slug).await?;

    Ok(Json(post))
}

/// Describes the form a client renders to create or edit a post.
#[derive(Serialize)]
pub struct PostFormResponse {
    pub action: &'static str,
    pub method: &'static str,
    pub fields: [&'static str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
}

pub async fn new_post_form(_auth: AuthUser) -> Json<PostFormResponse> {
    Json(PostFormResponse {
        action: "/new-post",
        method: "POST",
        fields: ["title", "body"],
        post: None,
    })
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let service = PostService::new(state.post_repo.clone());
    let post = service
        .create_post(&auth.identity(), &payload.title, &payload.body)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn edit_post_form(
    auth: AuthUser,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PostFormResponse>, AppError> {
    let service = PostService::new(state.post_repo.clone());
    let post = service.post_for_edit(&auth.identity(), &slug).await?;

    Ok(Json(PostFormResponse {
        action: "/update",
        method: "POST",
        fields: ["title", "body"],
        post: Some(post),
    }))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub slug: String,
    pub title: String,
    pub body: String,
}

pub async fn update_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.post_repo.clone());
    let post = service
        .update_post(&auth.identity(), &payload.slug, &payload.title, &payload.body)
        .await?;

    Ok(Json(post))
}

pub async fn delete_post(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = PostService::new(state.post_repo.clone());
    service.delete_post(&auth.identity(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn my_posts(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let cursor = parse_cursor(query.cursor)?;
    let service = PostService::new(state.post_repo.clone());
    let page = service
        .list_posts_by_author(
            &auth.identity(),
            cursor,
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(ListResponse {
        items: page.items,
        next_cursor: encode_cursor(page.next_cursor),
    }))
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub user_id: Uuid,
    pub post_count: i64,
    pub message_count: i64,
}

pub async fn dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    let identity = auth.identity();
    let post_count = PostService::new(state.post_repo.clone())
        .count_posts(&identity)
        .await?;
    let message_count = ContactService::new(state.message_repo.clone())
        .count_messages(&identity)
        .await?;

    Ok(Json(DashboardResponse {
        user_id: auth.user_id,
        post_count,
        message_count,
    }))
}

pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Message>>, AppError> {
    let cursor = parse_cursor(query.cursor)?;
    let service = ContactService::new(state.message_repo.clone());
    let page = service
        .list_messages(
            &auth.identity(),
            cursor,
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(ListResponse {
        items: page.items,
        next_cursor: encode_cursor(page.next_cursor),
    }))
}

pub async fn get_message(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Message>, AppError> {
    let service = ContactService::new(state.message_repo.clone());
    let message = service.get_message(&auth.identity(), id).await?;

    Ok(Json(message))
}

pub async fn delete_message(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = ContactService::new(state.message_repo.clone());
    service.delete_message(&auth.identity(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}
