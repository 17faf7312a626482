//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the shot endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use callmyshot_core::domain::{Comment, Shot, UserSession};
use callmyshot_core::feed::FeedItem;
use callmyshot_core::handlers::InteractionError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

/// Upper bound on `?limit=` for a single feed request.
pub const MAX_FEED_LIMIT: usize = 100;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::me_handler,
        list_shots_handler,
        get_shot_handler,
        create_shot_handler,
        toggle_like_handler,
        create_comment_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthResponse,
            ShotRequest,
            CommentRequest,
            CommentResponse,
            ShotResponse,
            FeedItemResponse,
            FeedResponse,
            CreatedResponse,
            LikeResponse,
        )
    ),
    tags(
        (name = "CallMyShot API", description = "Post predictions, like them and comment on them.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ShotRequest {
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Deserialize, IntoParams)]
pub struct FeedQuery {
    /// Number of shots to return, newest first. Defaults to the configured feed size.
    pub limit: Option<usize>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Comment> for CommentResponse {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            user_id: comment.user_id,
            user_name: comment.user_name.clone(),
            content: comment.content.clone(),
            timestamp: comment.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ShotResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_handle: String,
    pub user_avatar: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub date_called: NaiveDate,
    pub deadline: NaiveDate,
    pub likes: Vec<Uuid>,
    pub comments: Vec<CommentResponse>,
}

impl From<Shot> for ShotResponse {
    fn from(shot: Shot) -> Self {
        Self {
            id: shot.id,
            user_id: shot.author.user_id,
            user_name: shot.author.name,
            user_handle: shot.author.handle,
            user_avatar: shot.author.avatar,
            content: shot.content,
            timestamp: shot.timestamp,
            date_called: shot.date_called,
            deadline: shot.deadline,
            likes: shot.likes.iter().collect(),
            comments: shot.comments.iter().map(CommentResponse::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct FeedItemResponse {
    pub shot: ShotResponse,
    pub liked_by_current_user: bool,
    pub like_count: usize,
    pub comment_count: usize,
}

impl From<FeedItem> for FeedItemResponse {
    fn from(item: FeedItem) -> Self {
        Self {
            shot: ShotResponse::from(item.shot),
            liked_by_current_user: item.liked_by_current_user,
            like_count: item.like_count,
            comment_count: item.comment_count,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct FeedResponse {
    pub items: Vec<FeedItemResponse>,
}

impl FeedResponse {
    fn from_feed(feed: Vec<FeedItem>) -> Self {
        Self {
            items: feed.into_iter().map(FeedItemResponse::from).collect(),
        }
    }
}

/// The id of whatever was created, plus the feed as re-read after the write.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    pub id: Uuid,
    pub feed: FeedResponse,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LikeResponse {
    /// `true` if the shot is now liked by the caller.
    pub liked: bool,
    pub feed: FeedResponse,
}

fn interaction_rejection(e: InteractionError) -> (StatusCode, String) {
    let status = match e {
        InteractionError::Auth(_) => StatusCode::UNAUTHORIZED,
        InteractionError::EmptyContent => StatusCode::BAD_REQUEST,
        InteractionError::ShotMissing(_) => StatusCode::NOT_FOUND,
        InteractionError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn feed_limit(state: &AppState, query: &FeedQuery) -> Result<NonZeroUsize, (StatusCode, String)> {
    match query.limit {
        None => Ok(state.shots.feed_limit()),
        Some(limit) => NonZeroUsize::new(limit.min(MAX_FEED_LIMIT)).ok_or((
            StatusCode::BAD_REQUEST,
            "limit must be a positive integer".to_string(),
        )),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the most recent shots, newest first.
///
/// Works without a session; `liked_by_current_user` is then always false.
#[utoipa::path(
    get,
    path = "/shots",
    params(FeedQuery),
    responses(
        (status = 200, description = "Recent shots", body = FeedResponse),
        (status = 400, description = "Invalid limit"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_shots_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, (StatusCode, String)> {
    let limit = feed_limit(&state, &query)?;
    let feed = state
        .shots
        .load_feed(user.as_ref(), limit)
        .await
        .map_err(interaction_rejection)?;
    Ok(Json(FeedResponse::from_feed(feed)))
}

/// Fetch a single shot.
#[utoipa::path(
    get,
    path = "/shots/{id}",
    params(("id" = Uuid, Path, description = "The shot id.")),
    responses(
        (status = 200, description = "The shot", body = FeedItemResponse),
        (status = 404, description = "No shot with this id"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_shot_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedItemResponse>, (StatusCode, String)> {
    let item = state
        .shots
        .view_shot(user.as_ref(), id)
        .await
        .map_err(interaction_rejection)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Shot not found".to_string()))?;
    Ok(Json(FeedItemResponse::from(item)))
}

/// Call a new shot. The deadline is 30 days after today.
#[utoipa::path(
    post,
    path = "/shots",
    request_body = ShotRequest,
    responses(
        (status = 201, description = "Shot created", body = CreatedResponse),
        (status = 400, description = "Empty content"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_shot_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserSession>,
    Json(req): Json<ShotRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let refreshed = state
        .shots
        .submit_shot(&user, &req.content, Utc::now())
        .await
        .map_err(interaction_rejection)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: refreshed.value,
            feed: FeedResponse::from_feed(refreshed.feed),
        }),
    ))
}

/// Like the shot, or remove the like if the caller already liked it.
#[utoipa::path(
    post,
    path = "/shots/{id}/like",
    params(("id" = Uuid, Path, description = "The shot id.")),
    responses(
        (status = 200, description = "Like toggled", body = LikeResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No shot with this id"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn toggle_like_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserSession>,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeResponse>, (StatusCode, String)> {
    let refreshed = state
        .shots
        .toggle_like(&user, id)
        .await
        .map_err(interaction_rejection)?;

    Ok(Json(LikeResponse {
        liked: refreshed.value,
        feed: FeedResponse::from_feed(refreshed.feed),
    }))
}

/// Comment on a shot.
#[utoipa::path(
    post,
    path = "/shots/{id}/comments",
    params(("id" = Uuid, Path, description = "The shot id.")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CreatedResponse),
        (status = 400, description = "Empty content"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No shot with this id"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserSession>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let refreshed = state
        .shots
        .post_comment(&user, id, &req.content, Utc::now())
        .await
        .map_err(interaction_rejection)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: refreshed.value,
            feed: FeedResponse::from_feed(refreshed.feed),
        }),
    ))
}
