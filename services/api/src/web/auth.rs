//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout and the current session.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use callmyshot_core::domain::UserSession;
use callmyshot_core::ports::{AuthenticatedSession, Credentials, PortError, Registration};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::{session_token, SESSION_COOKIE};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UserSession> for AuthResponse {
    fn from(user: UserSession) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
        }
    }
}

fn session_cookie(session: &AuthenticatedSession) -> String {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, session.token, max_age
    )
}

fn auth_rejection(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::AuthFailure(message) => (StatusCode::UNAUTHORIZED, message),
        other => {
            error!("Identity provider error: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication error".to_string(),
            )
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 401, description = "Registration rejected"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .identity
        .sign_up(Registration {
            email: req.email,
            password: req.password,
            display_name: req.display_name,
            avatar_url: req.avatar_url,
        })
        .await
        .map_err(auth_rejection)?;
    info!("Registered user {}", session.user.user_id);

    let cookie = session_cookie(&session);
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(session.user)),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .identity
        .sign_in(Credentials {
            email: req.email,
            password: req.password,
        })
        .await
        .map_err(auth_rejection)?;

    let cookie = session_cookie(&session);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(session.user)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful, or there was no session to end"),
        (status = 500, description = "Identity provider unreachable; the session is kept")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // On failure the cookie stays, so the client remains signed in.
    if let Some(token) = session_token(&headers) {
        state.identity.sign_out(token).await.map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;
    }

    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /auth/me - The signed-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current session", body = AuthResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn me_handler(Extension(user): Extension<UserSession>) -> Json<AuthResponse> {
    Json(AuthResponse::from(user))
}
