pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::{require_auth, resolve_session};
pub use rest::{
    create_comment_handler, create_shot_handler, get_shot_handler, list_shots_handler,
    toggle_like_handler,
};

use auth::{login_handler, logout_handler, me_handler, signup_handler};
use state::AppState;

/// Builds the API router. Shot listings are public; writes need a session cookie.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Public routes that personalize the response when a session is present
    let viewer_routes = Router::new()
        .route("/shots", get(list_shots_handler))
        .route("/shots/{id}", get(get_shot_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_session,
        ));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/shots", post(create_shot_handler))
        .route("/shots/{id}/like", post(toggle_like_handler))
        .route("/shots/{id}/comments", post(create_comment_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
