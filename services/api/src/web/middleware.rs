//! services/api/src/web/middleware.rs
//!
//! Resolves the `session` cookie into the signed-in user.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use callmyshot_core::domain::UserSession;
use std::sync::Arc;
use tracing::error;

use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// The viewer of a public route, if signed in.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Option<UserSession>);

/// Extracts the auth session token from the `Cookie` header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|token| !token.is_empty())
}

async fn lookup(state: &AppState, headers: &HeaderMap) -> Option<UserSession> {
    let token = session_token(headers)?;
    match state.identity.resolve(token).await {
        Ok(user) => user,
        Err(e) => {
            error!("Failed to validate auth session: {:?}", e);
            None
        }
    }
}

/// Middleware for public routes: inserts a [`CurrentUser`], anonymous when the cookie is
/// missing or no longer valid.
pub async fn resolve_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let user = lookup(&state, req.headers()).await;
    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

/// Middleware that requires a valid session cookie.
///
/// If valid, inserts the `UserSession` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = lookup(&state, req.headers())
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn finds_session_among_other_cookies() {
        let h = headers("theme=dark; session=abc-123; lang=en");
        assert_eq!(session_token(&h), Some("abc-123"));
    }

    #[test]
    fn missing_or_empty_session_cookie() {
        assert_eq!(session_token(&HeaderMap::new()), None);
        assert_eq!(session_token(&headers("theme=dark")), None);
        assert_eq!(session_token(&headers("session=")), None);
    }
}
