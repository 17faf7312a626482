//! crates/callmyshot_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the identity provider and the document store behind it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::num::NonZeroUsize;
use uuid::Uuid;

use crate::domain::{CommentDraft, Shot, ShotDraft, UserSession};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The identity provider rejected or interrupted the flow. The message is meant for the user.
    #[error("{0}")]
    AuthFailure(String),
    /// A store operation failed. The message is for logs, not for the user.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Number of shots in a feed page when the caller does not ask for a size.
pub const DEFAULT_FEED_LIMIT: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(limit) => limit,
    None => unreachable!(),
};

//=========================================================================================
// Identity Types
//=========================================================================================

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A session established with the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub token: String,
    pub user: UserSession,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates an account and signs it in.
    async fn sign_up(&self, registration: Registration) -> PortResult<AuthenticatedSession>;

    async fn sign_in(&self, credentials: Credentials) -> PortResult<AuthenticatedSession>;

    /// Ends the auth session behind `token`. Unknown tokens are a no-op.
    async fn sign_out(&self, token: &str) -> PortResult<()>;

    /// Looks up the user behind `token`. Unknown or expired tokens resolve to `None`.
    async fn resolve(&self, token: &str) -> PortResult<Option<UserSession>>;
}

#[async_trait]
pub trait ShotStore: Send + Sync {
    /// Persists a new shot with no likes and no comments and returns its id.
    async fn create(&self, draft: ShotDraft) -> PortResult<Uuid>;

    /// The most recent shots, newest first.
    async fn fetch_recent(&self, limit: NonZeroUsize) -> PortResult<Vec<Shot>>;

    async fn fetch_one(&self, id: Uuid) -> PortResult<Option<Shot>>;

    /// Adds `user_id` to the likes of a shot. Liking twice is a no-op.
    async fn like(&self, id: Uuid, user_id: Uuid) -> PortResult<()>;

    /// Removes `user_id` from the likes of a shot. Unliking twice is a no-op.
    async fn unlike(&self, id: Uuid, user_id: Uuid) -> PortResult<()>;

    /// Appends a comment to the end of a shot's thread and returns the comment id.
    async fn add_comment(&self, id: Uuid, draft: CommentDraft) -> PortResult<Uuid>;
}
