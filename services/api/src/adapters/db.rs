//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the Postgres implementation of the
//! `ShotStore` and `IdentityProvider` ports from the `core` crate. It handles all
//! interactions with the database using `sqlx`.
//!
//! Likes live in a `UUID[]` column and comments in a `JSONB` array. Every like, unlike
//! and comment is a single `UPDATE` statement, so Postgres applies each one atomically
//! against the current row.

use async_trait::async_trait;
use callmyshot_core::domain::{
    AuthorSnapshot, Comment, CommentDraft, CommentThread, Shot, ShotDraft, UserSession,
};
use callmyshot_core::ports::{
    AuthenticatedSession, Credentials, IdentityProvider, PortError, PortResult, Registration,
    ShotStore,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::num::NonZeroUsize;
use tracing::error;
use uuid::Uuid;

use super::password::{
    hash_password, normalize_email, validate_registration, verify_password, EMAIL_TAKEN,
    INVALID_CREDENTIALS,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ShotStore` and `IdentityProvider` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    session_ttl: Duration,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn open_auth_session(&self, user: UserSession) -> PortResult<AuthenticatedSession> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_ttl;

        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(user.user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to create auth session: {:?}", e);
                PortError::AuthFailure("Failed to sign in. Please try again.".to_string())
            })?;

        Ok(AuthenticatedSession {
            token,
            user,
            expires_at,
        })
    }
}

fn persistence(e: sqlx::Error) -> PortError {
    PortError::PersistenceFailure(e.to_string())
}

fn shot_not_found(id: Uuid) -> PortError {
    PortError::NotFound(format!("Shot {} not found", id))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> UserSession {
        UserSession {
            user_id: self.user_id,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
}

/// The JSON shape of one element of `shots.comments`.
#[derive(Serialize, Deserialize)]
struct CommentRecord {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    content: String,
    timestamp: DateTime<Utc>,
}
impl CommentRecord {
    fn from_domain(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            user_id: comment.user_id,
            user_name: comment.user_name.clone(),
            content: comment.content.clone(),
            timestamp: comment.timestamp,
        }
    }

    fn to_domain(self) -> Comment {
        Comment {
            id: self.id,
            user_id: self.user_id,
            user_name: self.user_name,
            content: self.content,
            timestamp: self.timestamp,
        }
    }
}

#[derive(FromRow)]
struct ShotRecord {
    id: Uuid,
    author_id: Uuid,
    author_name: String,
    author_handle: String,
    author_avatar: String,
    content: String,
    created_at: DateTime<Utc>,
    date_called: NaiveDate,
    deadline: NaiveDate,
    likes: Vec<Uuid>,
    comments: Json<Vec<CommentRecord>>,
}
impl ShotRecord {
    fn to_domain(self) -> Shot {
        Shot {
            id: self.id,
            author: AuthorSnapshot {
                user_id: self.author_id,
                name: self.author_name,
                handle: self.author_handle,
                avatar: self.author_avatar,
            },
            content: self.content,
            timestamp: self.created_at,
            date_called: self.date_called,
            deadline: self.deadline,
            comments: CommentThread::from_stored(
                self.comments.0.into_iter().map(CommentRecord::to_domain).collect(),
            ),
            likes: self.likes.into_iter().collect(),
        }
    }
}

const SHOT_COLUMNS: &str = "id, author_id, author_name, author_handle, author_avatar, content, \
     created_at, date_called, deadline, likes, comments";

//=========================================================================================
// `ShotStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ShotStore for DbAdapter {
    async fn create(&self, draft: ShotDraft) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        // likes and comments fall back to their empty column defaults.
        sqlx::query(
            "INSERT INTO shots (id, author_id, author_name, author_handle, author_avatar, content, created_at, date_called, deadline)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id)
        .bind(draft.author.user_id)
        .bind(&draft.author.name)
        .bind(&draft.author.handle)
        .bind(&draft.author.avatar)
        .bind(&draft.content)
        .bind(draft.timestamp)
        .bind(draft.date_called)
        .bind(draft.deadline)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(id)
    }

    async fn fetch_recent(&self, limit: NonZeroUsize) -> PortResult<Vec<Shot>> {
        let limit = i64::try_from(limit.get()).unwrap_or(i64::MAX);
        let records = sqlx::query_as::<_, ShotRecord>(&format!(
            "SELECT {SHOT_COLUMNS} FROM shots ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn fetch_one(&self, id: Uuid) -> PortResult<Option<Shot>> {
        let record = sqlx::query_as::<_, ShotRecord>(&format!(
            "SELECT {SHOT_COLUMNS} FROM shots WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn like(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE shots
             SET likes = CASE WHEN $2 = ANY(likes) THEN likes ELSE array_append(likes, $2) END
             WHERE id = $1",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        if result.rows_affected() == 0 {
            return Err(shot_not_found(id));
        }
        Ok(())
    }

    async fn unlike(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("UPDATE shots SET likes = array_remove(likes, $2) WHERE id = $1")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;

        if result.rows_affected() == 0 {
            return Err(shot_not_found(id));
        }
        Ok(())
    }

    async fn add_comment(&self, id: Uuid, draft: CommentDraft) -> PortResult<Uuid> {
        let comment = draft.into_comment(Uuid::now_v7());
        let result = sqlx::query(
            "UPDATE shots SET comments = comments || jsonb_build_array($2::jsonb) WHERE id = $1",
        )
        .bind(id)
        .bind(Json(CommentRecord::from_domain(&comment)))
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        if result.rows_affected() == 0 {
            return Err(shot_not_found(id));
        }
        Ok(comment.id)
    }
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for DbAdapter {
    async fn sign_up(&self, registration: Registration) -> PortResult<AuthenticatedSession> {
        validate_registration(&registration)?;
        let hashed_password = hash_password(&registration.password)?;

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password, display_name, avatar_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING user_id, email, display_name, avatar_url",
        )
        .bind(Uuid::new_v4())
        .bind(normalize_email(&registration.email))
        .bind(hashed_password)
        .bind(registration.display_name)
        .bind(registration.avatar_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::AuthFailure(EMAIL_TAKEN.to_string())
            }
            _ => {
                error!("Failed to create user: {:?}", e);
                PortError::AuthFailure("Failed to create the account. Please try again.".to_string())
            }
        })?;

        self.open_auth_session(record.to_domain()).await
    }

    async fn sign_in(&self, credentials: Credentials) -> PortResult<AuthenticatedSession> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password, display_name, avatar_url FROM users WHERE email = $1",
        )
        .bind(normalize_email(&credentials.email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get user: {:?}", e);
            PortError::AuthFailure("Failed to sign in. Please try again.".to_string())
        })?
        .ok_or_else(|| PortError::AuthFailure(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&credentials.password, &record.hashed_password) {
            return Err(PortError::AuthFailure(INVALID_CREDENTIALS.to_string()));
        }

        self.open_auth_session(UserSession {
            user_id: record.user_id,
            display_name: record.display_name,
            avatar_url: record.avatar_url,
            email: record.email,
        })
        .await
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete auth session: {:?}", e);
                PortError::AuthFailure("Failed to sign out. Please try again.".to_string())
            })?;
        Ok(())
    }

    async fn resolve(&self, token: &str) -> PortResult<Option<UserSession>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.user_id, u.email, u.display_name, u.avatar_url
             FROM auth_sessions s JOIN users u ON u.user_id = s.user_id
             WHERE s.id = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(record.map(|r| r.to_domain()))
    }
}
