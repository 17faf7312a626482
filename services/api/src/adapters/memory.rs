//! services/api/src/adapters/memory.rs
//!
//! An `IdentityProvider` that keeps accounts and auth sessions in process memory.
//! Used when no database is configured and by the HTTP tests.

use async_trait::async_trait;
use callmyshot_core::domain::UserSession;
use callmyshot_core::ports::{
    AuthenticatedSession, Credentials, IdentityProvider, PortError, PortResult, Registration,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::password::{
    hash_password, normalize_email, validate_registration, verify_password, EMAIL_TAKEN,
    INVALID_CREDENTIALS,
};

struct Account {
    user: UserSession,
    hashed_password: String,
}

struct AuthSessionEntry {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

pub struct MemoryIdentityProvider {
    /// Keyed by normalized email.
    accounts: RwLock<HashMap<String, Account>>,
    sessions: RwLock<HashMap<String, AuthSessionEntry>>,
    session_ttl: Duration,
}

impl MemoryIdentityProvider {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            session_ttl,
        }
    }

    async fn open_auth_session(&self, user: UserSession) -> AuthenticatedSession {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(
            token.clone(),
            AuthSessionEntry {
                user_id: user.user_id,
                expires_at,
            },
        );
        AuthenticatedSession {
            token,
            user,
            expires_at,
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, registration: Registration) -> PortResult<AuthenticatedSession> {
        validate_registration(&registration)?;
        let email = normalize_email(&registration.email);
        let hashed_password = hash_password(&registration.password)?;

        let user = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                return Err(PortError::AuthFailure(EMAIL_TAKEN.to_string()));
            }
            let user = UserSession {
                user_id: Uuid::new_v4(),
                display_name: registration.display_name,
                avatar_url: registration.avatar_url,
                email: email.clone(),
            };
            accounts.insert(
                email,
                Account {
                    user: user.clone(),
                    hashed_password,
                },
            );
            user
        };

        Ok(self.open_auth_session(user).await)
    }

    async fn sign_in(&self, credentials: Credentials) -> PortResult<AuthenticatedSession> {
        let user = {
            let accounts = self.accounts.read().await;
            let account = accounts
                .get(&normalize_email(&credentials.email))
                .ok_or_else(|| PortError::AuthFailure(INVALID_CREDENTIALS.to_string()))?;
            if !verify_password(&credentials.password, &account.hashed_password) {
                return Err(PortError::AuthFailure(INVALID_CREDENTIALS.to_string()));
            }
            account.user.clone()
        };

        Ok(self.open_auth_session(user).await)
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    async fn resolve(&self, token: &str) -> PortResult<Option<UserSession>> {
        let user_id = match self.sessions.read().await.get(token) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.user_id),
            Some(_) => None,
            None => return Ok(None),
        };
        let Some(user_id) = user_id else {
            self.sessions.write().await.remove(token);
            return Ok(None);
        };

        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.user.user_id == user_id)
            .map(|a| a.user.clone()))
    }
}
