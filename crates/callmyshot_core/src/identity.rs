//! crates/callmyshot_core/src/identity.rs
//!
//! Tracks the signed-in user of one client and tells subscribers whenever it changes.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::domain::UserSession;
use crate::ports::{Credentials, IdentityProvider, PortResult};

type Listener = Arc<dyn Fn(Option<&UserSession>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    registered: BTreeMap<u64, Listener>,
}

/// Handle returned by [`IdentitySession::on_change`].
///
/// Dropping it keeps the listener registered; call [`Subscription::unsubscribe`] to stop
/// receiving notifications. Unsubscribing more than once is harmless.
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut listeners) = listeners.lock() {
                listeners.registered.remove(&self.id);
            }
        }
    }
}

struct ActiveSession {
    token: String,
    user: UserSession,
}

/// The identity of the active client, if any.
pub struct IdentitySession {
    provider: Arc<dyn IdentityProvider>,
    current: RwLock<Option<ActiveSession>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl IdentitySession {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Resolves a previously issued token at startup and notifies every listener once,
    /// with the restored session or with none. A token that cannot be resolved starts the
    /// client signed out.
    pub async fn start(&self, token: Option<&str>) -> PortResult<Option<UserSession>> {
        let restored = match token {
            Some(token) => match self.provider.resolve(token).await {
                Ok(user) => user.map(|user| ActiveSession {
                    token: token.to_string(),
                    user,
                }),
                Err(e) => {
                    error!("Failed to restore session: {:?}", e);
                    None
                }
            },
            None => None,
        };

        let user = restored.as_ref().map(|s| s.user.clone());
        *self.current.write().await = restored;
        self.notify(user.as_ref());
        Ok(user)
    }

    /// Runs the provider's sign-in flow. A failure carries the provider's message and
    /// leaves the current state untouched.
    pub async fn sign_in(&self, credentials: Credentials) -> PortResult<UserSession> {
        let session = self.provider.sign_in(credentials).await.map_err(|e| {
            error!("Sign-in failed: {:?}", e);
            e
        })?;
        let user = session.user.clone();
        *self.current.write().await = Some(ActiveSession {
            token: session.token,
            user: session.user,
        });
        info!("Signed in user {}", user.user_id);
        self.notify(Some(&user));
        Ok(user)
    }

    /// Ends the current session. If the provider cannot be reached the session is kept
    /// and no notification is sent.
    pub async fn sign_out(&self) -> PortResult<()> {
        let token = match self.current.read().await.as_ref() {
            Some(session) => session.token.clone(),
            None => return Ok(()),
        };

        self.provider.sign_out(&token).await.map_err(|e| {
            error!("Sign-out failed: {:?}", e);
            e
        })?;
        *self.current.write().await = None;
        info!("Signed out");
        self.notify(None);
        Ok(())
    }

    pub async fn current(&self) -> Option<UserSession> {
        self.current.read().await.as_ref().map(|s| s.user.clone())
    }

    /// The provider token of the current session, for clients that need to present it.
    pub async fn token(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.token.clone())
    }

    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&UserSession>) + Send + Sync + 'static,
    {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.registered.insert(id, Arc::new(listener));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    fn notify(&self, user: Option<&UserSession>) {
        // Listeners run outside the lock so they may unsubscribe themselves.
        let snapshot: Vec<Listener> = match self.listeners.lock() {
            Ok(listeners) => listeners.registered.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().registered.values().cloned().collect(),
        };
        for listener in snapshot {
            listener(user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{AuthenticatedSession, PortError, Registration};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use uuid::Uuid;

    struct FakeProvider {
        user: UserSession,
        reachable: AtomicBool,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                user: UserSession {
                    user_id: Uuid::new_v4(),
                    display_name: Some("Linus".to_string()),
                    avatar_url: None,
                    email: "linus@example.com".to_string(),
                },
                reachable: AtomicBool::new(true),
            }
        }

        fn authenticated(&self) -> AuthenticatedSession {
            AuthenticatedSession {
                token: "tok-1".to_string(),
                user: self.user.clone(),
                expires_at: Utc::now() + Duration::days(30),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn sign_up(&self, _registration: Registration) -> PortResult<AuthenticatedSession> {
            Ok(self.authenticated())
        }

        async fn sign_in(&self, credentials: Credentials) -> PortResult<AuthenticatedSession> {
            if credentials.password == "secret" {
                Ok(self.authenticated())
            } else {
                Err(PortError::AuthFailure("Invalid email or password".to_string()))
            }
        }

        async fn sign_out(&self, _token: &str) -> PortResult<()> {
            if self.reachable.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(PortError::AuthFailure("Identity provider unreachable".to_string()))
            }
        }

        async fn resolve(&self, token: &str) -> PortResult<Option<UserSession>> {
            if !self.reachable.load(Ordering::SeqCst) {
                return Err(PortError::PersistenceFailure("down".to_string()));
            }
            Ok((token == "tok-1").then(|| self.user.clone()))
        }
    }

    fn credentials(password: &str) -> Credentials {
        Credentials {
            email: "linus@example.com".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn start_notifies_once_with_restored_session() {
        let provider = Arc::new(FakeProvider::new());
        let identity = IdentitySession::new(provider.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = identity.on_change({
            let seen = seen.clone();
            move |user| seen.lock().unwrap().push(user.map(|u| u.user_id))
        });

        let restored = identity.start(Some("tok-1")).await.unwrap();

        assert_eq!(restored.as_ref(), Some(&provider.user));
        assert_eq!(*seen.lock().unwrap(), vec![Some(provider.user.user_id)]);
    }

    #[tokio::test]
    async fn start_without_token_notifies_none() {
        let identity = IdentitySession::new(Arc::new(FakeProvider::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = identity.on_change({
            let seen = seen.clone();
            move |user| seen.lock().unwrap().push(user.is_some())
        });

        assert_eq!(identity.start(None).await.unwrap(), None);
        assert_eq!(*seen.lock().unwrap(), vec![false]);
    }

    #[tokio::test]
    async fn start_with_unreachable_provider_notifies_signed_out() {
        let provider = Arc::new(FakeProvider::new());
        provider.reachable.store(false, Ordering::SeqCst);
        let identity = IdentitySession::new(provider);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = identity.on_change({
            let seen = seen.clone();
            move |user| seen.lock().unwrap().push(user.is_some())
        });

        assert_eq!(identity.start(Some("tok-1")).await, Ok(None));
        assert_eq!(*seen.lock().unwrap(), vec![false]);
        assert_eq!(identity.current().await, None);
    }

    #[tokio::test]
    async fn sign_in_failure_surfaces_message_and_keeps_state() {
        let identity = IdentitySession::new(Arc::new(FakeProvider::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let _sub = identity.on_change({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        let err = identity.sign_in(credentials("wrong")).await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(identity.current().await, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn every_listener_is_notified_independently() {
        let identity = IdentitySession::new(Arc::new(FakeProvider::new()));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let _a = identity.on_change({
            let first = first.clone();
            move |_| {
                first.fetch_add(1, Ordering::SeqCst);
            }
        });
        let _b = identity.on_change({
            let second = second.clone();
            move |_| {
                second.fetch_add(1, Ordering::SeqCst);
            }
        });

        identity.sign_in(credentials("secret")).await.unwrap();
        identity.sign_out().await.unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert_eq!(identity.current().await, None);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let identity = IdentitySession::new(Arc::new(FakeProvider::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let sub = identity.on_change({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        let other = identity.on_change(|_| {});

        sub.unsubscribe();
        sub.unsubscribe();
        identity.sign_in(credentials("secret")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        other.unsubscribe();
    }

    #[tokio::test]
    async fn sign_out_failure_keeps_session() {
        let provider = Arc::new(FakeProvider::new());
        let identity = IdentitySession::new(provider.clone());
        identity.sign_in(credentials("secret")).await.unwrap();
        provider.reachable.store(false, Ordering::SeqCst);

        let err = identity.sign_out().await.unwrap_err();

        assert!(matches!(err, PortError::AuthFailure(_)));
        assert_eq!(identity.current().await, Some(provider.user.clone()));
        assert_eq!(identity.token().await.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn sign_out_without_session_is_a_no_op() {
        let provider = Arc::new(FakeProvider::new());
        provider.reachable.store(false, Ordering::SeqCst);
        let identity = IdentitySession::new(provider);
        assert!(identity.sign_out().await.is_ok());
    }
}
