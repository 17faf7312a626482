//! crates/callmyshot_core/src/handlers.rs
//!
//! Orchestrates the actions a user can take on shots. Every successful mutation is
//! followed by a full re-fetch of the recent shots; the store is the only source of truth.

use chrono::{DateTime, Utc};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{AuthorSnapshot, CommentDraft, ShotDraft, UserSession};
use crate::feed::{assemble_feed, FeedItem};
use crate::ports::{PortError, ShotStore, DEFAULT_FEED_LIMIT};

/// A failed user action, phrased for the person who triggered it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InteractionError {
    /// The identity provider's message, shown as is.
    #[error("{0}")]
    Auth(String),
    #[error("Content must not be empty.")]
    EmptyContent,
    #[error("This shot no longer exists.")]
    ShotMissing(Uuid),
    #[error("{0}")]
    Persistence(&'static str),
}

impl InteractionError {
    /// Maps a port failure to what the user sees. Store errors are reduced to a
    /// generic message; the cause only goes to the log.
    fn from_port(e: PortError, shot_id: Option<Uuid>, generic: &'static str) -> Self {
        match e {
            PortError::AuthFailure(message) => Self::Auth(message),
            PortError::NotFound(_) => match shot_id {
                Some(id) => Self::ShotMissing(id),
                None => Self::Persistence(generic),
            },
            PortError::Unauthorized => Self::Auth("You need to sign in first.".to_string()),
            PortError::PersistenceFailure(_) => Self::Persistence(generic),
        }
    }
}

pub type InteractionResult<T> = Result<T, InteractionError>;

/// The outcome of a mutation: the id it produced and the refreshed feed.
#[derive(Debug, Clone)]
pub struct Refreshed<T> {
    pub value: T,
    pub feed: Vec<FeedItem>,
}

/// The user actions on shots. Holds no per-user state; the session is always passed in.
#[derive(Clone)]
pub struct ShotInteractions {
    store: Arc<dyn ShotStore>,
    feed_limit: NonZeroUsize,
}

impl ShotInteractions {
    pub fn new(store: Arc<dyn ShotStore>) -> Self {
        Self::with_feed_limit(store, DEFAULT_FEED_LIMIT)
    }

    pub fn with_feed_limit(store: Arc<dyn ShotStore>, feed_limit: NonZeroUsize) -> Self {
        Self { store, feed_limit }
    }

    pub fn feed_limit(&self) -> NonZeroUsize {
        self.feed_limit
    }

    pub async fn load_feed(
        &self,
        session: Option<&UserSession>,
        limit: NonZeroUsize,
    ) -> InteractionResult<Vec<FeedItem>> {
        let shots = self.store.fetch_recent(limit).await.map_err(|e| {
            error!("Error fetching recent shots: {:?}", e);
            InteractionError::from_port(e, None, "Failed to load shots. Please try again.")
        })?;
        Ok(assemble_feed(session, shots))
    }

    /// A single shot as the viewer sees it, or `None` if it does not exist.
    pub async fn view_shot(
        &self,
        session: Option<&UserSession>,
        shot_id: Uuid,
    ) -> InteractionResult<Option<FeedItem>> {
        let shot = self.store.fetch_one(shot_id).await.map_err(|e| {
            error!("Error fetching shot {}: {:?}", shot_id, e);
            InteractionError::from_port(e, None, "Failed to load the shot. Please try again.")
        })?;
        Ok(shot.map(|s| FeedItem::for_viewer(session, s)))
    }

    pub async fn submit_shot(
        &self,
        session: &UserSession,
        content: &str,
        now: DateTime<Utc>,
    ) -> InteractionResult<Refreshed<Uuid>> {
        let content = content.trim();
        if content.is_empty() {
            return Err(InteractionError::EmptyContent);
        }

        let draft = ShotDraft::compose(AuthorSnapshot::from_session(session), content, now);
        let id = self.store.create(draft).await.map_err(|e| {
            error!("Error adding new shot: {:?}", e);
            InteractionError::from_port(e, None, "Failed to post your shot. Please try again.")
        })?;
        info!("User {} called shot {}", session.user_id, id);

        self.refreshed(session, id).await
    }

    /// Likes the shot if the user has not liked it yet, otherwise unlikes it.
    ///
    /// The current state is read first and the opposite write issued afterwards, so two
    /// toggles racing from the same user may both see the same state. The like set itself
    /// never holds the user twice.
    pub async fn toggle_like(
        &self,
        session: &UserSession,
        shot_id: Uuid,
    ) -> InteractionResult<Refreshed<bool>> {
        const GENERIC: &str = "Failed to like the shot. Please try again.";

        let shot = self
            .store
            .fetch_one(shot_id)
            .await
            .map_err(|e| {
                error!("Error liking/unliking shot: {:?}", e);
                InteractionError::from_port(e, Some(shot_id), GENERIC)
            })?
            .ok_or(InteractionError::ShotMissing(shot_id))?;

        let liked = !shot.likes.contains(session.user_id);
        let write = if liked {
            self.store.like(shot_id, session.user_id).await
        } else {
            self.store.unlike(shot_id, session.user_id).await
        };
        write.map_err(|e| {
            error!("Error liking/unliking shot: {:?}", e);
            InteractionError::from_port(e, Some(shot_id), GENERIC)
        })?;

        self.refreshed(session, liked).await
    }

    pub async fn post_comment(
        &self,
        session: &UserSession,
        shot_id: Uuid,
        content: &str,
        now: DateTime<Utc>,
    ) -> InteractionResult<Refreshed<Uuid>> {
        let content = content.trim();
        if content.is_empty() {
            return Err(InteractionError::EmptyContent);
        }

        let draft = CommentDraft::compose(session, content, now);
        let comment_id = self.store.add_comment(shot_id, draft).await.map_err(|e| {
            error!("Error adding comment: {:?}", e);
            InteractionError::from_port(
                e,
                Some(shot_id),
                "Failed to post your comment. Please try again.",
            )
        })?;

        self.refreshed(session, comment_id).await
    }

    async fn refreshed<T>(&self, session: &UserSession, value: T) -> InteractionResult<Refreshed<T>> {
        let feed = self.load_feed(Some(session), self.feed_limit).await?;
        Ok(Refreshed { value, feed })
    }
}

/// Whether a dashboard is currently waiting on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    InFlight,
}

/// The state one signed-in client renders: the feed and the last error message.
///
/// Actions take `&mut self`, so a client handles one action at a time. A failed action
/// leaves the feed exactly as it was and only sets the notice.
pub struct Dashboard {
    interactions: ShotInteractions,
    session: UserSession,
    feed: Vec<FeedItem>,
    notice: Option<String>,
    state: ActionState,
}

impl Dashboard {
    pub fn new(interactions: ShotInteractions, session: UserSession) -> Self {
        Self {
            interactions,
            session,
            feed: Vec::new(),
            notice: None,
            state: ActionState::Idle,
        }
    }

    pub fn feed(&self) -> &[FeedItem] {
        &self.feed
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn session(&self) -> &UserSession {
        &self.session
    }

    pub async fn refresh(&mut self) -> bool {
        self.state = ActionState::InFlight;
        let limit = self.interactions.feed_limit();
        let result = self.interactions.load_feed(Some(&self.session), limit).await;
        self.settle(result)
    }

    pub async fn submit_shot(&mut self, content: &str) -> bool {
        self.state = ActionState::InFlight;
        let result = self
            .interactions
            .submit_shot(&self.session, content, Utc::now())
            .await
            .map(|r| r.feed);
        self.settle(result)
    }

    pub async fn toggle_like(&mut self, shot_id: Uuid) -> bool {
        self.state = ActionState::InFlight;
        let result = self
            .interactions
            .toggle_like(&self.session, shot_id)
            .await
            .map(|r| r.feed);
        self.settle(result)
    }

    pub async fn post_comment(&mut self, shot_id: Uuid, content: &str) -> bool {
        self.state = ActionState::InFlight;
        let result = self
            .interactions
            .post_comment(&self.session, shot_id, content, Utc::now())
            .await
            .map(|r| r.feed);
        self.settle(result)
    }

    fn settle(&mut self, result: InteractionResult<Vec<FeedItem>>) -> bool {
        self.state = ActionState::Idle;
        match result {
            Ok(feed) => {
                self.feed = feed;
                self.notice = None;
                true
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                false
            }
        }
    }
}
