//! crates/callmyshot_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Number of days between the date a shot is called and its deadline.
pub const DEADLINE_DAYS: u64 = 30;

pub const ANONYMOUS_NAME: &str = "Anonymous";
pub const PLACEHOLDER_AVATAR: &str = "/placeholder.svg?height=40&width=40";

/// The currently authenticated identity of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: String,
}

/// The author of a shot, frozen at the moment the shot was composed.
///
/// Later profile edits never reach back into shots that already exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSnapshot {
    pub user_id: Uuid,
    pub name: String,
    pub handle: String,
    pub avatar: String,
}

impl AuthorSnapshot {
    pub fn from_session(session: &UserSession) -> Self {
        let name = session
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS_NAME)
            .to_string();
        let avatar = session
            .avatar_url
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER_AVATAR.to_string());

        Self {
            user_id: session.user_id,
            name,
            handle: handle_for(session.user_id),
            avatar,
        }
    }
}

/// `@` followed by the first eight characters of the user id.
pub fn handle_for(user_id: Uuid) -> String {
    let id = user_id.simple().to_string();
    format!("@{}", &id[..8])
}

/// The set of users who liked a shot. Each user appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Likes(BTreeSet<Uuid>);

impl Likes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.0.contains(&user_id)
    }

    /// Returns `false` when the user was already present.
    pub fn insert(&mut self, user_id: Uuid) -> bool {
        self.0.insert(user_id)
    }

    /// Returns `false` when the user was not present.
    pub fn remove(&mut self, user_id: Uuid) -> bool {
        self.0.remove(&user_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Uuid> for Likes {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A single comment on a shot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The comments of a shot, in the order they were posted.
///
/// Comments can only be appended; there is no way to reorder or remove one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentThread(Vec<Comment>);

impl CommentThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a thread from comments already persisted in order.
    pub fn from_stored(comments: Vec<Comment>) -> Self {
        Self(comments)
    }

    pub fn append(&mut self, comment: Comment) {
        self.0.push(comment);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Comment> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Comment] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a CommentThread {
    type Item = &'a Comment;
    type IntoIter = std::slice::Iter<'a, Comment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A user-authored prediction with a call date and a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shot {
    pub id: Uuid,
    pub author: AuthorSnapshot,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub date_called: NaiveDate,
    pub deadline: NaiveDate,
    pub comments: CommentThread,
    pub likes: Likes,
}

impl Shot {
    /// Materializes a freshly created shot. Likes and comments always start empty.
    pub fn from_draft(id: Uuid, draft: ShotDraft) -> Self {
        Self {
            id,
            author: draft.author,
            content: draft.content,
            timestamp: draft.timestamp,
            date_called: draft.date_called,
            deadline: draft.deadline,
            comments: CommentThread::new(),
            likes: Likes::new(),
        }
    }
}

/// A shot that has not been stored yet. It carries no id, likes or comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotDraft {
    pub author: AuthorSnapshot,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub date_called: NaiveDate,
    pub deadline: NaiveDate,
}

impl ShotDraft {
    /// Composes a draft called at `now`, due `DEADLINE_DAYS` later.
    pub fn compose(author: AuthorSnapshot, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        let date_called = now.date_naive();
        let deadline = date_called
            .checked_add_days(Days::new(DEADLINE_DAYS))
            .unwrap_or(NaiveDate::MAX);

        Self {
            author,
            content: content.into(),
            timestamp: now,
            date_called,
            deadline,
        }
    }
}

/// A comment that has not been appended yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub user_id: Uuid,
    pub user_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl CommentDraft {
    pub fn compose(session: &UserSession, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: session.user_id,
            user_name: AuthorSnapshot::from_session(session).name,
            content: content.into(),
            timestamp: now,
        }
    }

    pub fn into_comment(self, id: Uuid) -> Comment {
        Comment {
            id,
            user_id: self.user_id,
            user_name: self.user_name,
            content: self.content,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn session(display_name: Option<&str>, avatar_url: Option<&str>) -> UserSession {
        UserSession {
            user_id: Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000001").unwrap(),
            display_name: display_name.map(String::from),
            avatar_url: avatar_url.map(String::from),
            email: "caller@example.com".to_string(),
        }
    }

    #[test]
    fn snapshot_falls_back_to_anonymous_and_placeholder() {
        let author = AuthorSnapshot::from_session(&session(None, None));
        assert_eq!(author.name, "Anonymous");
        assert_eq!(author.avatar, PLACEHOLDER_AVATAR);
        assert_eq!(author.handle, "@a1b2c3d4");
    }

    #[test]
    fn snapshot_copies_profile_fields() {
        let author =
            AuthorSnapshot::from_session(&session(Some("Ada"), Some("https://img/ada.png")));
        assert_eq!(author.name, "Ada");
        assert_eq!(author.avatar, "https://img/ada.png");
    }

    #[test]
    fn draft_deadline_is_thirty_days_after_call_date() {
        let now = Utc.with_ymd_and_hms(2024, 2, 10, 23, 30, 0).unwrap();
        let author = AuthorSnapshot::from_session(&session(Some("Ada"), None));
        let draft = ShotDraft::compose(author, "I will ship v2 by March", now);

        assert_eq!(draft.date_called, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        assert_eq!(draft.deadline, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert!(draft.deadline > draft.date_called);
    }

    #[test]
    fn likes_hold_each_user_once() {
        let user = Uuid::new_v4();
        let mut likes = Likes::new();
        assert!(likes.insert(user));
        assert!(!likes.insert(user));
        assert_eq!(likes.len(), 1);

        let collected: Likes = [user, user, Uuid::new_v4()].into_iter().collect();
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn shot_from_draft_starts_without_social_state() {
        let now = Utc::now();
        let draft = ShotDraft::compose(AuthorSnapshot::from_session(&session(None, None)), "x", now);
        let shot = Shot::from_draft(Uuid::new_v4(), draft);
        assert!(shot.likes.is_empty());
        assert!(shot.comments.is_empty());
    }
}
