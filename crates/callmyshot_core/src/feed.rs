//! crates/callmyshot_core/src/feed.rs
//!
//! Combines a page of shots with the viewer's session into renderable feed items.

use crate::domain::{Shot, UserSession};

/// A shot together with the state derived for the current viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub shot: Shot,
    pub liked_by_current_user: bool,
    pub like_count: usize,
    pub comment_count: usize,
}

impl FeedItem {
    pub fn for_viewer(session: Option<&UserSession>, shot: Shot) -> Self {
        let liked_by_current_user = session.is_some_and(|s| shot.likes.contains(s.user_id));
        Self {
            liked_by_current_user,
            like_count: shot.likes.len(),
            comment_count: shot.comments.len(),
            shot,
        }
    }
}

/// Builds the feed in the order the shots were given. Without a session nothing is liked.
pub fn assemble_feed(session: Option<&UserSession>, shots: Vec<Shot>) -> Vec<FeedItem> {
    shots
        .into_iter()
        .map(|shot| FeedItem::for_viewer(session, shot))
        .collect()
}
