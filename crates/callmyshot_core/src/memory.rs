//! crates/callmyshot_core/src/memory.rs
//!
//! An in-process `ShotStore`. Every mutation runs under a single write lock, so
//! adding or removing a like and appending a comment are atomic, exactly like the
//! single-statement updates of the database adapter.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::num::NonZeroUsize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{CommentDraft, Shot, ShotDraft};
use crate::ports::{PortError, PortResult, ShotStore};

/// Shots kept in insertion order.
#[derive(Default)]
pub struct MemoryShotStore {
    shots: RwLock<Vec<Shot>>,
}

impl MemoryShotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `f` to the shot with the given id while holding the write lock.
    async fn mutate<T>(&self, id: Uuid, f: impl FnOnce(&mut Shot) -> T) -> PortResult<T> {
        let mut shots = self.shots.write().await;
        let shot = shots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Shot {} not found", id)))?;
        Ok(f(shot))
    }
}

#[async_trait]
impl ShotStore for MemoryShotStore {
    async fn create(&self, draft: ShotDraft) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        self.shots.write().await.push(Shot::from_draft(id, draft));
        Ok(id)
    }

    async fn fetch_recent(&self, limit: NonZeroUsize) -> PortResult<Vec<Shot>> {
        let shots = self.shots.read().await;
        let mut recent: Vec<Shot> = shots.clone();
        // Stable sort: equal timestamps keep their insertion order.
        recent.sort_by_key(|s| Reverse(s.timestamp));
        recent.truncate(limit.get());
        Ok(recent)
    }

    async fn fetch_one(&self, id: Uuid) -> PortResult<Option<Shot>> {
        let shots = self.shots.read().await;
        Ok(shots.iter().find(|s| s.id == id).cloned())
    }

    async fn like(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        self.mutate(id, |shot| {
            shot.likes.insert(user_id);
        })
        .await
    }

    async fn unlike(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        self.mutate(id, |shot| {
            shot.likes.remove(user_id);
        })
        .await
    }

    async fn add_comment(&self, id: Uuid, draft: CommentDraft) -> PortResult<Uuid> {
        let comment_id = Uuid::now_v7();
        self.mutate(id, |shot| shot.comments.append(draft.into_comment(comment_id)))
            .await?;
        Ok(comment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthorSnapshot, Likes, UserSession};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn author() -> UserSession {
        UserSession {
            user_id: Uuid::new_v4(),
            display_name: Some("Grace".to_string()),
            avatar_url: None,
            email: "grace@example.com".to_string(),
        }
    }

    fn draft_at(content: &str, at: chrono::DateTime<Utc>) -> ShotDraft {
        ShotDraft::compose(AuthorSnapshot::from_session(&author()), content, at)
    }

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    async fn created_shot_starts_with_no_likes_or_comments() {
        let store = MemoryShotStore::new();
        let id = store.create(draft_at("first", Utc::now())).await.unwrap();

        let shot = store.fetch_one(id).await.unwrap().unwrap();
        assert_eq!(shot.likes, Likes::new());
        assert!(shot.comments.is_empty());
        assert_eq!(shot.content, "first");
    }

    #[tokio::test]
    async fn stored_shot_keeps_thirty_day_deadline() {
        let store = MemoryShotStore::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let id = store
            .create(draft_at("I will ship v2 by March", now))
            .await
            .unwrap();

        let shot = store.fetch_one(id).await.unwrap().unwrap();
        assert_eq!(shot.date_called, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(shot.deadline, NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());
    }

    #[tokio::test]
    async fn fetch_recent_returns_newest_first() {
        let store = MemoryShotStore::new();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        // Insert out of order to make sure ordering comes from the timestamp.
        for i in [3, 1, 5, 2, 4] {
            store
                .create(draft_at(&format!("T{i}"), base + Duration::minutes(i)))
                .await
                .unwrap();
        }

        let recent = store.fetch_recent(limit(3)).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, vec!["T5", "T4", "T3"]);
    }

    #[tokio::test]
    async fn fetch_recent_tolerates_short_and_empty_stores() {
        let store = MemoryShotStore::new();
        assert!(store.fetch_recent(limit(10)).await.unwrap().is_empty());

        store.create(draft_at("only", Utc::now())).await.unwrap();
        assert_eq!(store.fetch_recent(limit(10)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn equal_timestamps_are_all_returned() {
        let store = MemoryShotStore::new();
        let at = Utc::now();
        let a = store.create(draft_at("a", at)).await.unwrap();
        let b = store.create(draft_at("b", at)).await.unwrap();

        let mut ids: Vec<Uuid> = store
            .fetch_recent(limit(5))
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn fetch_one_on_missing_id_is_absent() {
        let store = MemoryShotStore::new();
        assert_eq!(store.fetch_one(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn like_is_idempotent_and_unlike_restores() {
        let store = MemoryShotStore::new();
        let id = store.create(draft_at("x", Utc::now())).await.unwrap();
        let other = Uuid::new_v4();
        let user = Uuid::new_v4();
        store.like(id, other).await.unwrap();
        let before = store.fetch_one(id).await.unwrap().unwrap().likes;

        store.like(id, user).await.unwrap();
        store.like(id, user).await.unwrap();
        let liked = store.fetch_one(id).await.unwrap().unwrap().likes;
        assert_eq!(liked.len(), 2);
        assert!(liked.contains(user));

        store.unlike(id, user).await.unwrap();
        store.unlike(id, user).await.unwrap();
        let after = store.fetch_one(id).await.unwrap().unwrap().likes;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn like_on_missing_shot_is_not_found() {
        let store = MemoryShotStore::new();
        let err = store.like(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_likes_from_one_user_count_once() {
        let store = Arc::new(MemoryShotStore::new());
        let id = store.create(draft_at("race", Utc::now())).await.unwrap();
        let user = Uuid::new_v4();

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.like(id, user).await }
        });
        let second = tokio::spawn({
            let store = store.clone();
            async move { store.like(id, user).await }
        });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let likes = store.fetch_one(id).await.unwrap().unwrap().likes;
        assert_eq!(likes.iter().collect::<Vec<_>>(), vec![user]);
    }

    #[tokio::test]
    async fn comments_are_appended_in_order() {
        let store = MemoryShotStore::new();
        let id = store.create(draft_at("x", Utc::now())).await.unwrap();
        let commenter = author();

        let c1 = store
            .add_comment(id, CommentDraft::compose(&commenter, "C1", Utc::now()))
            .await
            .unwrap();
        let c2 = store
            .add_comment(id, CommentDraft::compose(&commenter, "C2", Utc::now()))
            .await
            .unwrap();
        assert_ne!(c1, c2);

        let shot = store.fetch_one(id).await.unwrap().unwrap();
        let thread: Vec<(Uuid, &str)> = shot
            .comments
            .iter()
            .map(|c| (c.id, c.content.as_str()))
            .collect();
        assert_eq!(thread, vec![(c1, "C1"), (c2, "C2")]);
    }
}
