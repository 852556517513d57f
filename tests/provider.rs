//! Integration tests for the async provider wrapper.
//!
//! The provider dispatches engine calls onto `spawn_blocking`; these tests
//! verify the async surface preserves the engine's semantics, including
//! per-user serialization under concurrent tasks.

use std::sync::Arc;

use questline::provider::{ProgressProvider, QuestlineProvider};
use questline::{CollegeId, Config, MentorId, NewSession, Questline, Timestamp, UserId, XpReason};
use tempfile::tempdir;

fn open_provider() -> (QuestlineProvider, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let engine = Arc::new(Questline::open(&path, Config::default()).unwrap());
    (QuestlineProvider::new(engine), dir)
}

fn view_reason() -> XpReason {
    XpReason::CollegeViewed {
        college_id: CollegeId::new(1),
    }
}

#[tokio::test]
async fn test_register_and_apply_delta() {
    let (provider, _dir) = open_provider();
    let user = UserId::new("user-1");

    let progress = provider.register_user(user.clone()).await.unwrap();
    assert_eq!(progress.xp, 0);
    assert_eq!(progress.level, 1);

    let outcome = provider
        .apply_xp_delta(user.clone(), 105, view_reason())
        .await
        .unwrap();
    assert_eq!(outcome.new_level, 2);
    assert!(outcome.leveled_up);

    let progress = provider.progress(user).await.unwrap();
    assert_eq!(progress.xp, 105);
}

#[tokio::test]
async fn test_mission_toggle_through_provider() {
    let (provider, _dir) = open_provider();
    let user = UserId::new("user-1");
    provider.register_user(user.clone()).await.unwrap();

    let missions = provider.missions(user.clone()).await.unwrap();
    assert!(!missions.is_empty());

    let toggle = provider
        .toggle_mission(missions[0].id, user.clone(), true)
        .await
        .unwrap();
    assert_eq!(toggle.xp_change, i64::from(missions[0].xp_reward));

    let toggle = provider
        .toggle_mission(missions[0].id, user.clone(), false)
        .await
        .unwrap();
    assert_eq!(provider.progress(user).await.unwrap().xp, 0);
    assert_eq!(toggle.outcome.new_xp, 0);
}

#[tokio::test]
async fn test_book_and_cancel_keeps_xp() {
    let (provider, _dir) = open_provider();
    let user = UserId::new("user-1");
    provider.register_user(user.clone()).await.unwrap();

    let (session_id, outcome) = provider
        .book_session(NewSession {
            user_id: user.clone(),
            mentor_id: MentorId::new(3),
            scheduled_for: Timestamp::from_millis(2_000_000_000_000),
        })
        .await
        .unwrap();
    assert_eq!(outcome.new_xp, 15);

    provider
        .cancel_session(session_id, user.clone())
        .await
        .unwrap();
    assert_eq!(provider.progress(user).await.unwrap().xp, 15);
}

#[tokio::test]
async fn test_not_found_propagates_through_provider() {
    let (provider, _dir) = open_provider();
    let err = provider.progress(UserId::new("ghost")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_compose_exactly() {
    let (provider, _dir) = open_provider();
    let user = UserId::new("user-1");
    provider.register_user(user.clone()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20u64 {
        let provider = provider.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            provider.view_college(user, CollegeId::new(i + 1)).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let progress = provider.progress(user.clone()).await.unwrap();
    assert_eq!(progress.xp, 100);
    assert_eq!(progress.level, 2);

    let recent = provider.recently_viewed(user, 5).await.unwrap();
    assert_eq!(recent.len(), 5);
}

#[tokio::test]
async fn test_leaderboard_through_provider() {
    let (provider, _dir) = open_provider();

    for (name, deltas) in [("alice", 3i64), ("bob", 7)] {
        let user = UserId::new(name);
        provider.register_user(user.clone()).await.unwrap();
        provider
            .apply_xp_delta(user, deltas * 10, view_reason())
            .await
            .unwrap();
    }

    let top = provider.leaderboard(10).await.unwrap();
    assert_eq!(top[0].user_id.as_str(), "bob");
    assert_eq!(top[1].user_id.as_str(), "alice");
}
