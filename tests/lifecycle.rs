//! ACID and crash recovery integration tests for Questline.
//!
//! These tests verify that the storage layer provides the expected
//! durability and atomicity guarantees at the Questline level.
//!
//! # Crash Simulation
//!
//! We simulate a crash by dropping the `Questline` handle without calling
//! `close()`. Since redb durably commits data during `commit()` (not during
//! `close()`), dropping the handle simulates an ungraceful shutdown.
//!
//! redb uses shadow paging (not a WAL), so the database is always in a
//! consistent state: either the commit completed (data is present) or it
//! didn't (data is absent). There is never a half-committed state.

use questline::{CollegeId, Config, Questline, UserId, XpReason};
use tempfile::tempdir;

/// Helper: open a Questline at the given path with default config.
fn open_db(path: &std::path::Path) -> Questline {
    Questline::open(path, Config::default()).unwrap()
}

fn view_reason() -> XpReason {
    XpReason::CollegeViewed {
        college_id: CollegeId::new(1),
    }
}

// ============================================================================
// Durability Tests
// ============================================================================

#[test]
fn test_committed_progress_survives_normal_close() {
    // Basic durability: award XP, close gracefully, reopen, verify.
    let dir = tempdir().unwrap();
    let path = dir.path().join("durable.db");

    let user = UserId::new("user-1");
    let db = open_db(&path);
    db.register_user(user.clone()).unwrap();
    db.apply_xp_delta(&user, 120, view_reason()).unwrap();
    db.close().unwrap();

    let db = open_db(&path);
    let progress = db.progress(&user).unwrap();
    assert_eq!(progress.xp, 120);
    assert_eq!(progress.level, 2);
    db.close().unwrap();
}

#[test]
fn test_committed_progress_survives_crash() {
    // Crash durability: award XP, DROP without close (simulates crash),
    // reopen, verify data is present.
    let dir = tempdir().unwrap();
    let path = dir.path().join("crash.db");

    let user = UserId::new("user-1");
    {
        let db = open_db(&path);
        db.register_user(user.clone()).unwrap();
        db.apply_xp_delta(&user, 95, view_reason()).unwrap();
        // db dropped here without close()
    }

    let db = open_db(&path);
    let progress = db.progress(&user).unwrap();
    assert_eq!(progress.xp, 95);
    assert_eq!(progress.level, 1);
    db.close().unwrap();
}

#[test]
fn test_mission_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missions.db");

    let user = UserId::new("user-1");
    let completed_id;
    {
        let db = open_db(&path);
        db.register_user(user.clone()).unwrap();
        let missions = db.missions(&user).unwrap();
        completed_id = missions[0].id;
        db.toggle_mission(completed_id, &user, true).unwrap();
        db.close().unwrap();
    }

    let db = open_db(&path);
    let missions = db.missions(&user).unwrap();
    let completed = missions.iter().find(|m| m.id == completed_id).unwrap();
    assert_eq!(completed.status, questline::MissionStatus::Completed);
    assert!(completed.completed_on.is_some());

    // XP and mission state moved together
    let progress = db.progress(&user).unwrap();
    assert_eq!(progress.xp, u64::from(completed.xp_reward));
    db.close().unwrap();
}

#[test]
fn test_audit_log_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.db");

    let user = UserId::new("user-1");
    {
        let db = open_db(&path);
        db.register_user(user.clone()).unwrap();
        db.apply_xp_delta(&user, 30, view_reason()).unwrap();
        db.apply_xp_delta(&user, -10, view_reason()).unwrap();
        db.close().unwrap();
    }

    let db = open_db(&path);
    let history = db.xp_history(&user, 10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].delta, -10);
    db.close().unwrap();
}

// ============================================================================
// Metadata Tests
// ============================================================================

#[test]
fn test_metadata_preserved_across_opens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("meta.db");

    let db = Questline::open(&path, Config::with_level_width(250)).unwrap();
    let created_at = db.metadata().created_at;
    assert_eq!(db.metadata().level_width, 250);
    db.close().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(10));
    let db = Questline::open(&path, Config::with_level_width(250)).unwrap();
    assert_eq!(db.metadata().created_at, created_at);
    assert!(db.metadata().last_opened_at > created_at);
    db.close().unwrap();
}

#[test]
fn test_reopen_with_different_level_width_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("width.db");

    let db = open_db(&path);
    db.close().unwrap();

    let result = Questline::open(&path, Config::with_level_width(250));
    assert!(result.is_err());
    assert!(result.unwrap_err().is_validation());
}

#[test]
fn test_invalid_config_rejected_before_touching_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("never-created.db");

    let result = Questline::open(
        &path,
        Config {
            level_width: 0,
            ..Default::default()
        },
    );
    assert!(result.is_err());
    assert!(!path.exists());
}
