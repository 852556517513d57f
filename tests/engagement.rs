//! Integration tests for side activities: college views, mentor sessions,
//! and the leaderboard.
//!
//! The central fixture here is the deliberate asymmetry: booking a session
//! awards XP, cancelling it does not take the XP back.

use questline::storage::schema::DEFAULT_RECENT_VIEW_LIMIT;
use questline::{
    CollegeId, Config, MentorId, NewSession, Questline, SessionId, SessionStatus, Timestamp,
    UserId,
};
use tempfile::tempdir;

fn open_db() -> (Questline, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = Questline::open(&path, Config::default()).unwrap();
    (db, dir)
}

fn open_db_with_user(user: &str) -> (Questline, UserId, tempfile::TempDir) {
    let (db, dir) = open_db();
    let user_id = UserId::new(user);
    db.register_user(user_id.clone()).unwrap();
    (db, user_id, dir)
}

fn booking(user: &UserId, mentor: u64, at_millis: i64) -> NewSession {
    NewSession {
        user_id: user.clone(),
        mentor_id: MentorId::new(mentor),
        scheduled_for: Timestamp::from_millis(at_millis),
    }
}

// ============================================================================
// College views
// ============================================================================

#[test]
fn test_view_awards_flat_xp() {
    let (db, user, _dir) = open_db_with_user("user-1");

    let outcome = db.view_college(&user, CollegeId::new(42)).unwrap();
    assert_eq!(outcome.new_xp, 5);
    assert_eq!(db.progress(&user).unwrap().xp, 5);

    db.close().unwrap();
}

#[test]
fn test_repeat_views_award_each_time() {
    let (db, user, _dir) = open_db_with_user("user-1");

    db.view_college(&user, CollegeId::new(42)).unwrap();
    db.view_college(&user, CollegeId::new(42)).unwrap();
    db.view_college(&user, CollegeId::new(42)).unwrap();

    assert_eq!(db.progress(&user).unwrap().xp, 15);

    db.close().unwrap();
}

#[test]
fn test_recently_viewed_newest_first_with_limit() {
    let (db, user, _dir) = open_db_with_user("user-1");

    for i in 1..=7u64 {
        db.view_college(&user, CollegeId::new(i)).unwrap();
        // Distinct view instants keep the ordering unambiguous
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    let recent = db.recently_viewed(&user, DEFAULT_RECENT_VIEW_LIMIT).unwrap();
    assert_eq!(recent.len(), DEFAULT_RECENT_VIEW_LIMIT);
    assert_eq!(recent[0].college_id.as_u64(), 7);
    assert_eq!(recent[4].college_id.as_u64(), 3);
    for pair in recent.windows(2) {
        assert!(pair[0].viewed_at >= pair[1].viewed_at);
    }

    db.close().unwrap();
}

#[test]
fn test_recently_viewed_empty_for_unknown_user() {
    let (db, _dir) = open_db();
    let recent = db.recently_viewed(&UserId::new("ghost"), 5).unwrap();
    assert!(recent.is_empty());
    db.close().unwrap();
}

#[test]
fn test_view_for_unknown_user_is_not_found() {
    let (db, _dir) = open_db();
    let err = db
        .view_college(&UserId::new("ghost"), CollegeId::new(1))
        .unwrap_err();
    assert!(err.is_not_found());
    db.close().unwrap();
}

// ============================================================================
// Sessions — booking awards, cancellation keeps the award
// ============================================================================

#[test]
fn test_booking_awards_flat_xp() {
    let (db, user, _dir) = open_db_with_user("user-1");

    let (session_id, outcome) = db
        .book_session(booking(&user, 3, 2_000_000_000_000))
        .unwrap();
    assert_eq!(outcome.new_xp, 15);

    let sessions = db.sessions(&user).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session_id);
    assert_eq!(sessions[0].status, SessionStatus::Confirmed);
    assert_eq!(sessions[0].mentor_id.as_u64(), 3);

    db.close().unwrap();
}

#[test]
fn test_cancellation_keeps_booking_xp() {
    // Book then cancel: xp must equal pre-booking xp + 15
    let (db, user, _dir) = open_db_with_user("user-1");
    db.view_college(&user, CollegeId::new(1)).unwrap();
    let before_booking = db.progress(&user).unwrap().xp;

    let (session_id, _) = db
        .book_session(booking(&user, 3, 2_000_000_000_000))
        .unwrap();
    db.cancel_session(session_id, &user).unwrap();

    assert_eq!(db.progress(&user).unwrap().xp, before_booking + 15);

    let sessions = db.sessions(&user).unwrap();
    assert_eq!(sessions[0].status, SessionStatus::Cancelled);

    db.close().unwrap();
}

#[test]
fn test_cancel_twice_is_a_noop() {
    let (db, user, _dir) = open_db_with_user("user-1");
    let (session_id, _) = db
        .book_session(booking(&user, 3, 2_000_000_000_000))
        .unwrap();

    db.cancel_session(session_id, &user).unwrap();
    db.cancel_session(session_id, &user).unwrap();

    assert_eq!(db.progress(&user).unwrap().xp, 15);
    db.close().unwrap();
}

#[test]
fn test_cancel_unknown_session_is_not_found() {
    let (db, user, _dir) = open_db_with_user("user-1");
    let err = db.cancel_session(SessionId::new(), &user).unwrap_err();
    assert!(err.is_not_found());
    db.close().unwrap();
}

#[test]
fn test_cancel_foreign_session_is_not_found() {
    let (db, alice, _dir) = open_db_with_user("alice");
    let bob = UserId::new("bob");
    db.register_user(bob.clone()).unwrap();

    let (session_id, _) = db
        .book_session(booking(&alice, 3, 2_000_000_000_000))
        .unwrap();
    let err = db.cancel_session(session_id, &bob).unwrap_err();
    assert!(err.is_not_found());

    // Alice's session is untouched
    assert_eq!(
        db.sessions(&alice).unwrap()[0].status,
        SessionStatus::Confirmed
    );

    db.close().unwrap();
}

#[test]
fn test_sessions_sorted_by_scheduled_time() {
    let (db, user, _dir) = open_db_with_user("user-1");

    db.book_session(booking(&user, 1, 3_000)).unwrap();
    db.book_session(booking(&user, 2, 1_000)).unwrap();
    db.book_session(booking(&user, 3, 2_000)).unwrap();

    let sessions = db.sessions(&user).unwrap();
    let mentors: Vec<u64> = sessions.iter().map(|s| s.mentor_id.as_u64()).collect();
    assert_eq!(mentors, vec![2, 3, 1]);

    db.close().unwrap();
}

#[test]
fn test_booking_validates_input() {
    let (db, user, _dir) = open_db_with_user("user-1");

    let err = db
        .book_session(NewSession {
            user_id: user,
            mentor_id: MentorId::new(0),
            scheduled_for: Timestamp::from_millis(1_000),
        })
        .unwrap_err();
    assert!(err.is_validation());

    db.close().unwrap();
}

#[test]
fn test_booking_for_unknown_user_is_not_found() {
    let (db, _dir) = open_db();
    let err = db
        .book_session(booking(&UserId::new("ghost"), 3, 1_000))
        .unwrap_err();
    assert!(err.is_not_found());
    db.close().unwrap();
}

// ============================================================================
// Leaderboard
// ============================================================================

#[test]
fn test_leaderboard_orders_by_xp_descending() {
    let (db, _dir) = open_db();

    for (name, views) in [("alice", 4u64), ("bob", 1), ("carol", 9)] {
        let user = UserId::new(name);
        db.register_user(user.clone()).unwrap();
        for i in 0..views {
            db.view_college(&user, CollegeId::new(i + 1)).unwrap();
        }
    }

    let top = db.leaderboard(2).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].user_id.as_str(), "carol");
    assert_eq!(top[0].xp, 45);
    assert_eq!(top[1].user_id.as_str(), "alice");

    db.close().unwrap();
}

#[test]
fn test_leaderboard_ties_break_by_user_id() {
    let (db, _dir) = open_db();

    for name in ["zed", "amy"] {
        let user = UserId::new(name);
        db.register_user(user.clone()).unwrap();
        db.view_college(&user, CollegeId::new(1)).unwrap();
    }

    let top = db.leaderboard(10).unwrap();
    assert_eq!(top[0].user_id.as_str(), "amy");
    assert_eq!(top[1].user_id.as_str(), "zed");

    db.close().unwrap();
}

// ============================================================================
// Custom award rates
// ============================================================================

#[test]
fn test_custom_award_rates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = Questline::open(
        &path,
        Config {
            college_view_xp: 10,
            session_booking_xp: 50,
            ..Default::default()
        },
    )
    .unwrap();

    let user = UserId::new("user-1");
    db.register_user(user.clone()).unwrap();

    db.view_college(&user, CollegeId::new(1)).unwrap();
    assert_eq!(db.progress(&user).unwrap().xp, 10);

    db.book_session(booking(&user, 3, 1_000)).unwrap();
    assert_eq!(db.progress(&user).unwrap().xp, 60);

    db.close().unwrap();
}
