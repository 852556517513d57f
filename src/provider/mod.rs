//! Async provider wrapper for Questline.
//!
//! The engine core is synchronous: every operation suspends only on
//! storage I/O. Portal backends, however, call it from async request
//! handlers. This module bridges the two with an object-safe async trait
//! ([`ProgressProvider`]) and a wrapper ([`QuestlineProvider`]) that
//! dispatches each call onto `tokio::task::spawn_blocking`, keeping
//! storage I/O off the async executor's worker threads.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use questline::{Questline, Config, UserId};
//! use questline::provider::{ProgressProvider, QuestlineProvider};
//!
//! let engine = Arc::new(Questline::open("./questline.db", Config::default())?);
//! let provider = QuestlineProvider::new(engine);
//!
//! // From an async handler:
//! let progress = provider.register_user(UserId::new("user-1")).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::engagement::{CollegeView, MentorSession, NewSession};
use crate::error::{QuestlineError, Result, StorageError};
use crate::mission::{Mission, MissionToggle};
use crate::progress::{UserProgress, XpOutcome, XpReason};
use crate::types::{CollegeId, MissionId, SessionId, UserId};
use crate::Questline;

/// Maps a join failure to the engine's error space.
///
/// A cancelled or panicked blocking task never committed anything, so
/// surfacing it as a retryable transaction failure is accurate.
fn join_error(err: tokio::task::JoinError) -> QuestlineError {
    StorageError::transaction(format!("blocking task failed: {}", err)).into()
}

/// Object-safe async facade over the progression engine.
///
/// Portal handlers depend on this trait rather than [`Questline`]
/// directly, so request-path code can be tested against a stub without
/// touching a real database.
#[async_trait]
pub trait ProgressProvider: Send + Sync {
    /// Registers a user; see [`Questline::register_user`].
    async fn register_user(&self, user_id: UserId) -> Result<UserProgress>;

    /// Reads a user's progress; see [`Questline::progress`].
    async fn progress(&self, user_id: UserId) -> Result<UserProgress>;

    /// Applies a signed XP delta; see [`Questline::apply_xp_delta`].
    async fn apply_xp_delta(
        &self,
        user_id: UserId,
        delta: i64,
        reason: XpReason,
    ) -> Result<XpOutcome>;

    /// Lists (and seeds) a user's missions; see [`Questline::missions`].
    async fn missions(&self, user_id: UserId) -> Result<Vec<Mission>>;

    /// Toggles a mission's completion; see [`Questline::toggle_mission`].
    async fn toggle_mission(
        &self,
        mission_id: MissionId,
        user_id: UserId,
        completed: bool,
    ) -> Result<MissionToggle>;

    /// Records a college view; see [`Questline::view_college`].
    async fn view_college(&self, user_id: UserId, college_id: CollegeId) -> Result<XpOutcome>;

    /// Lists recently viewed colleges; see [`Questline::recently_viewed`].
    async fn recently_viewed(&self, user_id: UserId, limit: usize) -> Result<Vec<CollegeView>>;

    /// Books a mentor session; see [`Questline::book_session`].
    async fn book_session(&self, new_session: NewSession) -> Result<(SessionId, XpOutcome)>;

    /// Cancels a session without revoking XP; see [`Questline::cancel_session`].
    async fn cancel_session(&self, session_id: SessionId, user_id: UserId) -> Result<()>;

    /// Lists a user's sessions; see [`Questline::sessions`].
    async fn sessions(&self, user_id: UserId) -> Result<Vec<MentorSession>>;

    /// Returns the leaderboard; see [`Questline::leaderboard`].
    async fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgress>>;
}

/// [`ProgressProvider`] implementation backed by a shared [`Questline`].
///
/// Cloning is cheap; all clones share the same engine and therefore the
/// same per-user serialization.
#[derive(Clone)]
pub struct QuestlineProvider {
    inner: Arc<Questline>,
}

impl QuestlineProvider {
    /// Wraps a shared engine handle.
    pub fn new(inner: Arc<Questline>) -> Self {
        Self { inner }
    }

    /// Returns the underlying engine handle.
    pub fn engine(&self) -> &Arc<Questline> {
        &self.inner
    }
}

impl std::fmt::Debug for QuestlineProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestlineProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl ProgressProvider for QuestlineProvider {
    async fn register_user(&self, user_id: UserId) -> Result<UserProgress> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.register_user(user_id))
            .await
            .map_err(join_error)?
    }

    async fn progress(&self, user_id: UserId) -> Result<UserProgress> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.progress(&user_id))
            .await
            .map_err(join_error)?
    }

    async fn apply_xp_delta(
        &self,
        user_id: UserId,
        delta: i64,
        reason: XpReason,
    ) -> Result<XpOutcome> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.apply_xp_delta(&user_id, delta, reason))
            .await
            .map_err(join_error)?
    }

    async fn missions(&self, user_id: UserId) -> Result<Vec<Mission>> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.missions(&user_id))
            .await
            .map_err(join_error)?
    }

    async fn toggle_mission(
        &self,
        mission_id: MissionId,
        user_id: UserId,
        completed: bool,
    ) -> Result<MissionToggle> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.toggle_mission(mission_id, &user_id, completed))
            .await
            .map_err(join_error)?
    }

    async fn view_college(&self, user_id: UserId, college_id: CollegeId) -> Result<XpOutcome> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.view_college(&user_id, college_id))
            .await
            .map_err(join_error)?
    }

    async fn recently_viewed(&self, user_id: UserId, limit: usize) -> Result<Vec<CollegeView>> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.recently_viewed(&user_id, limit))
            .await
            .map_err(join_error)?
    }

    async fn book_session(&self, new_session: NewSession) -> Result<(SessionId, XpOutcome)> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.book_session(new_session))
            .await
            .map_err(join_error)?
    }

    async fn cancel_session(&self, session_id: SessionId, user_id: UserId) -> Result<()> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.cancel_session(session_id, &user_id))
            .await
            .map_err(join_error)?
    }

    async fn sessions(&self, user_id: UserId) -> Result<Vec<MentorSession>> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.sessions(&user_id))
            .await
            .map_err(join_error)?
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgress>> {
        let db = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || db.leaderboard(limit))
            .await
            .map_err(join_error)?
    }
}
