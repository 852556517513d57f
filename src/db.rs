//! Questline main struct and engine operations.
//!
//! The [`Questline`] struct is the primary interface for interacting with
//! the progression engine. It provides methods for:
//!
//! - Opening and closing the database
//! - Registering users and reading their progress
//! - Applying XP deltas and detecting level-ups
//! - Toggling missions and seeding the default mission set
//! - Recording mentor sessions and college views
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use questline::{Questline, Config, UserId, CollegeId};
//!
//! // Open or create a database
//! let db = Questline::open("./questline.db", Config::default())?;
//!
//! // Register a user (xp = 0, level = 1)
//! db.register_user(UserId::new("user-1"))?;
//!
//! // Award XP for viewing a college; leveled_up tells the caller
//! // whether to show a notification
//! let outcome = db.view_college(&UserId::new("user-1"), CollegeId::new(42))?;
//! if outcome.leveled_up {
//!     println!("Level {}!", outcome.new_level);
//! }
//!
//! // Close when done
//! db.close()?;
//! ```
//!
//! # Thread Safety
//!
//! `Questline` is `Send + Sync` and can be shared across threads using
//! `Arc`. Every XP-affecting operation serializes per user: concurrent
//! deltas for the same user queue behind a per-user lock, so the stored
//! `(xp, level)` pair never loses an update and the level invariant
//! holds under any interleaving.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, instrument};

use crate::config::Config;
use crate::engagement::{
    validate_new_session, CollegeView, MentorSession, NewSession, SessionStatus,
};
use crate::error::{NotFoundError, QuestlineError, Result};
use crate::mission::{
    validate_new_mission, validate_user_id, Mission, MissionStatus, MissionToggle, NewMission,
    DEFAULT_MISSIONS,
};
use crate::progress::{self, UserProgress, XpEvent, XpOutcome, XpReason};
use crate::storage::{open_storage, DatabaseMetadata, StorageEngine};
use crate::types::{CollegeId, EventId, MissionId, SessionId, Timestamp, UserId};

/// The main Questline engine handle.
///
/// This is the primary interface for all progression operations. Create an
/// instance with [`Questline::open()`] and close it with
/// [`Questline::close()`].
///
/// # Ownership
///
/// `Questline` owns its storage. When you call `close()`, the engine is
/// consumed and cannot be used afterward. This ensures resources are
/// properly released.
pub struct Questline {
    /// Storage engine (redb or mock for testing).
    storage: Box<dyn StorageEngine>,

    /// Configuration used to open this database.
    config: Config,

    /// Per-user locks serializing read-modify-write of progress records.
    ///
    /// The table only grows (one entry per user seen this process), which
    /// is bounded by the account population and far smaller than the data
    /// the accounts themselves occupy.
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for Questline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Questline")
            .field("config", &self.config)
            .field("level_width", &self.level_width())
            .finish_non_exhaustive()
    }
}

impl Questline {
    /// Opens or creates a Questline database at the specified path.
    ///
    /// If the database doesn't exist, it will be created with the given
    /// configuration. If it exists, the configuration will be validated
    /// against the stored settings (the level width must match).
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database file (created if it doesn't exist)
    /// * `config` - Configuration options for the engine
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid (see [`Config::validate`])
    /// - Database file is corrupted
    /// - Database is locked by another process
    /// - Schema version doesn't match (needs migration)
    /// - Level width doesn't match the existing database
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        // Validate configuration first
        config.validate().map_err(QuestlineError::from)?;

        info!("Opening Questline");

        // Open storage engine
        let storage = open_storage(&path, &config)?;

        info!(
            level_width = config.level_width,
            college_view_xp = config.college_view_xp,
            session_booking_xp = config.session_booking_xp,
            "Questline opened successfully"
        );

        Ok(Self {
            storage,
            config,
            user_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Creates an engine over an already-constructed storage backend.
    ///
    /// Used by tests to substitute a mock; production callers should use
    /// [`Questline::open()`].
    #[cfg(test)]
    pub(crate) fn with_storage(storage: Box<dyn StorageEngine>, config: Config) -> Self {
        Self {
            storage,
            config,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Closes the engine, flushing all pending writes.
    ///
    /// This method consumes the `Questline` instance, ensuring it cannot
    /// be used after closing.
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        info!("Closing Questline");

        // Close storage (flushes pending writes)
        self.storage.close()?;

        info!("Questline closed successfully");
        Ok(())
    }

    /// Returns a reference to the engine configuration.
    ///
    /// This is the configuration that was used to open the database.
    /// Note that the level width is locked on database creation and
    /// cannot be changed.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database metadata.
    ///
    /// Metadata includes schema version, level width, and timestamps for
    /// when the database was created and last opened.
    #[inline]
    pub fn metadata(&self) -> &DatabaseMetadata {
        self.storage.metadata()
    }

    /// Returns the XP bucket width per level for this database.
    #[inline]
    pub fn level_width(&self) -> u32 {
        self.config.level_width
    }

    // =========================================================================
    // Per-user serialization
    // =========================================================================

    /// Returns the lock guarding a user's read-modify-write cycle.
    ///
    /// The inner `()` mutex is the actual serialization point; the outer
    /// map lock is held only long enough to fetch or create it.
    fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(user_id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquires a user's lock, recovering from poisoning.
    ///
    /// A poisoned lock means a thread panicked between read and commit;
    /// since commits are transactional the stored state is still
    /// consistent, so resuming is safe.
    fn hold<'a>(lock: &'a Arc<Mutex<()>>) -> MutexGuard<'a, ()> {
        lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Registration & read model
    // =========================================================================

    /// Registers a user, creating a progress record with `xp = 0, level = 1`.
    ///
    /// Idempotent: re-registering an existing user returns the stored
    /// record untouched, so an auth-layer retry can never reset progress.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty or oversized user ID, or a
    /// storage error if persistence fails.
    #[instrument(skip(self), fields(user = %user_id))]
    pub fn register_user(&self, user_id: UserId) -> Result<UserProgress> {
        validate_user_id(&user_id)?;

        let lock = self.user_lock(&user_id);
        let _guard = Self::hold(&lock);

        if let Some(existing) = self.storage.read_progress(&user_id)? {
            return Ok(existing);
        }

        let progress = UserProgress::register(user_id.clone());
        self.storage.create_progress(&progress)?;

        info!(user = %user_id, "User registered");
        Ok(progress)
    }

    /// Returns a user's current progress.
    ///
    /// # Errors
    ///
    /// Fails with a not-found error if the user has never been registered.
    pub fn progress(&self, user_id: &UserId) -> Result<UserProgress> {
        self.storage
            .read_progress(user_id)?
            .ok_or_else(|| NotFoundError::user(user_id).into())
    }

    /// Returns the top `limit` users by XP, descending.
    ///
    /// Ties are broken by user ID for a stable ordering.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<UserProgress>> {
        self.storage.top_by_xp(limit)
    }

    /// Returns a user's most recent XP events, newest first.
    ///
    /// Returns an empty vector for users with no recorded activity.
    pub fn xp_history(&self, user_id: &UserId, limit: usize) -> Result<Vec<XpEvent>> {
        self.storage.events_for_user(user_id, limit)
    }

    // =========================================================================
    // XP delta application — the single authority over (xp, level)
    // =========================================================================

    /// Applies a signed XP delta to a user's progress.
    ///
    /// The core rule of the engine: reads the current `(xp, level)` pair,
    /// clamps the new XP at zero, derives the new level, and persists
    /// both fields together with an audit event in one transaction.
    /// `leveled_up` is true iff the level strictly increased.
    ///
    /// Calls for the same user are serialized, so concurrent deltas
    /// compose instead of losing updates. Safe to retry on storage
    /// failure: the operation re-reads current state each time.
    ///
    /// # Errors
    ///
    /// Fails with a not-found error for unregistered users and a storage
    /// error if persistence fails; on failure no field is modified.
    #[instrument(skip(self), fields(user = %user_id, delta = delta))]
    pub fn apply_xp_delta(
        &self,
        user_id: &UserId,
        delta: i64,
        reason: XpReason,
    ) -> Result<XpOutcome> {
        let lock = self.user_lock(user_id);
        let _guard = Self::hold(&lock);

        self.apply_xp_delta_locked(user_id, delta, reason)
    }

    /// Delta application body, called with the user's lock already held.
    fn apply_xp_delta_locked(
        &self,
        user_id: &UserId,
        delta: i64,
        reason: XpReason,
    ) -> Result<XpOutcome> {
        let current = self
            .storage
            .read_progress(user_id)?
            .ok_or_else(|| NotFoundError::user(user_id))?;

        let outcome = progress::apply_delta(
            current.xp,
            current.level,
            delta,
            self.config.level_width,
        );

        let now = Timestamp::now();
        let updated = UserProgress {
            xp: outcome.new_xp,
            level: outcome.new_level,
            updated_at: now,
            ..current
        };
        let event = XpEvent {
            id: EventId::new(),
            user_id: user_id.clone(),
            delta,
            reason,
            xp_after: outcome.new_xp,
            level_after: outcome.new_level,
            recorded_at: now,
        };

        self.storage.commit_progress(&updated, &event)?;

        if outcome.leveled_up {
            info!(user = %user_id, level = outcome.new_level, "Level up");
        }

        Ok(outcome)
    }

    // =========================================================================
    // Missions
    // =========================================================================

    /// Returns a user's missions, oldest first.
    ///
    /// The first time a registered user with no missions is observed,
    /// the default weekly set is seeded (atomically, so a failed seed
    /// leaves nothing behind) and returned.
    ///
    /// # Errors
    ///
    /// Fails with a not-found error if the user has never been registered.
    #[instrument(skip(self), fields(user = %user_id))]
    pub fn missions(&self, user_id: &UserId) -> Result<Vec<Mission>> {
        let lock = self.user_lock(user_id);
        let _guard = Self::hold(&lock);

        // Seeding requires an observed user; surface unknown IDs instead
        // of silently creating orphan missions
        if self.storage.read_progress(user_id)?.is_none() {
            return Err(NotFoundError::user(user_id).into());
        }

        let existing = self.storage.missions_for_user(user_id)?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let now = Timestamp::now();
        let seeded: Vec<Mission> = DEFAULT_MISSIONS
            .iter()
            .map(|(text, reward)| Mission {
                id: MissionId::new(),
                user_id: user_id.clone(),
                text: (*text).to_string(),
                xp_reward: *reward,
                status: MissionStatus::Pending,
                completed_on: None,
                created_at: now,
            })
            .collect();

        self.storage.save_missions(&seeded)?;

        info!(user = %user_id, count = seeded.len(), "Default missions seeded");
        Ok(seeded)
    }

    /// Creates a single mission for a user.
    ///
    /// New missions always start pending; the reward is fixed for the
    /// mission's lifetime.
    ///
    /// # Errors
    ///
    /// Fails with a validation error for bad input and a not-found error
    /// if the user has never been registered.
    #[instrument(skip(self, new_mission), fields(user = %new_mission.user_id))]
    pub fn create_mission(&self, new_mission: NewMission) -> Result<MissionId> {
        validate_new_mission(&new_mission)?;

        if self.storage.read_progress(&new_mission.user_id)?.is_none() {
            return Err(NotFoundError::user(&new_mission.user_id).into());
        }

        let mission = Mission {
            id: MissionId::new(),
            user_id: new_mission.user_id,
            text: new_mission.text,
            xp_reward: new_mission.xp_reward,
            status: MissionStatus::Pending,
            completed_on: None,
            created_at: Timestamp::now(),
        };

        self.storage.save_missions(std::slice::from_ref(&mission))?;

        info!(id = %mission.id, "Mission created");
        Ok(mission.id)
    }

    /// Sets a mission's completion state and applies the matching XP delta.
    ///
    /// `completed` is the desired end state. The delta is derived from it
    /// alone: `+xp_reward` when completing, `-xp_reward` when reverting,
    /// never from the mission's current status. Toggling completed and
    /// back is therefore an exact undo. The flip side is that setting an
    /// already-completed mission to completed awards the reward again;
    /// callers are expected to disable the control once completed.
    ///
    /// The mission record, progress record, and audit event land in one
    /// transaction: the mission can never flip without its XP applying.
    ///
    /// # Errors
    ///
    /// Fails with a not-found error if the mission does not exist or is
    /// owned by a different user, or if the user is unregistered.
    #[instrument(skip(self), fields(mission = %mission_id, user = %user_id, completed = completed))]
    pub fn toggle_mission(
        &self,
        mission_id: MissionId,
        user_id: &UserId,
        completed: bool,
    ) -> Result<MissionToggle> {
        let lock = self.user_lock(user_id);
        let _guard = Self::hold(&lock);

        let mut mission = self
            .storage
            .get_mission(mission_id)?
            .ok_or_else(|| NotFoundError::mission(mission_id))?;

        // Ownership is part of the lookup: a foreign mission is
        // indistinguishable from a missing one
        if &mission.user_id != user_id {
            return Err(NotFoundError::mission(mission_id).into());
        }

        let current = self
            .storage
            .read_progress(user_id)?
            .ok_or_else(|| NotFoundError::user(user_id))?;

        let xp_change = if completed {
            i64::from(mission.xp_reward)
        } else {
            -i64::from(mission.xp_reward)
        };
        let reason = if completed {
            XpReason::MissionCompleted { mission_id }
        } else {
            XpReason::MissionReverted { mission_id }
        };

        let now = Timestamp::now();
        if completed {
            mission.complete(now);
        } else {
            mission.revert();
        }

        let outcome = progress::apply_delta(
            current.xp,
            current.level,
            xp_change,
            self.config.level_width,
        );
        let updated = UserProgress {
            xp: outcome.new_xp,
            level: outcome.new_level,
            updated_at: now,
            ..current
        };
        let event = XpEvent {
            id: EventId::new(),
            user_id: user_id.clone(),
            delta: xp_change,
            reason,
            xp_after: outcome.new_xp,
            level_after: outcome.new_level,
            recorded_at: now,
        };

        self.storage
            .commit_mission_toggle(&mission, &updated, &event)?;

        if outcome.leveled_up {
            info!(user = %user_id, level = outcome.new_level, "Level up");
        }

        Ok(MissionToggle { xp_change, outcome })
    }

    // =========================================================================
    // College views
    // =========================================================================

    /// Records a college view and awards the flat view XP.
    ///
    /// Every view awards, including repeat views of the same college;
    /// the recently-viewed list keeps each distinct (instant, college)
    /// entry once.
    ///
    /// # Errors
    ///
    /// Fails with a not-found error if the user has never been registered.
    #[instrument(skip(self), fields(user = %user_id, college = %college_id))]
    pub fn view_college(&self, user_id: &UserId, college_id: CollegeId) -> Result<XpOutcome> {
        let lock = self.user_lock(user_id);
        let _guard = Self::hold(&lock);

        let current = self
            .storage
            .read_progress(user_id)?
            .ok_or_else(|| NotFoundError::user(user_id))?;

        let delta = i64::from(self.config.college_view_xp);
        let outcome = progress::apply_delta(
            current.xp,
            current.level,
            delta,
            self.config.level_width,
        );

        let now = Timestamp::now();
        let view = CollegeView {
            college_id,
            viewed_at: now,
        };
        let updated = UserProgress {
            xp: outcome.new_xp,
            level: outcome.new_level,
            updated_at: now,
            ..current
        };
        let event = XpEvent {
            id: EventId::new(),
            user_id: user_id.clone(),
            delta,
            reason: XpReason::CollegeViewed { college_id },
            xp_after: outcome.new_xp,
            level_after: outcome.new_level,
            recorded_at: now,
        };

        self.storage
            .commit_college_view(user_id, &view, &updated, &event)?;

        if outcome.leveled_up {
            info!(user = %user_id, level = outcome.new_level, "Level up");
        }

        Ok(outcome)
    }

    /// Returns a user's most recently viewed colleges, newest first.
    ///
    /// Returns an empty vector for users with no recorded views.
    pub fn recently_viewed(&self, user_id: &UserId, limit: usize) -> Result<Vec<CollegeView>> {
        self.storage.recent_views(user_id, limit)
    }

    // =========================================================================
    // Mentor sessions
    // =========================================================================

    /// Books a mentor session and awards the flat booking XP.
    ///
    /// The session record, progress record, and audit event land in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Fails with a validation error for bad input and a not-found error
    /// if the user has never been registered.
    #[instrument(skip(self, new_session), fields(user = %new_session.user_id, mentor = %new_session.mentor_id))]
    pub fn book_session(&self, new_session: NewSession) -> Result<(SessionId, XpOutcome)> {
        validate_new_session(&new_session)?;

        let user_id = new_session.user_id.clone();
        let lock = self.user_lock(&user_id);
        let _guard = Self::hold(&lock);

        let current = self
            .storage
            .read_progress(&user_id)?
            .ok_or_else(|| NotFoundError::user(&user_id))?;

        let now = Timestamp::now();
        let session = MentorSession {
            id: SessionId::new(),
            user_id: new_session.user_id,
            mentor_id: new_session.mentor_id,
            scheduled_for: new_session.scheduled_for,
            status: SessionStatus::Confirmed,
            created_at: now,
        };

        let delta = i64::from(self.config.session_booking_xp);
        let outcome = progress::apply_delta(
            current.xp,
            current.level,
            delta,
            self.config.level_width,
        );
        let updated = UserProgress {
            xp: outcome.new_xp,
            level: outcome.new_level,
            updated_at: now,
            ..current
        };
        let event = XpEvent {
            id: EventId::new(),
            user_id: user_id.clone(),
            delta,
            reason: XpReason::SessionBooked {
                session_id: session.id,
            },
            xp_after: outcome.new_xp,
            level_after: outcome.new_level,
            recorded_at: now,
        };

        self.storage
            .commit_session_booking(&session, &updated, &event)?;

        if outcome.leveled_up {
            info!(user = %user_id, level = outcome.new_level, "Level up");
        }

        Ok((session.id, outcome))
    }

    /// Cancels a booked session.
    ///
    /// The booking XP is deliberately NOT revoked: sessions are
    /// cancellable without penalty. Cancelling an already-cancelled
    /// session is a no-op.
    ///
    /// # Errors
    ///
    /// Fails with a not-found error if the session does not exist or is
    /// owned by a different user.
    #[instrument(skip(self), fields(session = %session_id, user = %user_id))]
    pub fn cancel_session(&self, session_id: SessionId, user_id: &UserId) -> Result<()> {
        let mut session = self
            .storage
            .get_session(session_id)?
            .ok_or_else(|| NotFoundError::session(session_id))?;

        if &session.user_id != user_id {
            return Err(NotFoundError::session(session_id).into());
        }

        if session.status == SessionStatus::Cancelled {
            return Ok(());
        }

        session.cancel();
        self.storage.save_session(&session)?;

        info!(session = %session_id, "Session cancelled");
        Ok(())
    }

    /// Returns a user's sessions, ascending by scheduled time.
    ///
    /// Cancelled sessions are included; the caller decides how to render
    /// them. Returns an empty vector for users with no bookings.
    pub fn sessions(&self, user_id: &UserId) -> Result<Vec<MentorSession>> {
        let mut sessions = self.storage.sessions_for_user(user_id)?;
        sessions.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(sessions)
    }
}
