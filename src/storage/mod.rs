//! Storage layer abstractions for Questline.
//!
//! This module provides a trait-based abstraction over the storage engine,
//! allowing different backends to be used (e.g., redb, mock for testing).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Questline                               │
//! │                         │                                    │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                        │
//! │              │   StorageEngine     │  ← Trait               │
//! │              └─────────────────────┘                        │
//! │                    ▲         ▲                              │
//! │                    │         │                              │
//! │         ┌─────────┴─┐   ┌───┴─────────┐                    │
//! │         │RedbStorage│   │ MockStorage │                    │
//! │         └───────────┘   └─────────────┘                    │
//! │           (prod)           (test)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Atomicity
//!
//! Every XP-affecting engine operation maps to exactly one `commit_*`
//! method, and each `commit_*` implementation must write all of its
//! records in a single transaction. This is what makes the engine's
//! no-partial-mutation contract hold: either the progress record, the
//! audit event, and any sibling record (mission, session, view) all
//! land, or none do.

pub mod redb;
pub mod schema;

pub use self::redb::RedbStorage;
pub use schema::{DatabaseMetadata, SCHEMA_VERSION};

use std::path::Path;

use crate::config::Config;
use crate::engagement::{CollegeView, MentorSession};
use crate::error::Result;
use crate::mission::Mission;
use crate::progress::{UserProgress, XpEvent};
use crate::types::{MissionId, SessionId, UserId};

/// Storage engine trait for Questline.
///
/// This trait defines the contract that any storage backend must implement.
/// The primary implementation is [`RedbStorage`], but other implementations
/// can be created for testing or alternative backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow the engine to be shared
/// across threads. The engine handles per-user serialization; the backend
/// handles transaction isolation.
pub trait StorageEngine: Send + Sync {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns the database metadata.
    ///
    /// The metadata includes schema version, level width, and timestamps.
    fn metadata(&self) -> &DatabaseMetadata;

    /// Closes the storage engine, flushing any pending writes.
    ///
    /// This method consumes the storage engine. After calling `close()`,
    /// the engine cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend supports reporting flush failures.
    /// Note: the current redb backend flushes on drop (infallible), so
    /// this always returns `Ok(())` for [`RedbStorage`].
    fn close(self: Box<Self>) -> Result<()>;

    /// Returns the path to the database file, if applicable.
    ///
    /// Some storage implementations (like in-memory mocks) may not have
    /// a path.
    fn path(&self) -> Option<&Path>;

    // =========================================================================
    // Progress Operations
    // =========================================================================

    /// Inserts a progress record at registration time.
    ///
    /// The caller guarantees no record exists for this user yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction or serialization fails.
    fn create_progress(&self, progress: &UserProgress) -> Result<()>;

    /// Retrieves a user's progress record.
    ///
    /// Returns `None` if the user has never been registered.
    fn read_progress(&self, user_id: &UserId) -> Result<Option<UserProgress>>;

    /// Persists an updated progress record together with its audit event.
    ///
    /// Writes atomically to 3 tables in a single transaction:
    /// - `PROGRESS_TABLE` — the updated (xp, level) pair
    /// - `EVENTS_TABLE` — the audit event record
    /// - `EVENTS_BY_USER_TABLE` — per-user event index
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction or serialization fails; on
    /// error, none of the three tables are modified.
    fn commit_progress(&self, progress: &UserProgress, event: &XpEvent) -> Result<()>;

    /// Returns the top progress records ordered by XP descending.
    ///
    /// Ties are broken by user ID for a stable ordering.
    fn top_by_xp(&self, limit: usize) -> Result<Vec<UserProgress>>;

    // =========================================================================
    // Mission Operations
    // =========================================================================

    /// Saves a batch of mission records and their per-user index entries
    /// in a single transaction.
    ///
    /// Used both for seeding the default mission set (where a partial
    /// write would leave a user with a truncated template set forever)
    /// and for single inserts. Existing missions with the same ID are
    /// overwritten.
    fn save_missions(&self, missions: &[Mission]) -> Result<()>;

    /// Retrieves a mission by ID.
    ///
    /// Returns `None` if no mission with the given ID exists. Ownership
    /// checks are the engine's responsibility.
    fn get_mission(&self, id: MissionId) -> Result<Option<Mission>>;

    /// Lists all missions belonging to a user, oldest first.
    ///
    /// Returns an empty vector if the user has no missions.
    fn missions_for_user(&self, user_id: &UserId) -> Result<Vec<Mission>>;

    /// Persists a mission toggle: the flipped mission, the updated
    /// progress record, and the audit event, in one transaction.
    ///
    /// Writes atomically to 4 tables: `MISSIONS_TABLE`, `PROGRESS_TABLE`,
    /// `EVENTS_TABLE`, and `EVENTS_BY_USER_TABLE`. (The mission index is
    /// untouched; toggling never changes ownership.)
    fn commit_mission_toggle(
        &self,
        mission: &Mission,
        progress: &UserProgress,
        event: &XpEvent,
    ) -> Result<()>;

    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Saves a session record and its per-user index entry.
    ///
    /// Used for cancellation updates; bookings go through
    /// [`commit_session_booking`](Self::commit_session_booking).
    fn save_session(&self, session: &MentorSession) -> Result<()>;

    /// Retrieves a session by ID.
    ///
    /// Returns `None` if no session with the given ID exists.
    fn get_session(&self, id: SessionId) -> Result<Option<MentorSession>>;

    /// Lists all sessions belonging to a user, unordered.
    ///
    /// The engine sorts by scheduled time; the index only guarantees
    /// booking order.
    fn sessions_for_user(&self, user_id: &UserId) -> Result<Vec<MentorSession>>;

    /// Persists a booking: the new session, the updated progress record,
    /// and the audit event, in one transaction.
    ///
    /// Writes atomically to 5 tables: `SESSIONS_TABLE`,
    /// `SESSIONS_BY_USER_TABLE`, `PROGRESS_TABLE`, `EVENTS_TABLE`, and
    /// `EVENTS_BY_USER_TABLE`.
    fn commit_session_booking(
        &self,
        session: &MentorSession,
        progress: &UserProgress,
        event: &XpEvent,
    ) -> Result<()>;

    // =========================================================================
    // College View Operations
    // =========================================================================

    /// Persists a college view: the view entry, the updated progress
    /// record, and the audit event, in one transaction.
    ///
    /// Writes atomically to 4 tables: `COLLEGE_VIEWS_TABLE`,
    /// `PROGRESS_TABLE`, `EVENTS_TABLE`, and `EVENTS_BY_USER_TABLE`.
    fn commit_college_view(
        &self,
        user_id: &UserId,
        view: &CollegeView,
        progress: &UserProgress,
        event: &XpEvent,
    ) -> Result<()>;

    /// Returns a user's most recent college views, newest first.
    fn recent_views(&self, user_id: &UserId, limit: usize) -> Result<Vec<CollegeView>>;

    // =========================================================================
    // XP Event Operations
    // =========================================================================

    /// Returns a user's most recent XP events, newest first.
    fn events_for_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<XpEvent>>;
}

/// Opens a storage engine at the given path.
///
/// This is a convenience function that creates a [`RedbStorage`] instance.
/// For more control, use `RedbStorage::open()` directly.
///
/// # Arguments
///
/// * `path` - Path to the database file (created if it doesn't exist)
/// * `config` - Engine configuration
///
/// # Errors
///
/// Returns an error if:
/// - The database file is corrupted
/// - The database is locked by another process
/// - Schema version doesn't match
/// - Level width doesn't match (for existing databases)
pub fn open_storage(path: impl AsRef<Path>, config: &Config) -> Result<Box<dyn StorageEngine>> {
    let storage = RedbStorage::open(path, config)?;
    Ok(Box::new(storage))
}
