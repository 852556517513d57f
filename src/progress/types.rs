//! Type definitions for user progression.
//!
//! A **progress record** is the pair of fields the engine guards: cumulative
//! XP and the level derived from it. The two are stored together and written
//! together; no caller ever sets `level` directly.

use serde::{Deserialize, Serialize};

use crate::types::{CollegeId, EventId, MissionId, SessionId, Timestamp, UserId};

// ============================================================================
// UserProgress — The guarded record
// ============================================================================

/// A user's progression state.
///
/// Created at registration with `xp = 0, level = 1` and mutated exclusively
/// through the engine's delta application. The invariant
/// `level == xp / level_width + 1` holds after every successful update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    /// Opaque identifier from the auth collaborator, stable for the
    /// account's lifetime.
    pub user_id: UserId,

    /// Cumulative experience points. Never negative; revocations clamp
    /// at zero rather than erroring.
    pub xp: u64,

    /// Level derived from `xp`. Stored alongside XP so the read model
    /// never recomputes it, but only the engine writes it.
    pub level: u32,

    /// When this record was created (registration time).
    pub created_at: Timestamp,

    /// When this record was last mutated.
    pub updated_at: Timestamp,
}

impl UserProgress {
    /// Creates a fresh progress record for a newly registered user.
    pub fn register(user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            user_id,
            xp: 0,
            level: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// XpOutcome — Result of one delta application
// ============================================================================

/// The result of applying one XP delta.
///
/// Returned by every XP-affecting operation so the caller can display the
/// new totals and a level-up notification without a second read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpOutcome {
    /// XP after the delta (clamped at zero).
    pub new_xp: u64,

    /// Level after the delta.
    pub new_level: u32,

    /// True iff the level strictly increased. A level decrease from a
    /// revocation updates the stored level but is not flagged.
    pub leveled_up: bool,
}

// ============================================================================
// XpReason — Why a delta was applied
// ============================================================================

/// The activity that triggered an XP delta.
///
/// Recorded in the audit log so revocations and awards can be traced back
/// to the action that caused them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum XpReason {
    /// A mission was marked completed (+reward).
    MissionCompleted {
        /// The mission that was completed.
        mission_id: MissionId,
    },

    /// A completed mission was marked pending again (-reward).
    MissionReverted {
        /// The mission that was reverted.
        mission_id: MissionId,
    },

    /// The user viewed a college detail page.
    CollegeViewed {
        /// The college that was viewed.
        college_id: CollegeId,
    },

    /// The user booked a mentor session.
    SessionBooked {
        /// The session that was booked.
        session_id: SessionId,
    },
}

// ============================================================================
// XpEvent — Audit log entry
// ============================================================================

/// One entry in the per-user XP audit log.
///
/// The engine only needs the cumulative effect to enforce its invariants,
/// but the log makes awards and revocations observable after the fact.
/// Events are appended in the same transaction as the progress write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpEvent {
    /// Unique identifier (UUID v7, time-ordered).
    pub id: EventId,

    /// The user whose progress changed.
    pub user_id: UserId,

    /// Signed delta as requested (before clamping).
    pub delta: i64,

    /// The activity that triggered the delta.
    pub reason: XpReason,

    /// XP after the delta was applied and clamped.
    pub xp_after: u64,

    /// Level after the delta was applied.
    pub level_after: u32,

    /// When the delta was applied.
    pub recorded_at: Timestamp,
}
