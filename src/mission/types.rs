//! Type definitions for missions.
//!
//! A **mission** is a user-assigned task carrying a fixed XP reward,
//! togglable between pending and completed. The two-state machine is
//! reversible: `pending --complete--> completed --revert--> pending`.
//! No other transitions exist.

use serde::{Deserialize, Serialize};

use crate::progress::XpOutcome;
use crate::types::{MissionId, Timestamp, UserId};

// ============================================================================
// MissionStatus
// ============================================================================

/// The two mission states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionStatus {
    /// Not yet completed (initial state).
    Pending,
    /// Completed; `completed_on` records when.
    Completed,
}

impl MissionStatus {
    /// Returns the status as a lowercase string, matching the portal's
    /// display vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

// ============================================================================
// Mission — The stored record
// ============================================================================

/// A stored mission.
///
/// Invariant: `status == Completed` iff `completed_on` is present. The
/// transition methods keep the two fields in lockstep; nothing else in
/// the crate writes them independently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    /// Unique identifier (UUID v7, time-ordered).
    pub id: MissionId,

    /// The user this mission belongs to.
    pub user_id: UserId,

    /// User-facing task description. Immutable after creation.
    pub text: String,

    /// XP awarded on completion and revoked on reversal. Fixed at
    /// creation; the toggle always moves by exactly this amount.
    pub xp_reward: u32,

    /// Current state.
    pub status: MissionStatus,

    /// When the mission was last marked completed; absent while pending.
    pub completed_on: Option<Timestamp>,

    /// When the mission was created.
    pub created_at: Timestamp,
}

impl Mission {
    /// Marks the mission completed at `now`.
    pub(crate) fn complete(&mut self, now: Timestamp) {
        self.status = MissionStatus::Completed;
        self.completed_on = Some(now);
    }

    /// Marks the mission pending again, clearing the completion time.
    pub(crate) fn revert(&mut self) {
        self.status = MissionStatus::Pending;
        self.completed_on = None;
    }

    /// True iff `status` and `completed_on` agree.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            MissionStatus::Pending => self.completed_on.is_none(),
            MissionStatus::Completed => self.completed_on.is_some(),
        }
    }
}

// ============================================================================
// NewMission — Input for create_mission()
// ============================================================================

/// Input for creating a new mission via
/// [`Questline::create_mission()`](crate::Questline::create_mission).
///
/// The `id`, `status`, `completed_on`, and `created_at` fields are set by
/// the engine; new missions always start pending.
#[derive(Clone, Debug)]
pub struct NewMission {
    /// The user to assign this mission to.
    pub user_id: UserId,

    /// User-facing task description.
    pub text: String,

    /// XP awarded on completion.
    pub xp_reward: u32,
}

// ============================================================================
// MissionToggle — Result of toggle_mission()
// ============================================================================

/// The result of toggling a mission's completion state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissionToggle {
    /// The signed delta that was applied: `+xp_reward` when completing,
    /// `-xp_reward` when reverting.
    pub xp_change: i64,

    /// The progression outcome from applying that delta.
    pub outcome: XpOutcome,
}
