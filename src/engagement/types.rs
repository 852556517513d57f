//! Type definitions for side activities: mentor sessions and college views.

use serde::{Deserialize, Serialize};

use crate::types::{CollegeId, MentorId, SessionId, Timestamp, UserId};

// ============================================================================
// SessionStatus
// ============================================================================

/// The lifecycle states of a mentor session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Booked and scheduled.
    Confirmed,
    /// Cancelled by the user. The booking XP is not revoked.
    Cancelled,
}

impl SessionStatus {
    /// Returns the status as a lowercase string, matching the portal's
    /// display vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

// ============================================================================
// MentorSession — The stored record
// ============================================================================

/// A booked mentor session.
///
/// Booking awards a flat XP amount; cancellation flips the status but
/// deliberately leaves the award in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorSession {
    /// Unique identifier (UUID v7, time-ordered).
    pub id: SessionId,

    /// The user who booked the session.
    pub user_id: UserId,

    /// The mentor the session is with (opaque catalog reference).
    pub mentor_id: MentorId,

    /// When the session is scheduled to take place.
    pub scheduled_for: Timestamp,

    /// Current state.
    pub status: SessionStatus,

    /// When the booking was made.
    pub created_at: Timestamp,
}

impl MentorSession {
    /// Marks the session cancelled. Idempotent on an already-cancelled
    /// session.
    pub(crate) fn cancel(&mut self) {
        self.status = SessionStatus::Cancelled;
    }
}

// ============================================================================
// NewSession — Input for book_session()
// ============================================================================

/// Input for booking a session via
/// [`Questline::book_session()`](crate::Questline::book_session).
#[derive(Clone, Debug)]
pub struct NewSession {
    /// The user booking the session.
    pub user_id: UserId,

    /// The mentor to book with.
    pub mentor_id: MentorId,

    /// When the session should take place.
    pub scheduled_for: Timestamp,
}

// ============================================================================
// CollegeView — Recently-viewed entry
// ============================================================================

/// One recently-viewed-college entry.
///
/// Recorded each time a user opens a college detail page; the query side
/// returns the newest entries first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollegeView {
    /// The college that was viewed (opaque catalog reference).
    pub college_id: CollegeId,

    /// When it was viewed.
    pub viewed_at: Timestamp,
}
