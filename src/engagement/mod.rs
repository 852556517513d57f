//! Side-activity module: mentor sessions and recently-viewed colleges.
//!
//! Both activities award flat-rate XP through the same delta rule as
//! missions. The asymmetries are deliberate and carried over from the
//! portal's behavior:
//!
//! - Viewing a college awards XP every time, including repeat views.
//! - Booking a session awards XP; cancelling the session later does NOT
//!   revoke it.
//!
//! # Operations
//!
//! All engagement operations are available on [`Questline`](crate::Questline):
//!
//! - [`view_college(user_id, college_id)`](crate::Questline::view_college)
//! - [`recently_viewed(user_id, limit)`](crate::Questline::recently_viewed)
//! - [`book_session(new_session)`](crate::Questline::book_session)
//! - [`cancel_session(session_id, user_id)`](crate::Questline::cancel_session)
//! - [`sessions(user_id)`](crate::Questline::sessions)

pub mod types;

pub use types::{CollegeView, MentorSession, NewSession, SessionStatus};

use crate::error::{QuestlineError, ValidationError};
use crate::mission::validate_user_id;

/// Validates a [`NewSession`] before storage.
///
/// The scheduled time is accepted as-is; the portal lets users book past
/// slots and surfaces that in the UI, not here. Only the identifiers are
/// checked.
pub(crate) fn validate_new_session(session: &NewSession) -> Result<(), QuestlineError> {
    validate_user_id(&session.user_id)?;

    if session.mentor_id.as_u64() == 0 {
        return Err(ValidationError::invalid_field("mentor_id", "must be a valid catalog key").into());
    }

    Ok(())
}
