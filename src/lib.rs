//! # Questline
//!
//! Embedded progression engine for gamified learning platforms - the single
//! authority over XP, levels, and weekly missions.
//!
//! Questline converts user actions (completing a mission, booking a mentor
//! session, viewing a college) into experience points, derives levels from
//! cumulative XP, detects level-up transitions, and keeps mission state
//! consistent with awarded and revoked XP.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use questline::{Questline, Config, UserId, CollegeId};
//!
//! // Open or create a database
//! let db = Questline::open("./questline.db", Config::default())?;
//!
//! // Register a user (xp = 0, level = 1)
//! let user = UserId::new("user-1");
//! db.register_user(user.clone())?;
//!
//! // Seed and list the weekly missions
//! let missions = db.missions(&user)?;
//!
//! // Complete one; the outcome carries the level-up flag
//! let toggle = db.toggle_mission(missions[0].id, &user, true)?;
//! if toggle.outcome.leveled_up {
//!     println!("Reached level {}!", toggle.outcome.new_level);
//! }
//!
//! // Clean up
//! db.close()?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Progress
//!
//! Each user has one **progress record**: cumulative XP and the level
//! derived from it (`level = xp / level_width + 1`, default width 100).
//! The two fields are written together in one transaction and never
//! diverge. XP clamps at zero; revocations can never drive it negative.
//!
//! ### Missions
//!
//! A **mission** is a task with a fixed XP reward, togglable between
//! pending and completed. Completing awards the reward; reverting revokes
//! the same amount, so toggle-and-back is an exact undo. New users are
//! seeded with a default weekly set on first observation.
//!
//! ### Side activities
//!
//! Viewing a college and booking a mentor session award flat-rate XP.
//! Cancelling a session keeps the award - sessions are cancellable
//! without penalty.
//!
//! ## Thread Safety
//!
//! `Questline` is `Send + Sync` and can be shared across threads using
//! `Arc`. XP-affecting operations are serialized per user, so concurrent
//! actions compose correctly instead of losing updates.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod db;
mod error;
mod types;

pub mod storage;

// Domain modules
mod engagement;
mod mission;
mod progress;

pub mod provider;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main engine interface
pub use db::Questline;

// Configuration
pub use config::{
    Config, DEFAULT_COLLEGE_VIEW_XP, DEFAULT_LEVEL_WIDTH, DEFAULT_SESSION_BOOKING_XP,
};

// Error handling
pub use error::{NotFoundError, QuestlineError, Result, StorageError, ValidationError};

// Core types
pub use types::{CollegeId, EventId, MentorId, MissionId, SessionId, Timestamp, UserId};

// Domain types
pub use engagement::{CollegeView, MentorSession, NewSession, SessionStatus};
pub use mission::{Mission, MissionStatus, MissionToggle, NewMission};
pub use progress::{UserProgress, XpEvent, XpOutcome, XpReason};

// Storage (for advanced users)
pub use storage::DatabaseMetadata;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common Questline usage.
///
/// ```rust
/// use questline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::db::Questline;
    pub use crate::error::{QuestlineError, Result};
    pub use crate::mission::{Mission, MissionStatus, NewMission};
    pub use crate::progress::{UserProgress, XpOutcome, XpReason};
    pub use crate::types::{CollegeId, MentorId, MissionId, SessionId, Timestamp, UserId};
}
