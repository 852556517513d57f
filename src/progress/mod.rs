//! User progression module.
//!
//! This module owns the XP arithmetic: converting a signed delta into a new
//! `(xp, level)` pair and detecting level-up transitions. The rules are pure
//! functions here; [`Questline`](crate::Questline) wraps them with the
//! per-user locking and atomic persistence that make them safe to call
//! concurrently.
//!
//! # Rules
//!
//! - XP clamps at zero: a revocation can never drive it negative. This is
//!   a floor, not an error.
//! - `level = xp / level_width + 1`, computed in exactly one place.
//! - `leveled_up` is true iff the level strictly increased. Level decreases
//!   still update the stored level but are not flagged.

pub mod types;

pub use types::{UserProgress, XpEvent, XpOutcome, XpReason};

/// Derives the level for a given XP total.
///
/// Levels are fixed-width buckets: 0..width is level 1, width..2*width is
/// level 2, and so on. `width` is validated non-zero at config time.
#[inline]
pub(crate) fn level_for_xp(xp: u64, level_width: u32) -> u32 {
    let level = (xp / u64::from(level_width)).saturating_add(1);
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// Applies a signed delta to an XP total, clamping at zero.
#[inline]
pub(crate) fn clamp_delta(xp: u64, delta: i64) -> u64 {
    if delta >= 0 {
        xp.saturating_add(delta as u64)
    } else {
        xp.saturating_sub(delta.unsigned_abs())
    }
}

/// Computes the outcome of applying `delta` to a `(xp, level)` pair.
///
/// This is the whole leveling rule. Callers persist the returned values
/// verbatim; nothing else in the crate derives a level from XP.
pub(crate) fn apply_delta(xp: u64, level: u32, delta: i64, level_width: u32) -> XpOutcome {
    let new_xp = clamp_delta(xp, delta);
    let new_level = level_for_xp(new_xp, level_width);

    XpOutcome {
        new_xp,
        new_level,
        leveled_up: new_level > level,
    }
}
