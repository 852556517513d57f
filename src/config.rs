//! Configuration types for Questline.
//!
//! The [`Config`] struct controls engine behavior including:
//! - Level width (XP per level bucket, locked at database creation)
//! - Flat award rates for side activities
//! - Cache size for the storage engine
//!
//! # Example
//! ```rust
//! use questline::Config;
//!
//! // Use defaults (100 XP per level, +5 per college view, +15 per booking)
//! let config = Config::default();
//!
//! // Customize award rates
//! let config = Config {
//!     college_view_xp: 10,
//!     ..Default::default()
//! };
//! ```

use crate::error::ValidationError;

/// Default XP bucket width per level.
pub const DEFAULT_LEVEL_WIDTH: u32 = 100;

/// Default flat award for viewing a college.
pub const DEFAULT_COLLEGE_VIEW_XP: u32 = 5;

/// Default flat award for booking a mentor session.
pub const DEFAULT_SESSION_BOOKING_XP: u32 = 15;

/// Engine configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use questline::Config;
///
/// let config = Config {
///     cache_size_mb: 256,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// XP bucket width per level: `level = xp / level_width + 1`.
    ///
    /// Locked into database metadata at creation. Reopening with a
    /// different width fails, since stored levels would no longer match
    /// stored XP.
    pub level_width: u32,

    /// Flat XP awarded when a user views a college.
    pub college_view_xp: u32,

    /// Flat XP awarded when a user books a mentor session.
    ///
    /// Cancelling a session never revokes this award.
    pub session_booking_xp: u32,

    /// Cache size in megabytes for the storage engine.
    ///
    /// Higher values improve read performance but use more memory.
    /// Default: 64 MB
    pub cache_size_mb: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // 100 matches the portal's original progression curve
            level_width: DEFAULT_LEVEL_WIDTH,
            college_view_xp: DEFAULT_COLLEGE_VIEW_XP,
            session_booking_xp: DEFAULT_SESSION_BOOKING_XP,
            cache_size_mb: 64,
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Config with a custom level width.
    ///
    /// # Example
    /// ```rust
    /// use questline::Config;
    ///
    /// // Slower progression: 250 XP per level
    /// let config = Config::with_level_width(250);
    /// ```
    pub fn with_level_width(level_width: u32) -> Self {
        Self {
            level_width,
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `Questline::open()`. You can also call this
    /// explicitly to check configuration before attempting to open.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - `level_width` is 0
    /// - `cache_size_mb` is 0
    pub fn validate(&self) -> Result<(), ValidationError> {
        // A zero-width level bucket would divide by zero
        if self.level_width == 0 {
            return Err(ValidationError::invalid_field(
                "level_width",
                "must be greater than 0",
            ));
        }

        // Cache size must be positive
        if self.cache_size_mb == 0 {
            return Err(ValidationError::invalid_field(
                "cache_size_mb",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}
