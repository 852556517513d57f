//! Database schema definitions and versioning.
//!
//! This module defines the table structure for the redb storage engine.
//! All table definitions are compile-time constants to ensure consistency.
//!
//! # Schema Versioning
//!
//! The schema version is stored in the metadata table. When opening an
//! existing database, we check the version and fail if it doesn't match.
//! Migration support will be added in a future release.
//!
//! # Table Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ METADATA_TABLE                                               │
//! │   Key: &str                                                  │
//! │   Value: &[u8] (bincode-serialized DatabaseMetadata)         │
//! │   Entries: "db_metadata" -> DatabaseMetadata                 │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │ PROGRESS_TABLE                                               │
//! │   Key: &str (opaque user ID)                                 │
//! │   Value: &[u8] (bincode-serialized UserProgress)             │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │ MISSIONS_TABLE / SESSIONS_TABLE / EVENTS_TABLE               │
//! │   Key: &[u8; 16] (UUID v7 bytes)                             │
//! │   Value: &[u8] (bincode-serialized record)                   │
//! └─────────────────────────────────────────────────────────────┘
//!
//! Per-user multimap indexes map user ID -> record UUID. Because all
//! record IDs are UUID v7, each index's value ordering is chronological.
//! ```

use redb::{MultimapTableDefinition, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Current schema version.
///
/// Increment this when making breaking changes to the schema.
/// The database will refuse to open if versions don't match.
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum mission text size in bytes (1 KB).
pub const MAX_MISSION_TEXT_SIZE: usize = 1024;

/// Maximum length of an opaque user ID in bytes.
pub const MAX_USER_ID_LENGTH: usize = 255;

/// Maximum XP reward a single mission may carry.
pub const MAX_XP_REWARD: u32 = 10_000;

/// Default number of entries returned by recently-viewed queries.
pub const DEFAULT_RECENT_VIEW_LIMIT: usize = 5;

// ============================================================================
// Table Definitions
// ============================================================================

/// Metadata table for database-level information.
///
/// Stores schema version, level width, and timestamps.
/// Key is a string identifier, value is serialized data.
pub const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// User progress table.
///
/// Key: opaque user ID string
/// Value: bincode-serialized UserProgress struct
pub const PROGRESS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("progress");

/// Missions table.
///
/// Key: MissionId as 16-byte UUID
/// Value: bincode-serialized Mission struct
pub const MISSIONS_TABLE: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("missions");

/// Index: missions by user.
///
/// Key: opaque user ID string
/// Value: MissionId as 16-byte UUID (v7, so values sort chronologically)
pub const MISSIONS_BY_USER_TABLE: MultimapTableDefinition<&str, &[u8; 16]> =
    MultimapTableDefinition::new("missions_by_user");

/// Mentor sessions table.
///
/// Key: SessionId as 16-byte UUID
/// Value: bincode-serialized MentorSession struct
pub const SESSIONS_TABLE: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("sessions");

/// Index: sessions by user.
///
/// Key: opaque user ID string
/// Value: SessionId as 16-byte UUID
pub const SESSIONS_BY_USER_TABLE: MultimapTableDefinition<&str, &[u8; 16]> =
    MultimapTableDefinition::new("sessions_by_user");

/// Recently-viewed colleges index.
///
/// Key: opaque user ID string
/// Value: packed (timestamp, college) entry — see [`encode_view_entry`]
///
/// Using a multimap allows many views per user; the big-endian timestamp
/// prefix keeps the value set time-ordered.
pub const COLLEGE_VIEWS_TABLE: MultimapTableDefinition<&str, &[u8; 16]> =
    MultimapTableDefinition::new("college_views");

/// XP event log table.
///
/// Key: EventId as 16-byte UUID
/// Value: bincode-serialized XpEvent struct
pub const EVENTS_TABLE: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("xp_events");

/// Index: XP events by user.
///
/// Key: opaque user ID string
/// Value: EventId as 16-byte UUID (v7, so values sort chronologically)
pub const EVENTS_BY_USER_TABLE: MultimapTableDefinition<&str, &[u8; 16]> =
    MultimapTableDefinition::new("xp_events_by_user");

// ============================================================================
// Database Metadata
// ============================================================================

/// Database metadata stored in the metadata table.
///
/// This is serialized with bincode and stored under the key "db_metadata".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Schema version for compatibility checking.
    pub schema_version: u32,

    /// XP bucket width configured for this database.
    ///
    /// Once set, this cannot be changed without recreating the database:
    /// stored levels are derived from it.
    pub level_width: u32,

    /// Timestamp when the database was created.
    pub created_at: Timestamp,

    /// Last time the database was opened (updated on each open).
    pub last_opened_at: Timestamp,
}

impl DatabaseMetadata {
    /// Creates new metadata for a fresh database.
    pub fn new(level_width: u32) -> Self {
        let now = Timestamp::now();
        Self {
            schema_version: SCHEMA_VERSION,
            level_width,
            created_at: now,
            last_opened_at: now,
        }
    }

    /// Updates the last_opened_at timestamp.
    pub fn touch(&mut self) {
        self.last_opened_at = Timestamp::now();
    }

    /// Checks if this metadata is compatible with the current schema.
    pub fn is_compatible(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

// ============================================================================
// Key Encoding Helpers
// ============================================================================

/// Encodes a (Timestamp, CollegeId) pair for the recently-viewed index.
///
/// Format: [timestamp_be: 8 bytes][college_id_be: 8 bytes] = 16 bytes
///
/// Big-endian timestamp first ensures lexicographic ordering of the
/// multimap values matches view-time ordering.
#[inline]
pub fn encode_view_entry(viewed_at: Timestamp, college_id: u64) -> [u8; 16] {
    let mut entry = [0u8; 16];
    entry[..8].copy_from_slice(&viewed_at.to_be_bytes());
    entry[8..].copy_from_slice(&college_id.to_be_bytes());
    entry
}

/// Decodes a recently-viewed entry back into (Timestamp, CollegeId).
#[inline]
pub fn decode_view_entry(entry: &[u8; 16]) -> (Timestamp, u64) {
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&entry[..8]);
    let mut college = [0u8; 8];
    college.copy_from_slice(&entry[8..]);
    (
        Timestamp::from_millis(i64::from_be_bytes(ts)),
        u64::from_be_bytes(college),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version() {
        assert_eq!(SCHEMA_VERSION, 1);
    }

    #[test]
    fn test_database_metadata_new() {
        let meta = DatabaseMetadata::new(100);
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert_eq!(meta.level_width, 100);
        assert!(meta.is_compatible());
    }

    #[test]
    fn test_database_metadata_touch() {
        let mut meta = DatabaseMetadata::new(100);
        let original = meta.last_opened_at;
        std::thread::sleep(std::time::Duration::from_millis(1));
        meta.touch();
        assert!(meta.last_opened_at > original);
    }

    #[test]
    fn test_database_metadata_serialization() {
        let meta = DatabaseMetadata::new(250);
        let bytes = bincode::serialize(&meta).unwrap();
        let restored: DatabaseMetadata = bincode::deserialize(&bytes).unwrap();
        assert_eq!(meta.schema_version, restored.schema_version);
        assert_eq!(meta.level_width, restored.level_width);
    }

    #[test]
    fn test_encode_view_entry_roundtrip() {
        let ts = Timestamp::from_millis(1234567890);
        let entry = encode_view_entry(ts, 42);
        let (decoded_ts, decoded_college) = decode_view_entry(&entry);
        assert_eq!(decoded_ts, ts);
        assert_eq!(decoded_college, 42);
    }

    #[test]
    fn test_view_entry_ordering() {
        let e1 = encode_view_entry(Timestamp::from_millis(1000), 99);
        let e2 = encode_view_entry(Timestamp::from_millis(2000), 1);

        // Lexicographic ordering should match timestamp ordering even when
        // the later view has a smaller college key
        assert!(e1 < e2);
    }

    #[test]
    fn test_view_entry_same_instant_orders_by_college() {
        let e1 = encode_view_entry(Timestamp::from_millis(1000), 1);
        let e2 = encode_view_entry(Timestamp::from_millis(1000), 2);
        assert!(e1 < e2);
    }
}
