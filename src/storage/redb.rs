//! redb storage engine implementation.
//!
//! This module provides the primary storage backend for Questline using
//! [redb](https://docs.rs/redb), a pure Rust embedded key-value store.
//!
//! # Features
//!
//! - ACID transactions with MVCC
//! - Single-writer, multiple-reader concurrency
//! - Automatic crash recovery
//! - Zero external dependencies (pure Rust)
//!
//! # File Layout
//!
//! When you open a database at `./questline.db`, redb creates:
//! - `./questline.db` - Main database file
//! - `./questline.db.lock` - Lock file for writer coordination (may not be visible)

use std::path::{Path, PathBuf};

use ::redb::{Database, ReadableMultimapTable, ReadableTable};
use tracing::{debug, info, instrument, warn};

use super::schema::{
    DatabaseMetadata, COLLEGE_VIEWS_TABLE, EVENTS_BY_USER_TABLE, EVENTS_TABLE, METADATA_TABLE,
    MISSIONS_BY_USER_TABLE, MISSIONS_TABLE, PROGRESS_TABLE, SCHEMA_VERSION,
    SESSIONS_BY_USER_TABLE, SESSIONS_TABLE,
};
use super::StorageEngine;
use crate::config::Config;
use crate::engagement::{CollegeView, MentorSession};
use crate::error::{QuestlineError, Result, StorageError, ValidationError};
use crate::mission::Mission;
use crate::progress::{UserProgress, XpEvent};
use crate::storage::schema::{decode_view_entry, encode_view_entry};
use crate::types::{MissionId, SessionId, UserId};

/// Metadata key in the metadata table.
const METADATA_KEY: &str = "db_metadata";

/// redb storage engine wrapper.
///
/// This struct holds the redb database handle and cached metadata.
/// It implements [`StorageEngine`] for use with Questline.
///
/// # Thread Safety
///
/// `RedbStorage` is `Send + Sync`. redb handles internal synchronization
/// using MVCC for readers and exclusive locking for writers.
#[derive(Debug)]
pub struct RedbStorage {
    /// The redb database handle.
    db: Database,

    /// Cached database metadata.
    metadata: DatabaseMetadata,

    /// Path to the database file.
    path: PathBuf,
}

impl RedbStorage {
    /// Opens or creates a database at the given path.
    ///
    /// If the database doesn't exist, it will be created and initialized
    /// with the configuration settings. If it exists, the configuration
    /// will be validated against the stored metadata.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database file
    /// * `config` - Engine configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The database file is corrupted
    /// - The database is locked by another process
    /// - Schema version doesn't match
    /// - Level width doesn't match (for existing databases)
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use questline::{Config, storage::RedbStorage};
    ///
    /// let storage = RedbStorage::open("./questline.db", &Config::default())?;
    /// ```
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let db_exists = path.exists();

        debug!(db_exists = db_exists, "Opening storage engine");

        // Create or open the database
        let db = Self::create_database(path, config)?;

        if db_exists {
            // Validate existing database
            Self::open_existing(db, path.to_path_buf(), config)
        } else {
            // Initialize new database
            Self::initialize_new(db, path.to_path_buf(), config)
        }
    }

    /// Creates the redb database with appropriate settings.
    fn create_database(path: &Path, _config: &Config) -> Result<Database> {
        let builder = Database::builder();

        // Note: redb 2.x doesn't have set_cache_size, it manages memory internally
        // The cache_size_mb config will be used for future optimizations

        // Note: redb doesn't expose a typed error variant for lock conflicts,
        // so we detect them via error message string matching. This may need
        // updating if redb changes its error messages in a future version.
        let db = builder.create(path).map_err(|e| {
            if e.to_string().contains("locked") {
                StorageError::DatabaseLocked
            } else {
                StorageError::Redb(e.to_string())
            }
        })?;

        debug!("Database file opened successfully");
        Ok(db)
    }

    /// Initializes a new database with tables and metadata.
    #[instrument(skip(db, config), fields(path = %path.display()))]
    fn initialize_new(db: Database, path: PathBuf, config: &Config) -> Result<Self> {
        info!("Initializing new database");

        let metadata = DatabaseMetadata::new(config.level_width);

        // Create all tables and write metadata in a single transaction
        let write_txn = db.begin_write().map_err(StorageError::from)?;

        {
            // Create the metadata table and write metadata
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;

            // Create other tables up front so read transactions never hit
            // a missing-table error
            let _ = write_txn.open_table(PROGRESS_TABLE)?;
            let _ = write_txn.open_table(MISSIONS_TABLE)?;
            let _ = write_txn.open_table(SESSIONS_TABLE)?;
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_multimap_table(MISSIONS_BY_USER_TABLE)?;
            let _ = write_txn.open_multimap_table(SESSIONS_BY_USER_TABLE)?;
            let _ = write_txn.open_multimap_table(COLLEGE_VIEWS_TABLE)?;
            let _ = write_txn.open_multimap_table(EVENTS_BY_USER_TABLE)?;
        }

        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = SCHEMA_VERSION,
            level_width = config.level_width,
            "Database initialized"
        );

        Ok(Self { db, metadata, path })
    }

    /// Opens and validates an existing database.
    #[instrument(skip(db, config), fields(path = %path.display()))]
    fn open_existing(db: Database, path: PathBuf, config: &Config) -> Result<Self> {
        info!("Opening existing database");

        // Read metadata from the database
        let read_txn = db.begin_read().map_err(StorageError::from)?;

        let metadata = {
            let meta_table = read_txn.open_table(METADATA_TABLE).map_err(|e| {
                StorageError::corrupted(format!("Cannot open metadata table: {}", e))
            })?;

            let metadata_bytes = meta_table
                .get(METADATA_KEY)
                .map_err(StorageError::from)?
                .ok_or_else(|| StorageError::corrupted("Missing database metadata"))?;

            bincode::deserialize::<DatabaseMetadata>(metadata_bytes.value())
                .map_err(|e| StorageError::corrupted(format!("Invalid metadata format: {}", e)))?
        };

        drop(read_txn);

        // Validate schema version
        if metadata.schema_version != SCHEMA_VERSION {
            warn!(
                expected = SCHEMA_VERSION,
                found = metadata.schema_version,
                "Schema version mismatch"
            );
            return Err(QuestlineError::Storage(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: metadata.schema_version,
            }));
        }

        // Validate level width — stored levels are derived from it, so a
        // different width would silently break the level invariant
        if metadata.level_width != config.level_width {
            warn!(
                expected = config.level_width,
                found = metadata.level_width,
                "Level width mismatch"
            );
            return Err(QuestlineError::Validation(
                ValidationError::LevelWidthMismatch {
                    expected: metadata.level_width,
                    got: config.level_width,
                },
            ));
        }

        // Update last_opened_at timestamp
        let mut metadata = metadata;
        metadata.touch();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = metadata.schema_version,
            level_width = metadata.level_width,
            "Database opened successfully"
        );

        Ok(Self { db, metadata, path })
    }

    /// Serializes a record for storage.
    fn to_bytes<T: serde::Serialize>(record: &T) -> Result<Vec<u8>> {
        bincode::serialize(record)
            .map_err(|e| StorageError::serialization(e.to_string()).into())
    }

    /// Deserializes a record from storage.
    fn from_bytes<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| StorageError::serialization(e.to_string()).into())
    }
}

impl StorageEngine for RedbStorage {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    #[instrument(skip(self))]
    fn close(self: Box<Self>) -> Result<()> {
        info!("Closing storage engine");

        // redb flushes all data durably on drop. Since `Database::drop` is
        // infallible, this method currently always returns Ok(()). The Result
        // return type is retained for API forward-compatibility if a future
        // storage backend can report flush errors.
        drop(self.db);

        info!("Storage engine closed");
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    // =========================================================================
    // Progress Operations
    // =========================================================================

    fn create_progress(&self, progress: &UserProgress) -> Result<()> {
        let bytes = Self::to_bytes(progress)?;

        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut table = write_txn.open_table(PROGRESS_TABLE)?;
            table.insert(progress.user_id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(user = %progress.user_id, "Progress record created");
        Ok(())
    }

    fn read_progress(&self, user_id: &UserId) -> Result<Option<UserProgress>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(PROGRESS_TABLE)?;

        match table.get(user_id.as_str())? {
            Some(value) => Ok(Some(Self::from_bytes(value.value())?)),
            None => Ok(None),
        }
    }

    fn commit_progress(&self, progress: &UserProgress, event: &XpEvent) -> Result<()> {
        let progress_bytes = Self::to_bytes(progress)?;
        let event_bytes = Self::to_bytes(event)?;

        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut progress_table = write_txn.open_table(PROGRESS_TABLE)?;
            progress_table.insert(progress.user_id.as_str(), progress_bytes.as_slice())?;

            let mut events_table = write_txn.open_table(EVENTS_TABLE)?;
            events_table.insert(event.id.as_bytes(), event_bytes.as_slice())?;

            let mut events_index = write_txn.open_multimap_table(EVENTS_BY_USER_TABLE)?;
            events_index.insert(event.user_id.as_str(), event.id.as_bytes())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(
            user = %progress.user_id,
            xp = progress.xp,
            level = progress.level,
            "Progress committed"
        );
        Ok(())
    }

    fn top_by_xp(&self, limit: usize) -> Result<Vec<UserProgress>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(PROGRESS_TABLE)?;

        // Full scan; the progress table holds one small record per account
        // and leaderboard queries are infrequent.
        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result.map_err(StorageError::from)?;
            records.push(Self::from_bytes::<UserProgress>(value.value())?);
        }

        records.sort_by(|a, b| {
            b.xp.cmp(&a.xp)
                .then_with(|| a.user_id.as_str().cmp(b.user_id.as_str()))
        });
        records.truncate(limit);

        Ok(records)
    }

    // =========================================================================
    // Mission Operations
    // =========================================================================

    fn save_missions(&self, missions: &[Mission]) -> Result<()> {
        // Serialize up front so a bad record can't abort a half-written txn
        let mut serialized = Vec::with_capacity(missions.len());
        for mission in missions {
            serialized.push(Self::to_bytes(mission)?);
        }

        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut table = write_txn.open_table(MISSIONS_TABLE)?;
            let mut index = write_txn.open_multimap_table(MISSIONS_BY_USER_TABLE)?;

            for (mission, bytes) in missions.iter().zip(&serialized) {
                table.insert(mission.id.as_bytes(), bytes.as_slice())?;
                // Multimap insert is set-like; re-saving an existing mission
                // leaves the index unchanged
                index.insert(mission.user_id.as_str(), mission.id.as_bytes())?;
            }
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(count = missions.len(), "Missions saved");
        Ok(())
    }

    fn get_mission(&self, id: MissionId) -> Result<Option<Mission>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(MISSIONS_TABLE)?;

        match table.get(id.as_bytes())? {
            Some(value) => Ok(Some(Self::from_bytes(value.value())?)),
            None => Ok(None),
        }
    }

    fn missions_for_user(&self, user_id: &UserId) -> Result<Vec<Mission>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let index = read_txn.open_multimap_table(MISSIONS_BY_USER_TABLE)?;
        let table = read_txn.open_table(MISSIONS_TABLE)?;

        let mut missions = Vec::new();
        for entry in index.get(user_id.as_str())? {
            let guard = entry.map_err(StorageError::from)?;
            let mission_bytes = table
                .get(guard.value())?
                .ok_or_else(|| StorageError::corrupted("Mission index points at missing record"))?;
            missions.push(Self::from_bytes::<Mission>(mission_bytes.value())?);
        }

        // v7 IDs make index order creation order
        Ok(missions)
    }

    fn commit_mission_toggle(
        &self,
        mission: &Mission,
        progress: &UserProgress,
        event: &XpEvent,
    ) -> Result<()> {
        let mission_bytes = Self::to_bytes(mission)?;
        let progress_bytes = Self::to_bytes(progress)?;
        let event_bytes = Self::to_bytes(event)?;

        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut missions_table = write_txn.open_table(MISSIONS_TABLE)?;
            missions_table.insert(mission.id.as_bytes(), mission_bytes.as_slice())?;

            let mut progress_table = write_txn.open_table(PROGRESS_TABLE)?;
            progress_table.insert(progress.user_id.as_str(), progress_bytes.as_slice())?;

            let mut events_table = write_txn.open_table(EVENTS_TABLE)?;
            events_table.insert(event.id.as_bytes(), event_bytes.as_slice())?;

            let mut events_index = write_txn.open_multimap_table(EVENTS_BY_USER_TABLE)?;
            events_index.insert(event.user_id.as_str(), event.id.as_bytes())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(
            mission = %mission.id,
            user = %progress.user_id,
            status = mission.status.as_str(),
            xp = progress.xp,
            "Mission toggle committed"
        );
        Ok(())
    }

    // =========================================================================
    // Session Operations
    // =========================================================================

    fn save_session(&self, session: &MentorSession) -> Result<()> {
        let bytes = Self::to_bytes(session)?;

        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut table = write_txn.open_table(SESSIONS_TABLE)?;
            table.insert(session.id.as_bytes(), bytes.as_slice())?;

            let mut index = write_txn.open_multimap_table(SESSIONS_BY_USER_TABLE)?;
            index.insert(session.user_id.as_str(), session.id.as_bytes())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(id = %session.id, user = %session.user_id, "Session saved");
        Ok(())
    }

    fn get_session(&self, id: SessionId) -> Result<Option<MentorSession>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(SESSIONS_TABLE)?;

        match table.get(id.as_bytes())? {
            Some(value) => Ok(Some(Self::from_bytes(value.value())?)),
            None => Ok(None),
        }
    }

    fn sessions_for_user(&self, user_id: &UserId) -> Result<Vec<MentorSession>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let index = read_txn.open_multimap_table(SESSIONS_BY_USER_TABLE)?;
        let table = read_txn.open_table(SESSIONS_TABLE)?;

        let mut sessions = Vec::new();
        for entry in index.get(user_id.as_str())? {
            let guard = entry.map_err(StorageError::from)?;
            let session_bytes = table
                .get(guard.value())?
                .ok_or_else(|| StorageError::corrupted("Session index points at missing record"))?;
            sessions.push(Self::from_bytes::<MentorSession>(session_bytes.value())?);
        }

        Ok(sessions)
    }

    fn commit_session_booking(
        &self,
        session: &MentorSession,
        progress: &UserProgress,
        event: &XpEvent,
    ) -> Result<()> {
        let session_bytes = Self::to_bytes(session)?;
        let progress_bytes = Self::to_bytes(progress)?;
        let event_bytes = Self::to_bytes(event)?;

        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut sessions_table = write_txn.open_table(SESSIONS_TABLE)?;
            sessions_table.insert(session.id.as_bytes(), session_bytes.as_slice())?;

            let mut sessions_index = write_txn.open_multimap_table(SESSIONS_BY_USER_TABLE)?;
            sessions_index.insert(session.user_id.as_str(), session.id.as_bytes())?;

            let mut progress_table = write_txn.open_table(PROGRESS_TABLE)?;
            progress_table.insert(progress.user_id.as_str(), progress_bytes.as_slice())?;

            let mut events_table = write_txn.open_table(EVENTS_TABLE)?;
            events_table.insert(event.id.as_bytes(), event_bytes.as_slice())?;

            let mut events_index = write_txn.open_multimap_table(EVENTS_BY_USER_TABLE)?;
            events_index.insert(event.user_id.as_str(), event.id.as_bytes())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(
            session = %session.id,
            user = %progress.user_id,
            xp = progress.xp,
            "Session booking committed"
        );
        Ok(())
    }

    // =========================================================================
    // College View Operations
    // =========================================================================

    fn commit_college_view(
        &self,
        user_id: &UserId,
        view: &CollegeView,
        progress: &UserProgress,
        event: &XpEvent,
    ) -> Result<()> {
        let progress_bytes = Self::to_bytes(progress)?;
        let event_bytes = Self::to_bytes(event)?;
        let entry = encode_view_entry(view.viewed_at, view.college_id.as_u64());

        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut views_table = write_txn.open_multimap_table(COLLEGE_VIEWS_TABLE)?;
            views_table.insert(user_id.as_str(), &entry)?;

            let mut progress_table = write_txn.open_table(PROGRESS_TABLE)?;
            progress_table.insert(progress.user_id.as_str(), progress_bytes.as_slice())?;

            let mut events_table = write_txn.open_table(EVENTS_TABLE)?;
            events_table.insert(event.id.as_bytes(), event_bytes.as_slice())?;

            let mut events_index = write_txn.open_multimap_table(EVENTS_BY_USER_TABLE)?;
            events_index.insert(event.user_id.as_str(), event.id.as_bytes())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(
            user = %user_id,
            college = %view.college_id,
            "College view committed"
        );
        Ok(())
    }

    fn recent_views(&self, user_id: &UserId, limit: usize) -> Result<Vec<CollegeView>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_multimap_table(COLLEGE_VIEWS_TABLE)?;

        // Entries sort ascending by (timestamp, college); collect all and
        // keep the newest `limit`
        let mut entries = Vec::new();
        for entry in table.get(user_id.as_str())? {
            let guard = entry.map_err(StorageError::from)?;
            entries.push(*guard.value());
        }

        let newest = entries.len().saturating_sub(limit);
        let mut views: Vec<CollegeView> = entries[newest..]
            .iter()
            .map(|entry| {
                let (viewed_at, college_id) = decode_view_entry(entry);
                CollegeView {
                    college_id: crate::types::CollegeId::new(college_id),
                    viewed_at,
                }
            })
            .collect();
        views.reverse();

        Ok(views)
    }

    // =========================================================================
    // XP Event Operations
    // =========================================================================

    fn events_for_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<XpEvent>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let index = read_txn.open_multimap_table(EVENTS_BY_USER_TABLE)?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        // v7 event IDs sort chronologically; keep the newest `limit`
        let mut ids = Vec::new();
        for entry in index.get(user_id.as_str())? {
            let guard = entry.map_err(StorageError::from)?;
            ids.push(*guard.value());
        }

        let newest = ids.len().saturating_sub(limit);
        let mut events = Vec::new();
        for id in ids[newest..].iter().rev() {
            let event_bytes = table
                .get(id)?
                .ok_or_else(|| StorageError::corrupted("Event index points at missing record"))?;
            events.push(Self::from_bytes::<XpEvent>(event_bytes.value())?);
        }

        Ok(events)
    }
}

// RedbStorage is auto Send + Sync: Database, DatabaseMetadata, and PathBuf
// are all Send + Sync.
