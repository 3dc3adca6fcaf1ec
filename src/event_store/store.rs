//! Event Store - deduplicated, per-user collection of event records
//!
//! The store keeps records in insertion order, keyed by event id. It is
//! loaded at the start of a feed cycle, pruned, extended with freshly
//! fetched records and written back at the end.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;

use crate::error::{FeedError, FeedResult};
use crate::types::EventRecord;

use super::snapshot::StoreFile;

/// Default retention window in days
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Where stores live on disk
#[derive(Debug, Clone)]
pub struct EventStoreConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl EventStoreConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding one user's files
    pub fn user_dir(&self, user: &str) -> PathBuf {
        self.data_dir.join("users").join(user)
    }

    /// Get path to a user's events.jsonl
    pub fn events_path(&self, user: &str) -> PathBuf {
        self.user_dir(user).join("events.jsonl")
    }

    /// Get path to the backup of a user's previous store
    pub fn backup_path(&self, user: &str) -> PathBuf {
        self.user_dir(user).join("events.jsonl.bak")
    }
}

/// Check that a user name is a plausible GitHub login
///
/// Logins become directory names, so anything other than ASCII
/// alphanumerics and inner hyphens is rejected.
pub fn validate_user(user: &str) -> FeedResult<()> {
    let valid = !user.is_empty()
        && user.len() <= 39
        && !user.starts_with('-')
        && !user.ends_with('-')
        && user.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(FeedError::InvalidUser(user.to_string()))
    }
}

/// One user's event records
#[derive(Debug)]
pub struct EventStore {
    config: EventStoreConfig,
    user: String,
    records: IndexMap<String, EventRecord>,
}

impl EventStore {
    /// Create an empty store for `user`. Nothing is read from disk.
    pub fn new(config: EventStoreConfig, user: &str) -> FeedResult<Self> {
        validate_user(user)?;
        Ok(Self {
            config,
            user: user.to_string(),
            records: IndexMap::new(),
        })
    }

    /// Create a store for `user` and load its persisted state
    pub fn open(config: EventStoreConfig, user: &str) -> FeedResult<Self> {
        let mut store = Self::new(config, user)?;
        store.load()?;
        Ok(store)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn config(&self) -> &EventStoreConfig {
        &self.config
    }

    fn file(&self) -> StoreFile {
        StoreFile::new(
            self.config.events_path(&self.user),
            self.config.backup_path(&self.user),
        )
    }

    /// Replace the in-memory records with the persisted state
    ///
    /// Missing storage leaves the store empty. An unreadable file fails
    /// with `StorageCorrupt`.
    pub fn load(&mut self) -> FeedResult<()> {
        self.records.clear();
        if let Some((_meta, records)) = self.file().load()? {
            self.insert_loaded(records);
        }
        Ok(())
    }

    /// Replace the in-memory records with the backup of the previous save
    ///
    /// Returns false when there is no backup.
    pub fn recover_from_backup(&mut self) -> FeedResult<bool> {
        match self.file().load_backup()? {
            Some((_meta, records)) => {
                self.records.clear();
                self.insert_loaded(records);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_loaded(&mut self, records: Vec<EventRecord>) {
        for record in records {
            self.records
                .entry(record.id().to_string())
                .or_insert(record);
        }
    }

    /// Atomically persist the current records
    pub fn save(&self) -> FeedResult<()> {
        self.file().save(&self.user, self.records.values())
    }

    /// Remove every record created before `now - retention`
    ///
    /// A record exactly on the boundary is kept. A window reaching past the
    /// earliest representable date keeps everything. Returns the number removed.
    pub fn evict_stale(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let oldest = now
            .checked_sub_signed(retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let before = self.records.len();
        self.records.retain(|_, record| record.created_at() >= oldest);
        before - self.records.len()
    }

    /// Insert records whose id is not stored yet
    ///
    /// Existing records are never overwritten. Returns the number inserted.
    pub fn add_new<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = EventRecord>,
    {
        let mut added = 0;
        for record in records {
            if self.records.contains_key(record.id()) {
                continue;
            }
            self.records.insert(record.id().to_string(), record);
            added += 1;
        }
        added
    }

    /// All stored records, in no particular order
    pub fn all(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.values()
    }

    pub fn get(&self, id: &str) -> Option<&EventRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Newest `created_at` in the store, or `MIN_UTC` when empty
    pub fn latest_event_date(&self) -> DateTime<Utc> {
        latest_event_date(self.all())
    }
}

/// Newest `created_at` among `records`, or `MIN_UTC` when there are none
pub fn latest_event_date<'a, I>(records: I) -> DateTime<Utc>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    records
        .into_iter()
        .map(|r| r.created_at())
        .max()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
