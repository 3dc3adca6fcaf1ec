//! Header line of a persisted event store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a file as an event-feed store
pub const STORE_FORMAT: &str = "event-feed";

/// Newest store layout this crate reads and writes
pub const STORE_VERSION: u32 = 1;

/// First line of every store file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMeta {
    pub format: String,
    pub version: u32,
    pub user: String,
    pub record_count: usize,
    pub saved_at: DateTime<Utc>,
}

impl StoreMeta {
    pub fn new(user: &str, record_count: usize) -> Self {
        Self {
            format: STORE_FORMAT.to_string(),
            version: STORE_VERSION,
            user: user.to_string(),
            record_count,
            saved_at: Utc::now(),
        }
    }

    /// Parse from JSON string (first line of a store file)
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Whether this crate knows how to read the file
    pub fn is_supported(&self) -> bool {
        self.format == STORE_FORMAT && self.version <= STORE_VERSION
    }
}
