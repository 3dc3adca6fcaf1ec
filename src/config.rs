//! Runtime configuration
//!
//! ```bash
//! FEED_DATA_DIR=/var/lib/event-feed     # store location (default: ./data)
//! FEED_API_BASE=https://api.github.com  # events API base url
//! FEED_BIND=127.0.0.1:3030              # HTTP listen address
//! FEED_PAGE_CAP=10                      # max pages per cycle
//! FEED_RETENTION_DAYS=90                # events older than this are evicted
//! FEED_PAGE_TIMEOUT_SECS=10             # per page request
//! FEED_CYCLE_DEADLINE_SECS=60           # whole load/fetch/save cycle
//! FEED_PERSIST_PARTIAL=false            # save pages fetched before a failure
//! FEED_DISCARD_CORRUPT=false            # fall back to backup/empty on a corrupt store
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::event_store::{EventStoreConfig, DEFAULT_RETENTION_DAYS};
use crate::fetcher::{DEFAULT_API_BASE, DEFAULT_PAGE_CAP};

/// Everything the feed service and the HTTP server need
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub data_dir: PathBuf,
    pub api_base: String,
    pub bind_addr: String,
    pub page_cap: u32,
    pub retention_days: u32,
    pub page_timeout: Duration,
    pub cycle_deadline: Duration,
    /// Save records from pages fetched before a failing page
    pub persist_partial_on_error: bool,
    /// Replace an unreadable store with its backup (or nothing) instead of failing
    pub discard_corrupt_store: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api_base: DEFAULT_API_BASE.to_string(),
            bind_addr: "127.0.0.1:3030".to_string(),
            page_cap: DEFAULT_PAGE_CAP,
            retention_days: DEFAULT_RETENTION_DAYS,
            page_timeout: Duration::from_secs(10),
            cycle_deadline: Duration::from_secs(60),
            persist_partial_on_error: false,
            discard_corrupt_store: false,
        }
    }
}

impl FeedConfig {
    /// Config with defaults and a custom data directory
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Read `FEED_*` environment variables on top of the defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("FEED_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(base) = lookup("FEED_API_BASE") {
            config.api_base = base;
        }
        if let Some(bind) = lookup("FEED_BIND") {
            config.bind_addr = bind;
        }
        if let Some(cap) = parse_var(&lookup, "FEED_PAGE_CAP") {
            config.page_cap = cap;
        }
        if let Some(days) = parse_var(&lookup, "FEED_RETENTION_DAYS") {
            config.retention_days = days;
        }
        if let Some(secs) = parse_var(&lookup, "FEED_PAGE_TIMEOUT_SECS") {
            config.page_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "FEED_CYCLE_DEADLINE_SECS") {
            config.cycle_deadline = Duration::from_secs(secs);
        }
        if let Some(flag) = parse_var(&lookup, "FEED_PERSIST_PARTIAL") {
            config.persist_partial_on_error = flag;
        }
        if let Some(flag) = parse_var(&lookup, "FEED_DISCARD_CORRUPT") {
            config.discard_corrupt_store = flag;
        }

        config
    }

    pub fn store_config(&self) -> EventStoreConfig {
        EventStoreConfig::new(&self.data_dir)
    }

    pub fn retention(&self) -> chrono::Duration {
        crate::utils::days(self.retention_days)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable config value");
            None
        }
    }
}
