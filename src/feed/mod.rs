//! Feed cycle orchestration
//!
//! One cycle per request: load the user's store, evict stale records,
//! fetch new pages, save, then hand the records to the aggregator.
//! Cycles for the same user are serialized; different users run in
//! parallel.

mod locks;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{format_events, group_events};
use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult};
use crate::event_store::EventStore;
use crate::fetcher::{GithubClient, PageSource, Paginator, StopReason};
use crate::session::UserContext;
use crate::types::{EventRecord, EventRow, RepoGroups};

pub use locks::UserLocks;

/// Counters for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStats {
    pub loaded: usize,
    pub evicted: usize,
    pub fetched: usize,
    pub added: usize,
    pub pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    pub stored: usize,
}

/// Store contents after a successful cycle
#[derive(Debug, Clone)]
pub struct CycleResult {
    pub records: Vec<EventRecord>,
    pub stats: CycleStats,
    /// Reference time used for eviction and relative ages
    pub now: DateTime<Utc>,
}

impl CycleResult {
    pub fn groups(&self) -> RepoGroups {
        group_events(&self.records, &self.now)
    }

    pub fn rows(&self) -> Vec<EventRow> {
        format_events(&self.records, &self.now)
    }
}

/// Runs feed cycles against a page source
pub struct FeedService<S = GithubClient> {
    config: FeedConfig,
    source: Arc<S>,
    paginator: Paginator,
    locks: UserLocks,
}

impl FeedService<GithubClient> {
    /// Service talking to the configured events API
    pub fn from_config(config: FeedConfig) -> FeedResult<Self> {
        let client = GithubClient::new(config.api_base.clone(), config.page_timeout)?;
        Ok(Self::new(config, client))
    }
}

impl<S: PageSource> FeedService<S> {
    pub fn new(config: FeedConfig, source: S) -> Self {
        let paginator = Paginator::new(config.page_cap);
        Self {
            config,
            source: Arc::new(source),
            paginator,
            locks: UserLocks::new(),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Confirm the context's credential is accepted for its user
    pub async fn verify_credential(&self, ctx: &UserContext) -> FeedResult<()> {
        self.source.verify_credential(ctx).await
    }

    /// Run one cycle now. With `refresh == false` nothing is fetched.
    pub async fn run_cycle(&self, ctx: &UserContext, refresh: bool) -> FeedResult<CycleResult> {
        self.run_cycle_at(ctx, refresh, Utc::now()).await
    }

    /// Run one cycle with an explicit "now"
    pub async fn run_cycle_at(
        &self,
        ctx: &UserContext,
        refresh: bool,
        now: DateTime<Utc>,
    ) -> FeedResult<CycleResult> {
        let deadline = self.config.cycle_deadline;
        match tokio::time::timeout(deadline, self.locked_cycle(ctx, refresh, now)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(user = ctx.user(), ?deadline, "Feed cycle missed its deadline");
                Err(FeedError::Timeout(deadline))
            }
        }
    }

    async fn locked_cycle(
        &self,
        ctx: &UserContext,
        refresh: bool,
        now: DateTime<Utc>,
    ) -> FeedResult<CycleResult> {
        let handle = self.locks.handle_for(ctx.user());
        let _guard = handle.lock().await;

        let mut stats = CycleStats::default();
        let mut store = self.load_store(ctx.user())?;
        stats.loaded = store.len();

        stats.evicted = store.evict_stale(now, self.config.retention());

        if refresh {
            let last_known = store.latest_event_date();
            match self
                .paginator
                .fetch_new_events(self.source.as_ref(), ctx, last_known)
                .await
            {
                Ok(outcome) => {
                    stats.fetched = outcome.records.len();
                    stats.pages = outcome.pages_fetched;
                    stats.stop_reason = Some(outcome.stop_reason);
                    stats.added = store.add_new(outcome.records);
                }
                Err(aborted) => {
                    if self.config.persist_partial_on_error && !aborted.partial.is_empty() {
                        let added = store.add_new(aborted.partial);
                        store.save()?;
                        warn!(
                            user = ctx.user(),
                            pages = aborted.pages_fetched,
                            added,
                            "Saved events fetched before the failure"
                        );
                    }
                    return Err(aborted.error);
                }
            }
        }

        store.save()?;
        stats.stored = store.len();

        info!(
            user = ctx.user(),
            loaded = stats.loaded,
            evicted = stats.evicted,
            added = stats.added,
            stored = stats.stored,
            "Feed cycle complete"
        );

        Ok(CycleResult {
            records: store.all().cloned().collect(),
            stats,
            now,
        })
    }

    fn load_store(&self, user: &str) -> FeedResult<EventStore> {
        let mut store = EventStore::new(self.config.store_config(), user)?;

        match store.load() {
            Ok(()) => {}
            Err(FeedError::StorageCorrupt(reason)) if self.config.discard_corrupt_store => {
                warn!(user, %reason, "Event store unreadable, trying backup");
                match store.recover_from_backup() {
                    Ok(true) => {}
                    Ok(false) => warn!(user, "No backup, starting with an empty store"),
                    Err(e) => warn!(user, error = %e, "Backup unreadable, starting with an empty store"),
                }
            }
            Err(e) => return Err(e),
        }

        Ok(store)
    }
}
