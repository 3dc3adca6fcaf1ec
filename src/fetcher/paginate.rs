//! Early-stop pagination
//!
//! Pages are requested one at a time, newest first. Fetching stops when a
//! page brings nothing newer than what the store already holds, when the
//! page cap is hit, or when the API says the rate limit is used up.
//! The API is assumed to return events newest first; that is logged when
//! violated but never corrected.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::event_store::latest_event_date;
use crate::session::UserContext;
use crate::types::EventRecord;

use super::page::PageSource;

/// Default maximum number of pages per cycle
pub const DEFAULT_PAGE_CAP: u32 = 10;

/// Why pagination ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A page held nothing newer than the stored events (or was empty)
    CaughtUp,
    PageCap,
    RateLimited,
}

/// Records gathered by a successful fetch
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// All decoded records, in page order
    pub records: Vec<EventRecord>,
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
}

/// A fetch that failed part way
#[derive(Debug)]
pub struct FetchAborted {
    pub error: FeedError,
    /// Records from pages fetched before the failure
    pub partial: Vec<EventRecord>,
    pub pages_fetched: u32,
}

/// Drives a `PageSource` until a stopping condition
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_cap: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_CAP)
    }
}

impl Paginator {
    pub fn new(page_cap: u32) -> Self {
        Self { page_cap }
    }

    pub fn page_cap(&self) -> u32 {
        self.page_cap
    }

    /// Fetch pages until caught up with `last_known`
    ///
    /// `last_known` is the newest stored event date, `MIN_UTC` for an empty store.
    pub async fn fetch_new_events<S>(
        &self,
        source: &S,
        ctx: &UserContext,
        last_known: DateTime<Utc>,
    ) -> Result<FetchOutcome, FetchAborted>
    where
        S: PageSource + ?Sized,
    {
        let mut records = Vec::new();
        let mut page = 0u32;

        let stop_reason = loop {
            if page >= self.page_cap {
                break StopReason::PageCap;
            }

            let fetched = match source.fetch_page(ctx, page).await {
                Ok(fetched) => fetched,
                Err(error) => {
                    return Err(FetchAborted {
                        error,
                        partial: records,
                        pages_fetched: page,
                    })
                }
            };
            page += 1;

            let newest = latest_event_date(&fetched.records);
            if !is_newest_first(&fetched.records) {
                debug!(user = ctx.user(), page = page - 1, "Page is not ordered newest first");
            }

            let exhausted = fetched.rate_limit.is_exhausted();
            if exhausted {
                warn!(
                    user = ctx.user(),
                    limit = ?fetched.rate_limit.limit,
                    "Rate limit exhausted, no further pages this cycle"
                );
            }

            records.extend(fetched.records);

            if newest <= last_known {
                break StopReason::CaughtUp;
            }
            if exhausted {
                break StopReason::RateLimited;
            }
        };

        info!(
            user = ctx.user(),
            pages = page,
            records = records.len(),
            stop_reason = ?stop_reason,
            "Fetched received events"
        );

        Ok(FetchOutcome {
            records,
            pages_fetched: page,
            stop_reason,
        })
    }
}

fn is_newest_first(records: &[EventRecord]) -> bool {
    records
        .windows(2)
        .all(|pair| pair[0].created_at() >= pair[1].created_at())
}
