//! One page of events and the trait that produces pages

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::error::FeedResult;
use crate::session::UserContext;
use crate::types::EventRecord;

/// Rate-limit headers reported with a page. `None` means absent or unparseable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
}

impl RateLimit {
    /// Quota is known to be used up
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Decoded events of one page, in API order
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<EventRecord>,
    pub rate_limit: RateLimit,
}

/// Source of received-events pages for a user
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch page `page` (0-based) for the context's user
    async fn fetch_page(&self, ctx: &UserContext, page: u32) -> FeedResult<Page>;

    /// Check that the context's credential is accepted for its user
    ///
    /// The default asks for the first page and throws it away.
    async fn verify_credential(&self, ctx: &UserContext) -> FeedResult<()> {
        self.fetch_page(ctx, 0).await.map(|_| ())
    }
}

/// Normalize every item of a page
///
/// All items are tried so the log reports how many were malformed; the
/// first failure is returned.
pub fn decode_page(items: Vec<serde_json::Value>, page: u32) -> FeedResult<Vec<EventRecord>> {
    let total = items.len();
    let mut records = Vec::with_capacity(total);
    let mut first_error = None;
    let mut malformed = 0usize;

    for (index, item) in items.into_iter().enumerate() {
        match EventRecord::from_json(item, index) {
            Ok(record) => records.push(record),
            Err(e) => {
                malformed += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(error) => {
            warn!(page, malformed, total, error = %error, "Page contains malformed events");
            Err(error)
        }
        None => Ok(records),
    }
}
