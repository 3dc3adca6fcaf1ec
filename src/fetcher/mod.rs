//! Paginated fetching of received events
//!
//! - `PageSource`: where pages come from (`GithubClient` in production)
//! - `Paginator`: early-stop page loop over a `PageSource`

mod client;
mod page;
mod paginate;

pub use client::{rate_limit_from_headers, GithubClient, DEFAULT_API_BASE};
pub use page::{decode_page, Page, PageSource, RateLimit};
pub use paginate::{FetchAborted, FetchOutcome, Paginator, StopReason, DEFAULT_PAGE_CAP};
