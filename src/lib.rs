//! Event Feed
//!
//! Polls the GitHub received-events API for a user, keeps a deduplicated
//! local store of the events and renders them grouped by repository.
//!
//! # Modules
//!
//! - `types`: Event records, store header and view records
//! - `event_store`: Per-user persisted store (load/save/evict/add)
//! - `fetcher`: Paginated fetching with early stop
//! - `aggregate`: Sorting and grouping for presentation
//! - `feed`: The per-request load → evict → fetch → save cycle
//! - `session`: Per-request user context and credentials
//! - `config`: Environment-driven configuration
//! - `api`: Axum JSON endpoints
//! - `utils`: Timestamps and atomic file writes
//!
//! # Example
//!
//! ```no_run
//! use event_feed::{Credential, FeedConfig, FeedService, UserContext};
//!
//! # async fn run() -> Result<(), event_feed::FeedError> {
//! let feed = FeedService::from_config(FeedConfig::from_env())?;
//! let ctx = UserContext::new("octocat", &Credential::Token("ghp_...".into()))?;
//!
//! let result = feed.run_cycle(&ctx, true).await?;
//! for (repo, events) in result.groups() {
//!     println!("{}: {} events", repo, events.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod event_store;
pub mod feed;
pub mod fetcher;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::FeedConfig;
pub use error::{FeedError, FeedResult};
pub use event_store::{EventStore, EventStoreConfig};
pub use feed::{CycleResult, CycleStats, FeedService};
pub use fetcher::{GithubClient, PageSource, Paginator, StopReason};
pub use session::{Credential, UserContext};
pub use types::{EventRecord, EventView, RepoGroups};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
