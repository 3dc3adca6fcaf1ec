//! Shared application state

use crate::config::FeedConfig;
use crate::error::FeedResult;
use crate::feed::FeedService;

/// State shared by all HTTP handlers
pub struct AppState {
    pub feed: FeedService,
}

impl AppState {
    pub fn new(feed: FeedService) -> Self {
        Self { feed }
    }

    pub fn from_config(config: FeedConfig) -> FeedResult<Self> {
        Ok(Self::new(FeedService::from_config(config)?))
    }
}
