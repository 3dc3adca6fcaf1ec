//! reqwest-backed client for the received-events endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{FeedError, FeedResult};
use crate::session::UserContext;

use super::page::{decode_page, Page, PageSource, RateLimit};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const CLIENT_USER_AGENT: &str = concat!("event-feed/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in a `RemoteApi` message
const MAX_ERROR_BODY: usize = 200;

/// The part of `GET /user` used to identify the credential's owner
#[derive(Debug, Deserialize)]
struct AuthenticatedUser {
    login: String,
}

/// Fetches pages of `GET /users/{user}/received_events`
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    page_timeout: Duration,
}

impl GithubClient {
    pub fn new(api_base: impl Into<String>, page_timeout: Duration) -> FeedResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(page_timeout)
            .build()
            .map_err(|e| FeedError::remote(None, format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            page_timeout,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn events_url(&self, user: &str) -> String {
        format!(
            "{}/users/{}/received_events",
            self.api_base,
            urlencoding::encode(user)
        )
    }

    pub fn user_url(&self) -> String {
        format!("{}/user", self.api_base)
    }

    fn transport_error(&self, e: reqwest::Error) -> FeedError {
        if e.is_timeout() {
            FeedError::Timeout(self.page_timeout)
        } else {
            FeedError::remote(e.status().map(|s| s.as_u16()), e.to_string())
        }
    }
}

#[async_trait]
impl PageSource for GithubClient {
    async fn fetch_page(&self, ctx: &UserContext, page: u32) -> FeedResult<Page> {
        let url = self.events_url(ctx.user());
        debug!(user = ctx.user(), page, "Fetching received events page");

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, ctx.authorization())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let rate_limit = rate_limit_from_headers(response.headers());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(FeedError::remote(
                Some(status.as_u16()),
                format!("GET {} page {} failed: {}", url, page, body.trim()),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let items: Vec<serde_json::Value> = serde_json::from_slice(&bytes).map_err(|e| {
            FeedError::remote(
                Some(status.as_u16()),
                format!("page {} is not a JSON array of events: {}", page, e),
            )
        })?;

        let records = decode_page(items, page)?;
        Ok(Page { records, rate_limit })
    }

    /// Ask `GET /user` who the credential belongs to and compare with the context's user
    async fn verify_credential(&self, ctx: &UserContext) -> FeedResult<()> {
        let url = self.user_url();

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, ctx.authorization())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(FeedError::remote(
                Some(status.as_u16()),
                format!("GET {} failed: {}", url, body.trim()),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let owner: AuthenticatedUser = serde_json::from_slice(&bytes).map_err(|e| {
            FeedError::remote(Some(status.as_u16()), format!("unexpected {} body: {}", url, e))
        })?;

        // Logins are case-insensitive
        if !owner.login.eq_ignore_ascii_case(ctx.user()) {
            warn!(user = ctx.user(), login = %owner.login, "Credential does not belong to the requested user");
            return Err(FeedError::CredentialMismatch {
                user: ctx.user().to_string(),
                login: owner.login,
            });
        }

        Ok(())
    }
}

/// Read `X-RateLimit-Limit` and `X-RateLimit-Remaining`
pub fn rate_limit_from_headers(headers: &HeaderMap) -> RateLimit {
    let parse = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    RateLimit {
        limit: parse("x-ratelimit-limit"),
        remaining: parse("x-ratelimit-remaining"),
    }
}
