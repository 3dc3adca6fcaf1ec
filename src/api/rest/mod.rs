//! REST API module for HTTP endpoints
//!
//! - `GET /api/users/:user/events` - Run a feed cycle, return events grouped by repo
//! - `GET /api/users/:user/events/flat` - Run a feed cycle, return a flat table

pub mod events;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// Common query parameters for feed endpoints
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    /// Fetch new pages before answering (default: true)
    #[serde(default = "default_refresh")]
    pub refresh: bool,
}

fn default_refresh() -> bool {
    true
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "BAD_REQUEST".to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "UNAUTHORIZED".to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "FORBIDDEN".to_string(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "UPSTREAM_ERROR".to_string(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "TIMEOUT".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "INTERNAL_ERROR".to_string(),
        }
    }
}

/// A failed request: status plus JSON error body
pub struct ApiFailure(pub StatusCode, pub ApiError);

impl From<FeedError> for ApiFailure {
    fn from(e: FeedError) -> Self {
        let message = e.to_string();
        match e {
            FeedError::InvalidUser(_) => ApiFailure(StatusCode::BAD_REQUEST, ApiError::bad_request(message)),
            FeedError::CredentialMismatch { .. } => ApiFailure(StatusCode::FORBIDDEN, ApiError::forbidden(message)),
            FeedError::RemoteApi { .. } | FeedError::MalformedEvent { .. } => {
                ApiFailure(StatusCode::BAD_GATEWAY, ApiError::upstream(message))
            }
            FeedError::Timeout(_) => ApiFailure(StatusCode::GATEWAY_TIMEOUT, ApiError::timeout(message)),
            FeedError::StorageCorrupt(_) | FeedError::Io(_) => {
                ApiFailure(StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal(message))
            }
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}
