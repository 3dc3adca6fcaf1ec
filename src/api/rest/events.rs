//! Feed endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use super::{ApiError, ApiFailure, FeedParams};
use crate::api::state::AppState;
use crate::feed::{CycleResult, CycleStats};
use crate::session::{Credential, UserContext};
use crate::types::{EventRow, RepoGroups};

/// Grouped feed for one user
#[derive(Debug, Serialize)]
pub struct GroupedFeed {
    pub user: String,
    pub groups: RepoGroups,
    pub stats: CycleStats,
}

/// Flat feed for one user
#[derive(Debug, Serialize)]
pub struct FlatFeed {
    pub user: String,
    pub rows: Vec<EventRow>,
    pub stats: CycleStats,
}

/// Build the per-request context from the path and the forwarded `Authorization` header
fn user_context(user: String, headers: &HeaderMap) -> Result<UserContext, ApiFailure> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            ApiFailure(
                StatusCode::UNAUTHORIZED,
                ApiError::unauthorized("Authorization header required"),
            )
        })?;

    Ok(UserContext::new(user, &Credential::Raw(authorization.to_string()))?)
}

async fn run_cycle(
    state: &AppState,
    user: String,
    headers: &HeaderMap,
    params: &FeedParams,
) -> Result<(String, CycleResult), ApiFailure> {
    let ctx = user_context(user, headers)?;
    // The stored feed is only served to the owner of the credential,
    // whether or not this request fetches
    state.feed.verify_credential(&ctx).await?;
    let result = state.feed.run_cycle(&ctx, params.refresh).await?;
    Ok((ctx.user().to_string(), result))
}

/// GET /api/users/:user/events - Events with a pull request or issue, grouped by repo
pub async fn grouped_events(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Query(params): Query<FeedParams>,
    headers: HeaderMap,
) -> Result<Json<GroupedFeed>, ApiFailure> {
    let (user, result) = run_cycle(&state, user, &headers, &params).await?;

    Ok(Json(GroupedFeed {
        user,
        groups: result.groups(),
        stats: result.stats,
    }))
}

/// GET /api/users/:user/events/flat - Every stored event, newest first
pub async fn flat_events(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Query(params): Query<FeedParams>,
    headers: HeaderMap,
) -> Result<Json<FlatFeed>, ApiFailure> {
    let (user, result) = run_cycle(&state, user, &headers, &params).await?;

    Ok(Json(FlatFeed {
        user,
        rows: result.rows(),
        stats: result.stats,
    }))
}
