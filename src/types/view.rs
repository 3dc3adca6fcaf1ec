//! View records handed to the rendering layer

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::event::EventRecord;
use crate::utils::format_event_date;

/// One event as shown in the grouped feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: String,
    pub repo: String,
    pub title: String,
    pub actor: String,
    pub avatar_url: String,
    /// Relative age, e.g. "2 hours ago"
    pub age: String,
    /// Absolute date in API format
    pub date: String,
    pub url: String,
}

impl EventView {
    pub fn from_record(record: &EventRecord, now: &DateTime<Utc>) -> Self {
        Self {
            id: record.id().to_string(),
            repo: record.repo_name().to_string(),
            title: record.title().to_string(),
            actor: record.actor_login().to_string(),
            avatar_url: record.actor_avatar_url().to_string(),
            age: record.relative_age(now),
            date: format_event_date(&record.created_at()),
            url: record.display_url().to_string(),
        }
    }
}

/// Repo name to that repo's events, in first-seen order
pub type RepoGroups = IndexMap<String, Vec<EventView>>;

/// One row of the flat table view: repo, description, actor, date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    pub repo: String,
    pub description: String,
    pub actor: String,
    pub date: String,
}

impl EventRow {
    pub fn from_record(record: &EventRecord, now: &DateTime<Utc>) -> Self {
        Self {
            repo: record.repo_name().to_string(),
            description: record.title().to_string(),
            actor: record.actor_login().to_string(),
            date: record.relative_age(now),
        }
    }
}
