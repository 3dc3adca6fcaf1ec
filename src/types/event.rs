//! Event records
//!
//! `RawEvent` mirrors the shape of one item from the received-events API.
//! `EventRecord` is the normalized, immutable form kept in the store: the
//! mandatory fields are validated and the link source is resolved once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FeedError, FeedResult};
use crate::utils::{parse_event_date, relative_age};

/// One item of the API response, as decoded by serde
///
/// Every field is optional here so that a missing mandatory field turns
/// into a `MalformedEvent` with a useful reason instead of a serde error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub repo: Option<RawRepo>,
    #[serde(default)]
    pub actor: Option<RawActor>,
    #[serde(default)]
    pub payload: Option<RawPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRepo {
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActor {
    pub login: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    #[serde(default)]
    pub pull_request: Option<RawSubject>,
    #[serde(default)]
    pub issue: Option<RawSubject>,
    #[serde(default)]
    pub comment: Option<RawComment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubject {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub html_url: Option<String>,
}

/// What an event's payload is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    PullRequest,
    Issue,
}

/// The pull request or issue an event refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub title: String,
    #[serde(rename = "htmlUrl", skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// Where an event's display link comes from, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "url", rename_all = "snake_case")]
pub enum LinkSource {
    Comment(String),
    Subject(String),
    Repo(String),
}

impl LinkSource {
    pub fn url(&self) -> &str {
        match self {
            LinkSource::Comment(url) | LinkSource::Subject(url) | LinkSource::Repo(url) => url,
        }
    }
}

/// A normalized event. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    id: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "repoName")]
    repo_name: String,
    #[serde(rename = "repoUrl", default)]
    repo_url: String,
    #[serde(rename = "actorLogin")]
    actor_login: String,
    #[serde(rename = "actorAvatarUrl", default)]
    actor_avatar_url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    subject: Option<Subject>,
    link: LinkSource,
}

impl EventRecord {
    /// Build a record from a decoded API item
    ///
    /// `index` is the item's position in its page and only feeds error messages.
    pub fn from_raw(raw: RawEvent, index: usize) -> FeedResult<Self> {
        let malformed = |reason: &str| FeedError::MalformedEvent {
            index,
            reason: reason.to_string(),
        };

        let id = raw.id.ok_or_else(|| malformed("missing id"))?;
        let created_at = raw
            .created_at
            .ok_or_else(|| malformed("missing created_at"))?;
        let created_at = parse_event_date(&created_at).map_err(|e| FeedError::MalformedEvent {
            index,
            reason: format!("bad created_at {:?}: {}", created_at, e),
        })?;

        let repo = raw.repo.ok_or_else(|| malformed("missing repo"))?;
        let repo_name = repo.name.ok_or_else(|| malformed("missing repo.name"))?;
        let repo_url = repo.url.unwrap_or_default();

        let actor = raw.actor.ok_or_else(|| malformed("missing actor"))?;
        let actor_login = actor.login.ok_or_else(|| malformed("missing actor.login"))?;
        let actor_avatar_url = actor.avatar_url.unwrap_or_default();

        let (subject, comment_url) = match raw.payload {
            Some(payload) => {
                let subject = match (payload.pull_request, payload.issue) {
                    (Some(pr), _) => Some(Subject::from_raw(SubjectKind::PullRequest, pr, &id)),
                    (None, Some(issue)) => Some(Subject::from_raw(SubjectKind::Issue, issue, &id)),
                    (None, None) => None,
                };
                (subject, payload.comment.and_then(|c| c.html_url))
            }
            None => (None, None),
        };

        let link = match (comment_url, subject.as_ref().and_then(|s| s.html_url.clone())) {
            (Some(url), _) => LinkSource::Comment(url),
            (None, Some(url)) => LinkSource::Subject(url),
            (None, None) => LinkSource::Repo(repo_url.clone()),
        };

        Ok(Self {
            id,
            created_at,
            repo_name,
            repo_url,
            actor_login,
            actor_avatar_url,
            subject,
            link,
        })
    }

    /// Decode and normalize one JSON item
    pub fn from_json(value: serde_json::Value, index: usize) -> FeedResult<Self> {
        let raw: RawEvent = serde_json::from_value(value).map_err(|e| FeedError::MalformedEvent {
            index,
            reason: e.to_string(),
        })?;
        Self::from_raw(raw, index)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    pub fn actor_login(&self) -> &str {
        &self.actor_login
    }

    pub fn actor_avatar_url(&self) -> &str {
        &self.actor_avatar_url
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn link(&self) -> &LinkSource {
        &self.link
    }

    /// Title of the pull request or issue, empty when there is none
    pub fn title(&self) -> &str {
        self.subject.as_ref().map(|s| s.title.as_str()).unwrap_or("")
    }

    pub fn display_url(&self) -> &str {
        self.link.url()
    }

    pub fn relative_age(&self, now: &DateTime<Utc>) -> String {
        relative_age(&self.created_at, now)
    }
}

impl Subject {
    fn from_raw(kind: SubjectKind, raw: RawSubject, event_id: &str) -> Self {
        let title = raw.title.unwrap_or_else(|| {
            debug!(event_id, ?kind, "Subject has no title, showing it untitled");
            String::new()
        });
        Self {
            kind,
            title,
            html_url: raw.html_url,
        }
    }
}
