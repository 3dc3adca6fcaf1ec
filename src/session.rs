//! Per-request user context
//!
//! The caller supplies who the feed is for and the credential to send to
//! the remote API. Nothing here is stored process-wide or persisted.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::FeedResult;
use crate::event_store::validate_user;

/// A credential for the events API
#[derive(Clone)]
pub enum Credential {
    /// User name plus password or personal access token, sent as HTTP Basic
    Basic { user: String, secret: String },
    /// OAuth or personal access token
    Token(String),
    /// A ready-made `Authorization` header value, forwarded as is
    Raw(String),
}

impl Credential {
    pub fn basic(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Credential::Basic {
            user: user.into(),
            secret: secret.into(),
        }
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        match self {
            Credential::Basic { user, secret } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", user, secret)))
            }
            Credential::Token(token) => format!("token {}", token),
            Credential::Raw(value) => value.clone(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Basic { user, .. } => write!(f, "Basic({}:***)", user),
            Credential::Token(_) => write!(f, "Token(***)"),
            Credential::Raw(_) => write!(f, "Raw(***)"),
        }
    }
}

/// Identity and credential for one feed cycle
#[derive(Clone)]
pub struct UserContext {
    user: String,
    authorization: String,
}

impl UserContext {
    pub fn new(user: impl Into<String>, credential: &Credential) -> FeedResult<Self> {
        let user = user.into();
        validate_user(&user)?;
        Ok(Self {
            user,
            authorization: credential.header_value(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn authorization(&self) -> &str {
        &self.authorization
    }
}

impl std::fmt::Debug for UserContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserContext")
            .field("user", &self.user)
            .field("authorization", &"***")
            .finish()
    }
}
