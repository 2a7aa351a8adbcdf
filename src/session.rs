use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long a harvested portal session is kept in the store.
pub const SESSION_TTL: Duration = Duration::from_secs(40 * 60);

/// Chat-side identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

impl UserId {
    /// Store key under which this user's session cookies live.
    pub fn session_key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
        }
    }

    pub(crate) fn from_response(cookie: &reqwest::cookie::Cookie<'_>) -> Self {
        let expires = cookie.expires().map(DateTime::<Utc>::from).or_else(|| {
            cookie
                .max_age()
                .and_then(|age| chrono::Duration::from_std(age).ok())
                .map(|age| Utc::now() + age)
        });
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().map(str::to_string),
            path: cookie.path().map(str::to_string),
            expires,
        }
    }
}

/// The authenticated cookie set of one portal session, in the order the
/// portal issued it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCookies(pub Vec<Cookie>);

impl SessionCookies {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert or replace by name, keeping the first-issued position.
    pub fn upsert(&mut self, cookie: Cookie) {
        match self.0.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => self.0.push(cookie),
        }
    }

    /// Value for a `Cookie:` request header.
    pub fn header_value(&self) -> String {
        self.0
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// A `identifier-secret` pair typed into the chat.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    /// Splits on the first `-`, so the secret itself may contain dashes.
    pub fn parse(text: &str) -> Option<Self> {
        let (identifier, secret) = text.trim().split_once('-')?;
        if identifier.is_empty() || secret.is_empty() {
            return None;
        }
        Some(Self {
            identifier: identifier.to_string(),
            secret: secret.to_string(),
        })
    }
}

// Never print the secret.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"***")
            .finish()
    }
}
