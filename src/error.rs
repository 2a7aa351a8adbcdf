use reqwest::StatusCode;

/// Failures of the credential store / cache backend.
///
/// A missing key is not an error: `Store::get` returns `Ok(None)` for it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

impl From<fred::error::RedisError> for StoreError {
    fn from(err: fred::error::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Failures while submitting credentials to the portal.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The portal answered but did not accept the credentials.
    #[error("portal rejected the credentials")]
    Rejected,
    #[error("portal answered login with status {0}")]
    Status(StatusCode),
    #[error("login request failed: {0}")]
    Network(#[source] reqwest::Error),
}

/// Failures while fetching an authenticated portal page.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("portal request timed out")]
    Timeout,
    #[error("portal request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("portal answered with status {0}")]
    Status(StatusCode),
    #[error("portal page could not be read: {0}")]
    Unparseable(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() || err.is_body() {
            FetchError::Unparseable(err.to_string())
        } else {
            FetchError::Network(err)
        }
    }
}

/// Anything that turns a resource request into the generic "try again later"
/// reply.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("stored session is corrupt: {0}")]
    CorruptSession(#[from] serde_json::Error),
}
