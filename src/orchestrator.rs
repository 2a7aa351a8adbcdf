//! Per-request control logic: serve from cache, ask for authentication, or
//! run a fetch-extract-cache cycle against the portal.
//!
//! Requests are handled independently. Two requests of the same user may both
//! miss the cache and fetch; both write the same payload and the last write
//! wins.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    command::Command,
    error::{AuthError, FetchError, RequestError},
    extractors::{extract_lecturers, extract_payments, extract_schedule},
    portal::{Portal, fetch_authenticated},
    resource::{PAYMENTS_HEADING, Resource, SCHEDULE_HEADING, aggregate, join_entries, split_entries},
    session::{Credentials, SESSION_TTL, SessionCookies, UserId},
    store::Store,
};

/// Chat texts sent back to the user.
pub mod messages {
    pub const WELCOME: &str = "Selamat datang, silahkan masuk untuk memulai!";
    pub const LOGIN_PROMPT: &str = "Silahkan masuk dengan mengetikkan Stambuk dan Kata Sandi. Adapun format yang di gunakan yaitu :\n\nstambuk-kata sandi\n\nTerimakasih.";
    pub const LOGIN_SUCCESS: &str =
        "Berhasil masuk! Gunakan menu yang telah disediakan untuk mengakses SIAKA.";
    pub const LOGIN_REJECTED: &str =
        "Stambuk atau kata sandi salah! Silahkan masuk kembali dengan format:\n\nstambuk-kata sandi";
    pub const ALREADY_LOGGED_IN: &str = "Anda telah masuk!";
    pub const NOT_LOGGED_IN: &str = "Anda belum masuk kedalam sistem!";
    pub const SESSION_EXPIRED: &str =
        "Sesi anda telah berakhir, silahkan masuk kembali untuk mengakses SIAKA!";
    pub const LOGGED_OUT: &str = "Anda telah keluar dari SIAKA Universitas Dipa Makassar\nTerima kasih.";
    pub const TRY_AGAIN: &str = "Terjadi kesalahan! Coba beberapa saat lagi.";
    pub const COMING_SOON: &str = "Coming soon...";
}

/// What the chat adapter should do on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Ordered, finite list for the adapter to page through.
    Entries(Vec<String>),
    /// Delete the user's message, it carried credentials.
    RedactRequest,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

pub type ReplySender = UnboundedSender<Reply>;

pub struct Orchestrator {
    store: Arc<dyn Store>,
    portal: Arc<dyn Portal>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, portal: Arc<dyn Portal>) -> Self {
        Self { store, portal }
    }

    /// Handles one inbound message, sending every reply through `replies`.
    /// Text that is not a command is ignored.
    pub async fn handle(&self, user: UserId, text: &str, replies: &ReplySender) {
        let Some(command) = Command::parse(text) else {
            return;
        };

        let outcome = match command {
            Command::Start => {
                send(replies, Reply::text(messages::WELCOME));
                Ok(())
            }
            Command::ApiDiv => {
                send(replies, Reply::text(messages::COMING_SOON));
                Ok(())
            }
            Command::Status => self.status(user, replies).await,
            Command::Login => self.login(user, None, replies).await,
            Command::SubmitCredentials(credentials) => {
                let outcome = self.login(user, Some(credentials), replies).await;
                // The message carries a password, whatever came of it.
                send(replies, Reply::RedactRequest);
                outcome
            }
            Command::Logout => self.logout(user, replies).await,
            Command::Fetch(resource) => self.serve(user, resource, replies).await,
        };

        if let Err(err) = outcome {
            error!("request of user {user} failed: {err}");
            send(replies, Reply::text(messages::TRY_AGAIN));
        }
    }

    /// Stored cookies of `user`, `None` if the session is absent or expired.
    async fn session(&self, user: UserId) -> Result<Option<SessionCookies>, RequestError> {
        let Some(raw) = self.store.get(&user.session_key()).await? else {
            return Ok(None);
        };
        Ok(Some(SessionCookies::from_json(&raw)?))
    }

    /// Like [`Self::session`], but tells the user to log in when there is none.
    async fn require_session(
        &self,
        user: UserId,
        replies: &ReplySender,
    ) -> Result<Option<SessionCookies>, RequestError> {
        let session = self.session(user).await?;
        if session.is_none() {
            send(replies, Reply::text(messages::SESSION_EXPIRED));
        }
        Ok(session)
    }

    async fn status(&self, user: UserId, replies: &ReplySender) -> Result<(), RequestError> {
        let text = match self.store.get(&user.session_key()).await? {
            Some(_) => messages::ALREADY_LOGGED_IN,
            None => messages::NOT_LOGGED_IN,
        };
        send(replies, Reply::text(text));
        Ok(())
    }

    async fn login(
        &self,
        user: UserId,
        credentials: Option<Credentials>,
        replies: &ReplySender,
    ) -> Result<(), RequestError> {
        match self.session(user).await {
            Ok(Some(_)) => {
                send(replies, Reply::text(messages::ALREADY_LOGGED_IN));
                return Ok(());
            }
            Ok(None) => {}
            // A fresh login overwrites the corrupt entry.
            Err(RequestError::CorruptSession(err)) => {
                warn!("replacing corrupt session of user {user}: {err}");
            }
            Err(err) => return Err(err),
        }

        let Some(credentials) = credentials else {
            send(replies, Reply::text(messages::LOGIN_PROMPT));
            return Ok(());
        };

        let cookies = match self.portal.authenticate(&credentials).await {
            Ok(cookies) => cookies,
            Err(AuthError::Rejected) => {
                info!("portal rejected login of user {user}");
                send(replies, Reply::text(messages::LOGIN_REJECTED));
                return Ok(());
            }
            Err(err) => {
                error!("login of user {user} failed: {err}");
                send(replies, Reply::text(messages::TRY_AGAIN));
                return Ok(());
            }
        };

        let raw = cookies.to_json()?;
        self.store.set(&user.session_key(), &raw, SESSION_TTL).await?;
        info!("user {user} logged in");

        send(replies, Reply::text(messages::LOGIN_SUCCESS));
        Ok(())
    }

    async fn logout(&self, user: UserId, replies: &ReplySender) -> Result<(), RequestError> {
        if self.require_session(user, replies).await?.is_none() {
            return Ok(());
        }

        // Sequential: a failure part way only leaves a stale cache entry behind.
        self.store.delete(&user.session_key()).await?;
        for resource in Resource::ALL.iter().filter(|r| r.is_per_user()) {
            self.store.delete(&resource.cache_key(user)).await?;
        }
        info!("user {user} logged out");

        send(replies, Reply::text(messages::LOGGED_OUT));
        Ok(())
    }

    async fn serve(
        &self,
        user: UserId,
        resource: Resource,
        replies: &ReplySender,
    ) -> Result<(), RequestError> {
        let Some(cookies) = self.require_session(user, replies).await? else {
            return Ok(());
        };

        let key = resource.cache_key(user);
        if let Some(payload) = self.store.get(&key).await? {
            debug!("cache hit on {key}");
            send(replies, deliver(resource, payload));
            return Ok(());
        }

        debug!("cache miss on {key}, fetching {}", resource.page());
        send(replies, Reply::text(resource.progress_notice()));
        let payload = self.fetch_payload(resource, &cookies).await?;
        self.store.set(&key, &payload, resource.ttl()).await?;

        send(replies, deliver(resource, payload));
        Ok(())
    }

    async fn fetch_payload(
        &self,
        resource: Resource,
        cookies: &SessionCookies,
    ) -> Result<String, FetchError> {
        let portal = self.portal.as_ref();
        let url = portal.page_url(resource.page());
        let payload = match resource {
            Resource::Payments => aggregate(
                PAYMENTS_HEADING,
                &fetch_authenticated(portal, &url, cookies, extract_payments).await?,
            ),
            Resource::Schedule => aggregate(
                SCHEDULE_HEADING,
                &fetch_authenticated(portal, &url, cookies, extract_schedule).await?,
            ),
            Resource::Lecturers => {
                join_entries(&fetch_authenticated(portal, &url, cookies, extract_lecturers).await?)
            }
        };
        Ok(payload)
    }
}

fn deliver(resource: Resource, payload: String) -> Reply {
    match resource {
        Resource::Lecturers => Reply::Entries(split_entries(&payload)),
        _ => Reply::Text(payload),
    }
}

// The adapter may have hung up; there is nobody left to tell.
fn send(replies: &ReplySender, reply: Reply) {
    let _ = replies.send(reply);
}
