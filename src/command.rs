use std::sync::LazyLock;

use regex::Regex;

use crate::{resource::Resource, session::Credentials};

// A digit, a dash and an alphanumeric, anywhere in the message.
static CREDENTIAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9]-[A-Za-z0-9]").expect("static regex"));

/// Whether `text` is treated as an inline `identifier-secret` login.
///
/// The match is unanchored, so any message containing e.g. `5-a` qualifies.
/// Such messages are also kept out of the logs.
pub fn is_credential(text: &str) -> bool {
    CREDENTIAL_PATTERN.is_match(text)
}

/// What an inbound chat message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    /// `/login` without credentials: asks for them.
    Login,
    SubmitCredentials(Credentials),
    Logout,
    Status,
    /// Placeholder for a menu entry that is not available yet.
    ApiDiv,
    Fetch(Resource),
}

impl Command {
    /// `None` for text the bot does not react to.
    pub fn parse(text: &str) -> Option<Self> {
        let command = match text.trim() {
            "/start" => Command::Start,
            "/login" => Command::Login,
            "/logout" => Command::Logout,
            "/status" => Command::Status,
            "/apidiv" => Command::ApiDiv,
            "/bpp" => Command::Fetch(Resource::Payments),
            "/schedule" => Command::Fetch(Resource::Schedule),
            "/lecturer" => Command::Fetch(Resource::Lecturers),
            other if is_credential(other) => Command::SubmitCredentials(Credentials::parse(other)?),
            _ => return None,
        };
        Some(command)
    }
}
