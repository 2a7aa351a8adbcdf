//! Thin Telegram Bot API adapter: long-polls updates, hands each message to
//! the orchestrator on its own task, and renders the replies.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use log::{error, info, warn};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::{sync::mpsc, task::JoinSet};

use crate::{
    command::is_credential,
    orchestrator::{Orchestrator, Reply},
    session::UserId,
};

const API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);
/// Entries per message when rendering a list.
pub const PAGE_SIZE: usize = 5;
const NO_ENTRIES: &str = "Tidak ada data.";
/// Longest text `sendMessage` accepts.
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Serialize)]
struct DeleteMessage {
    chat_id: i64,
    message_id: i64,
}

pub struct TelegramBot {
    client: Client,
    endpoint: String,
}

impl TelegramBot {
    pub fn new(token: &str) -> anyhow::Result<Self> {
        Self::with_api_base(API_BASE, token)
    }

    pub fn with_api_base(api_base: &str, token: &str) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.endpoint, method))
            .json(body)
            .send()
            .await
            .with_context(|| format!("telegram {method} request failed"))?
            .json()
            .await
            .with_context(|| format!("telegram {method} returned malformed json"))?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(anyhow::anyhow!(
                "telegram {method} failed: {}",
                description.unwrap_or_default()
            )),
        }
    }

    pub async fn get_updates(&self, offset: i64) -> anyhow::Result<Vec<Update>> {
        let body = GetUpdates {
            offset,
            timeout: LONG_POLL_SECS,
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &body).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        let _: serde_json::Value = self.call("sendMessage", &SendMessage { chat_id, text }).await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()> {
        let _: bool = self
            .call("deleteMessage", &DeleteMessage { chat_id, message_id })
            .await?;
        Ok(())
    }

    async fn render(&self, message: &Message, reply: Reply) -> anyhow::Result<()> {
        let chat_id = message.chat.id;
        match reply {
            Reply::Text(text) => {
                for part in split_text(&text) {
                    self.send_message(chat_id, &part).await?;
                }
                Ok(())
            }
            Reply::Entries(entries) => {
                for page in paginate(&entries) {
                    self.send_message(chat_id, &page).await?;
                }
                Ok(())
            }
            Reply::RedactRequest => self.delete_message(chat_id, message.message_id).await,
        }
    }
}

/// Groups entries into chat messages of [`PAGE_SIZE`], each tagged with its
/// page number.
pub fn paginate(entries: &[String]) -> Vec<String> {
    if entries.is_empty() {
        return vec![NO_ENTRIES.to_string()];
    }
    let pages = entries.len().div_ceil(PAGE_SIZE);
    entries
        .chunks(PAGE_SIZE)
        .enumerate()
        .map(|(i, chunk)| format!("{}\n\n({}/{})", chunk.join("\n\n"), i + 1, pages))
        .collect()
}

/// Cuts `text` into messages of at most [`MAX_MESSAGE_CHARS`], breaking
/// between blank-line separated blocks where it can.
pub fn split_text(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for block in text.split("\n\n") {
        let separator = if current.is_empty() { 0 } else { 2 };
        if current.chars().count() + separator + block.chars().count() <= MAX_MESSAGE_CHARS {
            if separator > 0 {
                current.push_str("\n\n");
            }
            current.push_str(block);
            continue;
        }
        if !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }

        // A single oversized block is cut on char boundaries.
        let chars: Vec<char> = block.chars().collect();
        let mut chunks = chars.chunks(MAX_MESSAGE_CHARS).peekable();
        while let Some(chunk) = chunks.next() {
            let chunk: String = chunk.iter().collect();
            if chunks.peek().is_some() {
                parts.push(chunk);
            } else {
                current = chunk;
            }
        }
    }
    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}

/// The log line for an inbound message; credential-shaped text has none.
fn log_line(from: &User, text: &str) -> Option<String> {
    if is_credential(text) {
        return None;
    }
    Some(format!(
        "{} [{}] | msg : {}",
        from.username.as_deref().unwrap_or("-"),
        from.id,
        text
    ))
}

fn log_message(from: &User, text: &str) {
    if let Some(line) = log_line(from, text) {
        info!("{line}");
    }
}

async fn handle_message(bot: Arc<TelegramBot>, orchestrator: Arc<Orchestrator>, message: Message) {
    let (Some(from), Some(text)) = (message.from.as_ref(), message.text.clone()) else {
        return;
    };
    log_message(from, &text);

    let user = UserId(from.id);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handling = async move {
        orchestrator.handle(user, &text, &tx).await;
    };
    let forwarding = async {
        while let Some(reply) = rx.recv().await {
            if let Err(err) = bot.render(&message, reply).await {
                warn!("could not reply to user {user}: {err:#}");
            }
        }
    };
    tokio::join!(handling, forwarding);
}

/// Polls until Ctrl-C, then waits for in-flight requests to finish.
pub async fn run(bot: Arc<TelegramBot>, orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut tasks = JoinSet::new();
    let mut offset = 0;
    info!("Bot server start");

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("failed to listen for shutdown signal")?;
                info!("shutdown requested");
                break;
            }
            updates = bot.get_updates(offset) => match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(message) = update.message {
                            tasks.spawn(handle_message(
                                Arc::clone(&bot),
                                Arc::clone(&orchestrator),
                                message,
                            ));
                        }
                    }
                }
                Err(err) => {
                    warn!("polling updates failed: {err:#}");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            },
        }

        while let Some(finished) = tasks.try_join_next() {
            if let Err(err) = finished {
                error!("message task panicked: {err}");
            }
        }
    }

    info!("waiting for {} in-flight request(s)", tasks.len());
    while let Some(finished) = tasks.join_next().await {
        if let Err(err) = finished {
            error!("message task panicked: {err}");
        }
    }
    Ok(())
}
