use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};

use crate::portal::DEFAULT_REQUEST_TIMEOUT;

/// The env vars needed to run the bot.
#[derive(Debug, Deserialize)]
pub struct BotEnv {
    tg_bot_token: String,
    portal_url: String,
    redis_addr: Option<String>,
    redis_pass: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub addr: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Portal entry point, always ending in `/`.
    pub portal_url: String,
    /// `None` runs on the in-process store.
    pub redis: Option<RedisSettings>,
    pub request_timeout: Duration,
}

impl BotConfig {
    pub fn new() -> anyhow::Result<Self> {
        Self::from_env(BotEnv::load_from_env()?)
    }

    pub fn from_env(env: BotEnv) -> anyhow::Result<Self> {
        anyhow::ensure!(!env.tg_bot_token.trim().is_empty(), "TG_BOT_TOKEN is empty");
        anyhow::ensure!(
            env.portal_url.starts_with("http://") || env.portal_url.starts_with("https://"),
            "PORTAL_URL must be an http(s) url, got {}",
            env.portal_url
        );

        let mut portal_url = env.portal_url;
        if !portal_url.ends_with('/') {
            portal_url.push('/');
        }

        let redis = env
            .redis_addr
            .filter(|addr| !addr.trim().is_empty())
            .map(|addr| RedisSettings {
                addr,
                password: env.redis_pass.filter(|pass| !pass.is_empty()),
            });

        let request_timeout = env
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Ok(Self {
            bot_token: env.tg_bot_token,
            portal_url,
            redis,
            request_timeout,
        })
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
