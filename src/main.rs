use std::sync::Arc;

use dotenv::dotenv;
use log::{LevelFilter, info, warn};
use siaka_bot::{
    BotConfig, MemoryStore, Orchestrator, PortalClient, RedisStore, Store, telegram::TelegramBot,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("Initializing dependencies, please wait...");
    let config = BotConfig::new()?;

    let store: Arc<dyn Store> = match &config.redis {
        Some(redis) => Arc::new(RedisStore::connect(&redis.addr, redis.password.as_deref()).await?),
        None => {
            warn!("REDIS_ADDR not set, sessions and cache live in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let portal = Arc::new(PortalClient::new(&config.portal_url, config.request_timeout)?);
    info!("Portal client initialized for {}", config.portal_url);

    let orchestrator = Arc::new(Orchestrator::new(store, portal));
    let bot = Arc::new(TelegramBot::new(&config.bot_token)?);
    info!("Telegram bot initialized");

    siaka_bot::telegram::run(bot, orchestrator).await
}
