mod config;
mod error;
mod redis_store;
mod text_manipulators;

pub mod command;
pub mod extractors;
pub mod orchestrator;
pub mod portal;
pub mod resource;
pub mod session;
pub mod store;
pub mod telegram;

pub use config::{BotConfig, BotEnv, LoadFromEnv, RedisSettings};
pub use error::{AuthError, FetchError, RequestError, StoreError};
pub use orchestrator::{Orchestrator, Reply};
pub use portal::{Portal, PortalClient};
pub use redis_store::RedisStore;
pub use store::{MemoryStore, Store};
