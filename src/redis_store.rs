use std::time::Duration;

use async_trait::async_trait;
use fred::{
    clients::RedisClient,
    interfaces::{ClientLike, KeysInterface},
    types::{Expiration, ReconnectPolicy, RedisConfig},
};
use log::info;

use crate::{error::StoreError, store::Store};

/// Redis-backed store. Expiry is delegated to Redis (`SET .. PX`).
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    /// Connects to `addr` (`host:port`, database 0) and pings it once, so a
    /// dead Redis is reported at startup rather than on the first message.
    pub async fn connect(addr: &str, password: Option<&str>) -> Result<Self, StoreError> {
        let mut config = RedisConfig::from_url(&format!("redis://{addr}/0"))?;
        config.password = password.filter(|p| !p.is_empty()).map(str::to_string);

        let policy = ReconnectPolicy::new_exponential(0, 100, 30_000, 2);
        let client = RedisClient::new(config, None, None, Some(policy));
        client.init().await?;

        let _: () = client.ping().await?;
        info!("Redis cache initialized at {addr}");

        Ok(Self { client })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.client.get::<Option<String>, _>(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1);
        self.client
            .set::<(), _, _>(key, value, Some(Expiration::PX(millis)), None, false)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client.del::<i64, _>(key).await?;
        Ok(())
    }
}
