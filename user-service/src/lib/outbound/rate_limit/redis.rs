use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;

use crate::outbound::rate_limit::limiter::CounterStore;
use crate::outbound::rate_limit::limiter::WindowCount;

/// INCR + first-increment EXPIRE + TTL readback as one server-side
/// operation, so concurrent requests in the same window never race the
/// expiry.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('TTL', KEYS[1])
return {count, ttl}
"#;

pub struct RedisCounterStore {
    connection: ConnectionManager,
    script: Script,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Connected to Redis for rate-limit counters");

        Ok(Self {
            connection,
            script: Script::new(INCREMENT_SCRIPT),
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, anyhow::Error> {
        let mut connection = self.connection.clone();

        let (count, ttl_seconds): (i64, i64) = self
            .script
            .key(key)
            .arg(window.as_secs())
            .invoke_async(&mut connection)
            .await?;

        Ok(WindowCount { count, ttl_seconds })
    }
}
