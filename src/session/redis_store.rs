//! Redis session backend
//!
//! `SET key value EX ttl` on save, so Redis expires idle sessions itself.

use super::codec;
use super::state::SessionState;
use super::store::{session_key, SessionStore, StoreError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    ttl: Duration,
}

impl RedisSessionStore {
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to Redis session store");
        Ok(Self { conn, ttl })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, phone_number: &str) -> Result<Option<SessionState>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(session_key(phone_number)).await?;
        Ok(raw.as_deref().and_then(codec::decode))
    }

    async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let value = codec::encode(state)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(
            session_key(&state.phone_number),
            value,
            self.ttl.as_secs().max(1),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, phone_number: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(session_key(phone_number)).await?;
        Ok(())
    }
}
