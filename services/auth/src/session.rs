//! Session management using Redis
//!
//! A session is the user's current refresh token. Only that token may be
//! exchanged for new tokens; logging out deletes it.

use anyhow::Result;
use common::{cache::RedisPool, token::session_key};
use tracing::info;
use uuid::Uuid;

/// Session manager for handling user sessions in Redis
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    ttl_seconds: u64,
}

impl SessionManager {
    /// Create a new session manager whose sessions live `ttl_seconds`
    pub fn new(redis_pool: RedisPool, ttl_seconds: u64) -> Self {
        Self {
            redis_pool,
            ttl_seconds,
        }
    }

    /// Create or replace the session for a user
    pub async fn store_session(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        info!("Storing session for user: {}", user_id);

        self.redis_pool
            .set(&session_key(user_id), refresh_token, Some(self.ttl_seconds))
            .await
    }

    /// Get a session for a user
    pub async fn get_session(&self, user_id: Uuid) -> Result<Option<String>> {
        self.redis_pool.get(&session_key(user_id)).await
    }

    /// Delete a session for a user
    pub async fn delete_session(&self, user_id: Uuid) -> Result<()> {
        info!("Deleting session for user: {}", user_id);

        self.redis_pool.delete(&session_key(user_id)).await
    }

    /// Check if `refresh_token` is the user's current session
    pub async fn is_session_valid(&self, user_id: Uuid, refresh_token: &str) -> Result<bool> {
        let stored_token = self.get_session(user_id).await?;
        Ok(stored_token.as_deref() == Some(refresh_token))
    }
}
