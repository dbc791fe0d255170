use async_trait::async_trait;
use redis::{Script, aio::ConnectionManager};

use super::InfraError;
use crate::app_error::{AppError, AppResult};

/// Trait for rate limiting implementations.
#[async_trait]
pub trait RateLimiterTrait: Send + Sync {
    /// Check rate limits for an IP and, when authenticated, a user id.
    /// Returns Ok(()) if within limits, Err(AppError::RateLimited) if exceeded.
    async fn check(&self, ip: &str, user: Option<&str>) -> AppResult<()>;
}

/// Lua script for atomic increment with TTL.
/// Returns the new count after increment. If the key doesn't exist it is
/// created with TTL; a key that lost its TTL gets one again.
const INCR_WITH_TTL_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
elseif redis.call('TTL', KEYS[1]) == -1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

/// Redis-backed fixed-window rate limiter for production use.
#[derive(Clone)]
pub struct RedisRateLimiter {
    manager: ConnectionManager,
    window_secs: u64,
    max_per_ip: u64,
    max_per_user: u64,
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(
        redis_url: &str,
        window_secs: u64,
        max_per_ip: u64,
        max_per_user: u64,
    ) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url).map_err(InfraError::RedisConnection)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(InfraError::RedisConnection)?;
        Ok(Self {
            manager,
            window_secs,
            max_per_ip,
            max_per_user,
            script: Script::new(INCR_WITH_TTL_SCRIPT),
        })
    }

    async fn bump(&self, key: &str) -> AppResult<u64> {
        let mut conn = self.manager.clone();
        self.script
            .key(key)
            .arg(self.window_secs)
            .invoke_async::<_, u64>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("rate limiter error: {e}")))
    }
}

#[async_trait]
impl RateLimiterTrait for RedisRateLimiter {
    async fn check(&self, ip: &str, user: Option<&str>) -> AppResult<()> {
        let count = self.bump(&format!("rl:ip:{ip}")).await?;
        if count > self.max_per_ip {
            return Err(AppError::RateLimited);
        }

        if let Some(user) = user {
            let count = self.bump(&format!("rl:user:{user}")).await?;
            if count > self.max_per_user {
                return Err(AppError::RateLimited);
            }
        }

        Ok(())
    }
}
