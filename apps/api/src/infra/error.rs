use thiserror::Error;

/// Infrastructure errors surfaced during application startup.
///
/// Display messages are sanitized for logs; the `#[source]` chain may contain
/// connection strings, so log with Display (%e), not Debug (?e).
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Database connection failed. Check DATABASE_URL and ensure the database is running.")]
    DatabaseConnection(#[source] sqlx::Error),

    #[error("Redis connection failed. Check REDIS_URL and credentials.")]
    RedisConnection(#[source] redis::RedisError),
}

impl From<sqlx::Error> for InfraError {
    fn from(e: sqlx::Error) -> Self {
        InfraError::DatabaseConnection(e)
    }
}
