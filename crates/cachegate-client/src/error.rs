//! Client error types

use cachegate_domain::ConfigError;
use thiserror::Error;

/// Errors raised inside the client.
///
/// Command methods never return these; they log them and answer with the
/// operation's absence value. Startup paths and the execution scope do
/// surface them.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("no connection handle available for {0}")]
    Unavailable(String),

    #[error("cluster script load requires a sample key to pick a node")]
    MissingSampleKey,

    #[error("unsupported on {topology} topology: {operation}")]
    Unsupported {
        topology: &'static str,
        operation: &'static str,
    },
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Redis(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<deadpool_redis::CreatePoolError> for CacheError {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for CacheError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
