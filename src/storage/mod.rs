mod client;
mod connector;

pub use client::{get_redis, CacheClient, ClientRegistry, RedisClient};
pub use connector::{KvConnector, RedisConnector};

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Redis URL is not configured. Set REDIS_URL.")]
    NotConfigured,

    #[error("Redis client not initialized")]
    NotInitialized,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
