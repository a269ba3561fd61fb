use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::StorageError;

/// Opens, probes and closes connections to a key-value store.
#[async_trait]
pub trait KvConnector: Send + Sync + 'static {
    /// Shared handle given out to callers. Cloning must be cheap.
    type Connection: Clone + Send + Sync + 'static;

    async fn connect(&self, url: &str) -> Result<Self::Connection, StorageError>;

    /// Round-trip liveness check.
    async fn ping(&self, conn: &mut Self::Connection) -> Result<(), StorageError>;

    async fn close(&self, conn: Self::Connection) -> Result<(), StorageError>;
}

/// Redis over tokio, using a multiplexed `ConnectionManager`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

#[async_trait]
impl KvConnector for RedisConnector {
    type Connection = ConnectionManager;

    async fn connect(&self, url: &str) -> Result<ConnectionManager, StorageError> {
        let client = redis::Client::open(url)?;
        Ok(client.get_connection_manager().await?)
    }

    async fn ping(&self, conn: &mut ConnectionManager) -> Result<(), StorageError> {
        let pong: String = redis::cmd("PING").query_async(conn).await?;
        if pong != "PONG" {
            return Err(StorageError::Connection(format!(
                "unexpected PING reply: {}",
                pong
            )));
        }
        Ok(())
    }

    async fn close(&self, conn: ConnectionManager) -> Result<(), StorageError> {
        // Dropping the last handle tears down the multiplexed connection.
        drop(conn);
        Ok(())
    }
}
