// ============================================
// MANUS BACKEND - Redis Cache Client
// Lazy connection with explicit lifecycle
// ============================================

use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use super::connector::{KvConnector, RedisConnector};
use super::StorageError;
use crate::config::get_settings;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Wrapper around a single lazily-opened store connection.
///
/// Starts disconnected. `initialize` connects and probes, `shutdown` closes
/// and drops the wrapper from its registry. `client` never connects on its
/// own; it fails unless the wrapper is connected.
pub struct CacheClient<C: KvConnector = RedisConnector> {
    url: Option<String>,
    connector: C,
    // Held across connect/close so state transitions never interleave.
    state: AsyncMutex<Option<C::Connection>>,
    registry: Option<&'static ClientRegistry<C>>,
}

pub type RedisClient = CacheClient<RedisConnector>;

impl<C: KvConnector> CacheClient<C> {
    pub fn new(url: Option<String>, connector: C) -> Self {
        Self {
            url,
            connector,
            state: AsyncMutex::new(None),
            registry: None,
        }
    }

    /// Connect and verify liveness. No-op when already connected.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Ok(());
        }

        match self.open().await {
            Ok(conn) => {
                *state = Some(conn);
                tracing::info!("Successfully connected to Redis");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to connect to Redis: {}", e);
                Err(e)
            }
        }
    }

    async fn open(&self) -> Result<C::Connection> {
        let url = self.url.as_deref().ok_or(StorageError::NotConfigured)?;
        let mut conn = self.connector.connect(url).await?;
        self.connector.ping(&mut conn).await?;
        Ok(conn)
    }

    /// Close the connection if open, then forget this wrapper in the registry
    /// so the next lookup builds a fresh one.
    pub async fn shutdown(&self) -> Result<()> {
        let closed = {
            let mut state = self.state.lock().await;
            match state.take() {
                Some(conn) => self.connector.close(conn).await,
                None => Ok(()),
            }
        };

        // The handle is gone either way, so the wrapper must leave the registry.
        if let Some(registry) = self.registry {
            registry.clear();
        }

        match closed {
            Ok(()) => {
                tracing::info!("Disconnected from Redis");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to close Redis connection: {}", e);
                Err(e)
            }
        }
    }

    /// The live connection handle.
    pub async fn client(&self) -> Result<C::Connection> {
        self.state
            .lock()
            .await
            .clone()
            .ok_or(StorageError::NotInitialized)
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.is_some()
    }
}

/// Holds at most one shared `CacheClient` for the process.
pub struct ClientRegistry<C: KvConnector> {
    slot: Mutex<Option<Arc<CacheClient<C>>>>,
}

impl<C: KvConnector> Default for ClientRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: KvConnector> ClientRegistry<C> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the registered client, building one with `make` if empty.
    pub fn get_or_insert_with<F>(&'static self, make: F) -> Result<Arc<CacheClient<C>>>
    where
        F: FnOnce() -> Result<CacheClient<C>>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let mut client = make()?;
        client.registry = Some(self);
        let client = Arc::new(client);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    pub fn clear(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.take();
    }

    pub fn is_empty(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_none())
            .unwrap_or(true)
    }
}

lazy_static::lazy_static! {
    static ref REDIS: ClientRegistry<RedisConnector> = ClientRegistry::new();
}

/// Process-wide Redis client, configured from `REDIS_URL`.
pub fn get_redis() -> Result<Arc<RedisClient>> {
    REDIS.get_or_insert_with(|| {
        let settings = get_settings()?;
        Ok(CacheClient::new(settings.redis_url.clone(), RedisConnector))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingConnector {
        connects: AtomicUsize,
        pings: AtomicUsize,
        closes: AtomicUsize,
        refuse: bool,
        fail_close: bool,
    }

    #[async_trait]
    impl KvConnector for CountingConnector {
        type Connection = usize;

        async fn connect(&self, _url: &str) -> Result<usize> {
            tokio::task::yield_now().await;
            if self.refuse {
                return Err(StorageError::Connection("connection refused".to_string()));
            }
            Ok(self.connects.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn ping(&self, _conn: &mut usize) -> Result<()> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self, _conn: usize) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(StorageError::Connection("broken pipe".to_string()));
            }
            Ok(())
        }
    }

    fn counting_client() -> CacheClient<CountingConnector> {
        CacheClient::new(
            Some("redis://localhost:6379/0".to_string()),
            CountingConnector::default(),
        )
    }

    #[tokio::test]
    async fn test_client_requires_initialize() {
        let cache = counting_client();

        assert!(matches!(cache.client().await, Err(StorageError::NotInitialized)));

        cache.initialize().await.unwrap();
        assert_eq!(cache.client().await.unwrap(), 1);

        cache.shutdown().await.unwrap();
        assert!(matches!(cache.client().await, Err(StorageError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_initialize_twice_probes_once() {
        let cache = counting_client();

        cache.initialize().await.unwrap();
        cache.initialize().await.unwrap();

        assert_eq!(cache.connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(cache.connector.pings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_initialize_connects_once() {
        let cache = counting_client();

        let (a, b) = tokio::join!(cache.initialize(), cache.initialize());
        a.unwrap();
        b.unwrap();

        assert_eq!(cache.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_stays_uninitialized() {
        let cache = CacheClient::new(
            Some("redis://localhost:1/0".to_string()),
            CountingConnector {
                refuse: true,
                ..Default::default()
            },
        );

        assert!(matches!(
            cache.initialize().await,
            Err(StorageError::Connection(_))
        ));
        assert!(!cache.is_connected().await);
        assert_eq!(cache.connector.pings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_url_is_not_configured() {
        let cache = CacheClient::new(None, CountingConnector::default());

        assert!(matches!(
            cache.initialize().await,
            Err(StorageError::NotConfigured)
        ));
        assert_eq!(cache.connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_connection_is_noop() {
        let cache = counting_client();

        cache.shutdown().await.unwrap();
        assert_eq!(cache.connector.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reinitialize_after_shutdown() {
        let cache = counting_client();

        cache.initialize().await.unwrap();
        cache.shutdown().await.unwrap();
        cache.initialize().await.unwrap();

        assert_eq!(cache.client().await.unwrap(), 2);
        assert_eq!(cache.connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registry_cleared_on_shutdown() {
        let registry: &'static ClientRegistry<CountingConnector> =
            Box::leak(Box::new(ClientRegistry::new()));

        let first = registry.get_or_insert_with(|| Ok(counting_client())).unwrap();
        let again = registry.get_or_insert_with(|| Ok(counting_client())).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        first.initialize().await.unwrap();
        first.shutdown().await.unwrap();
        assert!(registry.is_empty());

        let fresh = registry.get_or_insert_with(|| Ok(counting_client())).unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert!(!fresh.is_connected().await);
    }

    #[tokio::test]
    async fn test_failed_close_still_clears_registry() {
        let registry: &'static ClientRegistry<CountingConnector> =
            Box::leak(Box::new(ClientRegistry::new()));
        let cache = registry
            .get_or_insert_with(|| {
                Ok(CacheClient::new(
                    Some("redis://localhost:6379/0".to_string()),
                    CountingConnector {
                        fail_close: true,
                        ..Default::default()
                    },
                ))
            })
            .unwrap();
        cache.initialize().await.unwrap();

        assert!(matches!(
            cache.shutdown().await,
            Err(StorageError::Connection(_))
        ));
        assert!(registry.is_empty());
        assert!(!cache.is_connected().await);
        assert_eq!(cache.connector.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_propagates_build_errors() {
        let registry: &'static ClientRegistry<CountingConnector> =
            Box::leak(Box::new(ClientRegistry::new()));

        let result = registry.get_or_insert_with(|| Err(StorageError::NotConfigured));

        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
