//! Lazy, single-flight connection provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use cachegate_domain::{TopologyConfig, TopologyKind};
use rand::Rng;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use super::handle::{HandleFactory, PoolHandle, RedisHandleFactory, subscriber_client};
use crate::error::{CacheError, Result};

/// Delay between failed initialization attempts: `base` plus a random
/// amount below `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub jitter: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            jitter: Duration::from_millis(1000),
        }
    }
}

impl Backoff {
    pub const fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    pub fn next_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.base;
        }
        self.base + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
    }
}

/// Owns the topology handle for one configuration.
///
/// The handle is created on first use. Concurrent first callers wait on a
/// single initialization; a failed attempt is retried after a jittered
/// pause until one succeeds. Callers wanting a deadline wrap
/// [`ConnectionProvider::acquire`] in `tokio::time::timeout`.
pub struct ConnectionProvider {
    config: Arc<TopologyConfig>,
    factory: Arc<dyn HandleFactory>,
    cell: OnceCell<Option<Arc<PoolHandle>>>,
    backoff: Backoff,
    attempts: AtomicU64,
    closed: AtomicBool,
}

impl ConnectionProvider {
    pub fn new(config: TopologyConfig) -> Self {
        Self::with_factory(config, Arc::new(RedisHandleFactory))
    }

    pub fn with_factory(config: TopologyConfig, factory: Arc<dyn HandleFactory>) -> Self {
        Self {
            config: Arc::new(config),
            factory,
            cell: OnceCell::new(),
            backoff: Backoff::default(),
            attempts: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn kind(&self) -> TopologyKind {
        self.config.kind
    }

    /// Initialization attempts made so far, failed ones included.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// The handle, if initialization has already finished.
    pub fn get(&self) -> Option<Arc<PoolHandle>> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        self.cell.get().cloned().flatten()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// Return the handle, creating it on first use.
    ///
    /// `None` means the provider can never produce a handle: it was shut
    /// down, it is a standalone provider with no node configured, or its
    /// configuration is invalid. Other build failures are not surfaced; the
    /// call keeps retrying.
    pub async fn acquire(&self) -> Option<Arc<PoolHandle>> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            match self.cell.get_or_try_init(|| self.initialize()).await {
                Ok(handle) => return handle.clone(),
                Err(err) => {
                    let delay = self.backoff.next_delay();
                    warn!(
                        app_id = %self.config.app_id,
                        kind = %self.config.kind,
                        attempt = self.attempts(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Connection handle initialization failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn initialize(&self) -> Result<Option<Arc<PoolHandle>>> {
        if self.config.kind == TopologyKind::Standalone && self.config.primary_node().is_none() {
            warn!(app_id = %self.config.app_id, "No standalone node configured, handle is absent");
            return Ok(None);
        }
        if let Err(err) = self.config.validate() {
            return Ok(self.misconfigured(&CacheError::from(err)));
        }

        self.attempts.fetch_add(1, Ordering::Relaxed);
        match self.factory.build(&self.config).await {
            Ok(handle) => Ok(Some(Arc::new(handle))),
            Err(err @ CacheError::Config(_)) => Ok(self.misconfigured(&err)),
            Err(err) => Err(err),
        }
    }

    /// Configuration errors are not retried: the handle stays absent.
    fn misconfigured(&self, err: &CacheError) -> Option<Arc<PoolHandle>> {
        error!(
            app_id = %self.config.app_id,
            kind = %self.config.kind,
            error = %err,
            "Invalid topology configuration, handle is absent"
        );
        None
    }

    /// Client for a dedicated pub/sub connection to this topology.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider was shut down or no node can be
    /// resolved.
    pub async fn subscriber(&self) -> Result<redis::Client> {
        if self.is_shut_down() {
            return Err(CacheError::Unavailable(self.config.app_id.clone()));
        }
        subscriber_client(&self.config).await
    }

    /// Close pooled connections and refuse further acquisitions.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(Some(handle)) = self.cell.get() {
            handle.close();
        }
        info!(app_id = %self.config.app_id, kind = %self.config.kind, "Connection provider shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ConnectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProvider")
            .field("app_id", &self.config.app_id)
            .field("kind", &self.config.kind)
            .field("initialized", &self.is_initialized())
            .field("closed", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{CountingFactory, fast_backoff};
    use super::*;
    use async_trait::async_trait;
    use cachegate_domain::{ConfigError, NodeAddr};
    use std::sync::atomic::AtomicUsize;

    fn config() -> TopologyConfig {
        TopologyConfig::builder("provider-test")
            .node(NodeAddr::new("127.0.0.1", 1))
            .max_wait(Duration::from_millis(50))
            .build()
    }

    #[tokio::test]
    async fn test_concurrent_acquire_builds_once() {
        let factory = Arc::new(CountingFactory::slow(Duration::from_millis(20)));
        let provider = Arc::new(
            ConnectionProvider::with_factory(config(), factory.clone()).with_backoff(fast_backoff()),
        );

        let tasks = (0..32)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.acquire().await })
            })
            .collect::<Vec<_>>();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap().unwrap());
        }

        assert_eq!(factory.builds(), 1);
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_retries_until_build_succeeds() {
        let factory = Arc::new(CountingFactory::failing(2));
        let provider =
            ConnectionProvider::with_factory(config(), factory.clone()).with_backoff(fast_backoff());

        let handle = provider.acquire().await;

        assert!(handle.is_some());
        assert_eq!(factory.builds(), 3);
        assert_eq!(provider.attempts(), 3);
        assert!(provider.is_initialized());
    }

    #[tokio::test]
    async fn test_standalone_without_node_is_absent() {
        let factory = Arc::new(CountingFactory::default());
        let config = TopologyConfig::builder("provider-test").build();
        let provider = ConnectionProvider::with_factory(config, factory.clone());

        assert!(provider.acquire().await.is_none());
        assert!(provider.acquire().await.is_none());
        assert_eq!(factory.builds(), 0);
        assert!(provider.is_initialized());
    }

    #[tokio::test]
    async fn test_invalid_config_is_not_retried() {
        let factory = Arc::new(CountingFactory::default());
        let config = TopologyConfig::builder("provider-test")
            .kind(TopologyKind::Sentinel)
            .node(NodeAddr::new("127.0.0.1", 26379))
            .build();
        let provider = ConnectionProvider::with_factory(config, factory.clone());

        let handle = tokio::time::timeout(Duration::from_secs(1), provider.acquire())
            .await
            .unwrap();

        assert!(handle.is_none());
        assert_eq!(factory.builds(), 0);
        assert!(provider.is_initialized());
    }

    /// Passes validation but reports a configuration problem when building.
    #[derive(Default)]
    struct RejectingFactory {
        builds: AtomicUsize,
    }

    #[async_trait]
    impl HandleFactory for RejectingFactory {
        async fn build(&self, _config: &TopologyConfig) -> Result<PoolHandle> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Err(ConfigError::MissingMasterName.into())
        }
    }

    #[tokio::test]
    async fn test_config_error_from_factory_is_final() {
        let factory = Arc::new(RejectingFactory::default());
        let provider = ConnectionProvider::with_factory(config(), factory.clone())
            .with_backoff(fast_backoff());

        let handle = tokio::time::timeout(Duration::from_secs(1), provider.acquire())
            .await
            .unwrap();

        assert!(handle.is_none());
        assert!(provider.acquire().await.is_none());
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
        assert_eq!(provider.attempts(), 1);
    }

    #[tokio::test]
    async fn test_get_before_and_after_acquire() {
        let provider = ConnectionProvider::with_factory(config(), Arc::new(CountingFactory::default()));
        assert!(provider.get().is_none());

        let handle = provider.acquire().await.unwrap();
        assert!(Arc::ptr_eq(&handle, &provider.get().unwrap()));
    }

    #[tokio::test]
    async fn test_shutdown_refuses_acquire() {
        let provider = ConnectionProvider::with_factory(config(), Arc::new(CountingFactory::default()));
        let handle = provider.acquire().await.unwrap();

        provider.shutdown();
        provider.shutdown();

        assert!(handle.is_closed());
        assert!(provider.is_shut_down());
        assert!(provider.acquire().await.is_none());
        assert!(provider.get().is_none());
    }

    #[test]
    fn test_backoff_delay_bounds() {
        let backoff = Backoff::default();
        for _ in 0..100 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_millis(200));
            assert!(delay < Duration::from_millis(1200));
        }
        let flat = Backoff::new(Duration::from_millis(5), Duration::ZERO);
        assert_eq!(flat.next_delay(), Duration::from_millis(5));
    }
}
