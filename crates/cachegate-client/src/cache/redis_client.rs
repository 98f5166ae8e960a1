//! # Redis Cache Layer
//!
//! Topology-agnostic command façade. One [`CacheClient`] serves standalone,
//! sentinel and cluster deployments alike; the command catalogue lives in
//! the sibling modules (`strings`, `hashes`, `lists`, ...).
//!
//! Commands never return errors. Every failure is logged and answered with
//! the operation's absence value: `None`, `false`, `0` or an empty
//! collection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cachegate_domain::{CacheKey, TopologyConfig, TopologyKind};
use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{trace, warn};

use super::lease::Lease;
use crate::codec::{JsonSerializer, Serializer};
use crate::error::{CacheError, Result};
use crate::scope::{Binding, ExecutionScope};
use crate::strategy::{Touched, TtlRefresh};
use crate::topology::{ConnectionProvider, PoolHandle};

struct ClientInner<S> {
    provider: ConnectionProvider,
    serializer: S,
}

/// Cache client over one configured topology.
///
/// Cheap to clone; clones share the provider. A client obtained from an
/// [`ExecutionScope`] additionally routes its commands through the scope's
/// bound connection.
pub struct CacheClient<S: Serializer = JsonSerializer> {
    inner: Arc<ClientInner<S>>,
    binding: Option<Arc<Binding<deadpool_redis::Connection>>>,
}

impl<S: Serializer> Clone for CacheClient<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            binding: self.binding.clone(),
        }
    }
}

impl<S: Serializer> std::fmt::Debug for CacheClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("provider", &self.inner.provider)
            .field("scoped", &self.binding.is_some())
            .finish_non_exhaustive()
    }
}

impl CacheClient<JsonSerializer> {
    /// Create a client with the JSON codec. No connection is opened until
    /// the first command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: TopologyConfig) -> Result<Self> {
        Self::with_serializer(config, JsonSerializer)
    }
}

impl<S: Serializer> CacheClient<S> {
    /// Create a client with an explicit codec. No connection is opened until
    /// the first command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_serializer(config: TopologyConfig, serializer: S) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_provider(ConnectionProvider::new(config), serializer))
    }

    /// Wrap an existing provider, e.g. one with a custom handle factory.
    pub fn from_provider(provider: ConnectionProvider, serializer: S) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                provider,
                serializer,
            }),
            binding: None,
        }
    }

    /// Create a client and wait until its connection handle is ready.
    ///
    /// Initialization is retried until it succeeds; wrap the call in
    /// `tokio::time::timeout` to bound it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub async fn connect(config: TopologyConfig, serializer: S) -> Result<Self> {
        let client = Self::with_serializer(config, serializer)?;
        client
            .inner
            .provider
            .acquire()
            .await
            .ok_or_else(|| CacheError::Unavailable(client.app_id().to_string()))?;
        Ok(client)
    }

    pub(crate) fn scoped(&self, binding: Arc<Binding<deadpool_redis::Connection>>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            binding: Some(binding),
        }
    }

    pub fn config(&self) -> &TopologyConfig {
        self.inner.provider.config()
    }

    pub fn app_id(&self) -> &str {
        &self.config().app_id
    }

    pub fn kind(&self) -> TopologyKind {
        self.inner.provider.kind()
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.inner.provider
    }

    pub fn serializer(&self) -> &S {
        &self.inner.serializer
    }

    /// Whether this client routes through an execution scope.
    pub const fn is_scoped(&self) -> bool {
        self.binding.is_some()
    }

    /// Close pooled connections. Later commands answer with absence values.
    pub fn shutdown(&self) {
        self.inner.provider.shutdown();
    }

    // =========================================================================
    // EXECUTION SCOPES
    // =========================================================================

    /// Open an unbound execution scope over this client's provider.
    pub fn scope(&self) -> ExecutionScope<S> {
        ExecutionScope::new(self)
    }

    /// Bind a scope, run `f` with the scoped client, then release the scope.
    ///
    /// # Errors
    ///
    /// Returns the bind error; `f` is not run in that case.
    pub async fn with_scope<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = T>,
    {
        let scope = self.scope();
        scope.bind().await?;
        let output = f(scope.client().clone()).await;
        scope.unbind().await;
        Ok(output)
    }

    // =========================================================================
    // PLUMBING
    // =========================================================================

    /// Connection for one command: the bound one if this client is scoped
    /// and bound, otherwise one from the topology handle.
    pub(crate) async fn lease(&self) -> Result<Lease<'_>> {
        if let Some(binding) = &self.binding
            && let Some(guard) = binding.lease().await
        {
            return Ok(Lease::Bound(guard));
        }

        let handle = self
            .inner
            .provider
            .acquire()
            .await
            .ok_or_else(|| CacheError::Unavailable(self.app_id().to_string()))?;

        let lease = match handle.as_ref() {
            PoolHandle::Standalone(pool) => Lease::Pooled(pool.get().await?),
            PoolHandle::Sentinel(pool) => Lease::Sentinel(
                pool.get()
                    .await
                    .map_err(|e| CacheError::Pool(e.to_string()))?,
            ),
            PoolHandle::Cluster(conn) => Lease::Shared(conn.clone()),
        };
        trace!(source = lease.source(), "Connection leased");
        Ok(lease)
    }

    /// Run one command under the read timeout, converting any failure into
    /// the absence value.
    pub(crate) async fn guarded<T, F>(&self, op: &'static str, key: &str, fut: F) -> T
    where
        T: Default,
        F: Future<Output = Result<T>>,
    {
        self.guarded_within(op, key, self.config().read_timeout, fut)
            .await
    }

    pub(crate) async fn guarded_within<T, F>(
        &self,
        op: &'static str,
        key: &str,
        limit: Duration,
        fut: F,
    ) -> T
    where
        T: Default,
        F: Future<Output = Result<T>>,
    {
        let err = match tokio::time::timeout(limit, fut).await {
            Ok(Ok(value)) => return value,
            Ok(Err(err)) => err,
            Err(_) => CacheError::Timeout {
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            },
        };
        warn!(
            app_id = %self.app_id(),
            op,
            key,
            error = %err,
            "Cache operation failed"
        );
        T::default()
    }

    /// Re-arm the key's expiry when `policy` says the outcome warrants it.
    /// Failures are logged and do not affect the command's result.
    pub(crate) async fn refresh<O: Touched + ?Sized>(
        &self,
        conn: &mut Lease<'_>,
        key: &CacheKey,
        policy: TtlRefresh,
        outcome: &O,
    ) {
        if !policy.applies(outcome) {
            return;
        }
        let refreshed: redis::RedisResult<bool> =
            conn.expire(self.key_bytes(key), key.ttl_secs()).await;
        match refreshed {
            Ok(_) => trace!(key = %key, ttl_secs = key.ttl_secs(), policy = policy.as_str(), "TTL refreshed"),
            Err(err) => warn!(key = %key, error = %err, "TTL refresh failed"),
        }
    }

    // ===== CODEC =====

    pub(crate) fn key_bytes(&self, key: &CacheKey) -> Vec<u8> {
        self.inner.serializer.encode_key(key.name())
    }

    pub(crate) fn raw_key(&self, name: &str) -> Vec<u8> {
        self.inner.serializer.encode_key(name)
    }

    pub(crate) fn field_bytes(&self, field: &str) -> Vec<u8> {
        self.inner.serializer.encode_field(field)
    }

    pub(crate) fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>> {
        self.inner.serializer.encode(value)
    }

    pub(crate) fn encode_each<V: Serialize>(&self, values: &[V]) -> Result<Vec<Vec<u8>>> {
        values.iter().map(|v| self.encode(v)).collect()
    }

    pub(crate) fn decode_opt<T: DeserializeOwned>(&self, bytes: Option<Vec<u8>>) -> Result<Option<T>> {
        self.inner.serializer.decode_opt(bytes.as_deref())
    }

    pub(crate) fn decode_all<T: DeserializeOwned>(&self, items: &[Vec<u8>]) -> Result<Vec<T>> {
        self.inner.serializer.decode_all(items)
    }

    pub(crate) fn decode_each<T: DeserializeOwned>(
        &self,
        items: Vec<Option<Vec<u8>>>,
    ) -> Result<Vec<Option<T>>> {
        items.into_iter().map(|b| self.decode_opt(b)).collect()
    }

    pub(crate) fn decode_key(&self, bytes: &[u8]) -> Result<String> {
        self.inner.serializer.decode_key(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::provider::testing::{CountingFactory, fast_backoff};
    use cachegate_domain::{KeyNamespace, KeySpec, NodeAddr};

    const SESSION: KeyNamespace = KeyNamespace::new("session:", 60, "session");

    /// Client whose pools point at a closed port and skip the startup ping,
    /// so every command fails at connect time.
    fn unreachable_client() -> CacheClient {
        let config = TopologyConfig::builder("facade-test")
            .node(NodeAddr::new("127.0.0.1", 1))
            .connect_timeout(Duration::from_millis(200))
            .read_timeout(Duration::from_millis(500))
            .max_wait(Duration::from_millis(200))
            .build();
        let provider = ConnectionProvider::with_factory(config, Arc::new(CountingFactory::default()))
            .with_backoff(fast_backoff());
        CacheClient::from_provider(provider, JsonSerializer)
    }

    #[tokio::test]
    async fn test_reads_return_absence_on_failure() {
        let client = unreachable_client();
        let key = SESSION.key("abc");

        assert_eq!(client.get::<String>(&key).await, None);
        assert!(!client.exists(&key).await);
        assert!(client.hgetall::<String>(&key).await.is_empty());
        assert!(client.lrange::<String>(&key, 0, -1).await.is_empty());
        assert_eq!(client.zscore(&key, &"member").await, None);
    }

    #[tokio::test]
    async fn test_writes_return_absence_on_failure() {
        let client = unreachable_client();
        let key = SESSION.key("abc");

        assert!(!client.set(&key, &"value").await);
        assert_eq!(client.sadd(&key, &["a", "b"]).await, 0);
        assert_eq!(client.hset(&key, "field", &1).await, 0);
        assert_eq!(client.incr(&key).await, 0);
        assert_eq!(client.publish("events", "hello").await, 0);
    }

    #[tokio::test]
    async fn test_shut_down_client_answers_absence() {
        let client = unreachable_client();
        client.shutdown();
        assert_eq!(client.get::<String>(&SESSION.key("x")).await, None);
        assert!(client.provider().is_shut_down());
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let err = CacheClient::new(TopologyConfig::builder("").build()).unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[tokio::test]
    async fn test_new_is_lazy() {
        let config = TopologyConfig::builder("lazy")
            .node(NodeAddr::new("127.0.0.1", 1))
            .build();
        let client = CacheClient::new(config).unwrap();
        assert!(!client.provider().is_initialized());
        assert!(!client.is_scoped());
        assert_eq!(client.kind(), TopologyKind::Standalone);
        assert_eq!(client.app_id(), "lazy");
    }

    #[tokio::test]
    async fn test_guarded_times_out() {
        let client = unreachable_client();
        let value: i64 = client
            .guarded_within("sleep", "k", Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(7)
            })
            .await;
        assert_eq!(value, 0);
    }
}
