//! Connection handles for each topology and the factory that builds them.

use async_trait::async_trait;
use cachegate_domain::{ConfigError, NodeAddr, TopologyConfig, TopologyKind};
use deadpool_redis::sentinel::{Config as SentinelConfig, SentinelServerType};
use deadpool_redis::{
    ConnectionAddr, ConnectionInfo, PoolConfig, RedisConnectionInfo, Runtime,
};
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use tracing::{debug, info};

use crate::error::{CacheError, Result};

/// The topology-specific resource a provider hands out.
///
/// Standalone and sentinel deployments use borrow/return pools. The cluster
/// connection is a single multiplexed handle cloned per call.
pub enum PoolHandle {
    Standalone(deadpool_redis::Pool),
    Sentinel(deadpool_redis::sentinel::Pool),
    Cluster(ClusterConnection),
}

impl PoolHandle {
    pub const fn kind(&self) -> TopologyKind {
        match self {
            Self::Standalone(_) => TopologyKind::Standalone,
            Self::Sentinel(_) => TopologyKind::Sentinel,
            Self::Cluster(_) => TopologyKind::Cluster,
        }
    }

    /// Stop handing out pooled connections. Connections already borrowed
    /// are dropped when returned.
    pub fn close(&self) {
        match self {
            Self::Standalone(pool) => pool.close(),
            Self::Sentinel(pool) => pool.close(),
            Self::Cluster(_) => {}
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Self::Standalone(pool) => pool.is_closed(),
            Self::Sentinel(pool) => pool.is_closed(),
            Self::Cluster(_) => false,
        }
    }
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PoolHandle").field(&self.kind()).finish()
    }
}

/// Builds a [`PoolHandle`] from configuration.
///
/// The provider calls this at most once per successful initialization.
#[async_trait]
pub trait HandleFactory: Send + Sync {
    async fn build(&self, config: &TopologyConfig) -> Result<PoolHandle>;
}

/// Factory that talks to a real store and verifies it with `PING`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisHandleFactory;

#[async_trait]
impl HandleFactory for RedisHandleFactory {
    async fn build(&self, config: &TopologyConfig) -> Result<PoolHandle> {
        let handle = match config.kind {
            TopologyKind::Standalone => PoolHandle::Standalone(standalone_pool(config)?),
            TopologyKind::Sentinel => PoolHandle::Sentinel(sentinel_pool(config)?),
            TopologyKind::Cluster => PoolHandle::Cluster(cluster_connection(config).await?),
        };

        warm_up(&handle, config.pool_sizing().min_idle).await?;

        info!(
            app_id = %config.app_id,
            kind = %config.kind,
            max_pool = config.pool_sizing().max_size,
            "Connection handle ready"
        );
        Ok(handle)
    }
}

// =============================================================================
// POOL CONSTRUCTION
// =============================================================================

fn pool_config(config: &TopologyConfig) -> PoolConfig {
    let mut pool = PoolConfig::new(config.pool_sizing().max_size);
    pool.timeouts.wait = Some(config.max_wait);
    pool.timeouts.create = Some(config.connect_timeout);
    pool.timeouts.recycle = Some(config.connect_timeout);
    pool
}

fn redis_info(config: &TopologyConfig) -> RedisConnectionInfo {
    RedisConnectionInfo {
        password: config.password.clone(),
        ..RedisConnectionInfo::default()
    }
}

/// Borrow/return pool against the first configured node. Creating the pool
/// does not open any connection.
///
/// # Errors
///
/// Returns an error if no node is configured or the pool cannot be created.
pub fn standalone_pool(config: &TopologyConfig) -> Result<deadpool_redis::Pool> {
    let node = config
        .primary_node()
        .ok_or(ConfigError::MissingNodes(config.kind))?;

    let mut cfg = deadpool_redis::Config::from_connection_info(ConnectionInfo {
        addr: ConnectionAddr::Tcp(node.host.clone(), node.port),
        redis: redis_info(config),
    });
    cfg.pool = Some(pool_config(config));

    debug!(node = %node, "Creating standalone pool");
    Ok(cfg.create_pool(Some(Runtime::Tokio1))?)
}

/// Pool whose connections go to whatever master the sentinels report.
///
/// # Errors
///
/// Returns an error if the master name is missing or the pool cannot be
/// created.
pub fn sentinel_pool(config: &TopologyConfig) -> Result<deadpool_redis::sentinel::Pool> {
    let master = config
        .master_name
        .clone()
        .ok_or(ConfigError::MissingMasterName)?;
    let connections = config
        .nodes
        .iter()
        .map(|node| ConnectionInfo {
            addr: ConnectionAddr::Tcp(node.host.clone(), node.port),
            redis: redis_info(config),
        })
        .collect::<Vec<_>>();

    // The first entry's credentials also authenticate against the master.
    let mut cfg = SentinelConfig::from_urls(Vec::<String>::new(), master, SentinelServerType::Master);
    cfg.urls = None;
    cfg.connections = Some(connections);
    cfg.pool = Some(pool_config(config));

    debug!(sentinels = config.nodes.len(), "Creating sentinel pool");
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| CacheError::Pool(e.to_string()))
}

/// Multiplexed cluster connection with the configured redirection budget.
///
/// No response timeout is set on the connection: blocking pops wait longer
/// than `read_timeout`, and every command is already bounded by the façade.
///
/// # Errors
///
/// Returns an error if the cluster cannot be reached.
pub async fn cluster_connection(config: &TopologyConfig) -> Result<ClusterConnection> {
    let urls = config.nodes.iter().map(NodeAddr::url).collect::<Vec<_>>();

    let mut builder = ClusterClientBuilder::new(urls)
        .connection_timeout(config.connect_timeout)
        .retries(config.max_redirections);
    if let Some(password) = &config.password {
        builder = builder.password(password.clone());
    }

    debug!(seeds = config.nodes.len(), "Connecting to cluster");
    let client = builder.build()?;
    Ok(client.get_async_connection().await?)
}

/// Verify the handle answers `PING`, opening `min_idle` pooled connections
/// (at least one) so they sit idle in the pool afterwards.
async fn warm_up(handle: &PoolHandle, min_idle: usize) -> Result<()> {
    match handle {
        PoolHandle::Standalone(pool) => {
            let mut held = Vec::with_capacity(min_idle.max(1));
            for _ in 0..min_idle.max(1) {
                let mut conn = pool.get().await?;
                let _: String = redis::cmd("PING").query_async(&mut conn).await?;
                held.push(conn);
            }
        }
        PoolHandle::Sentinel(pool) => {
            let mut held = Vec::with_capacity(min_idle.max(1));
            for _ in 0..min_idle.max(1) {
                let mut conn = pool.get().await.map_err(|e| CacheError::Pool(e.to_string()))?;
                let _: String = redis::cmd("PING").query_async(&mut conn).await?;
                held.push(conn);
            }
        }
        PoolHandle::Cluster(conn) => {
            let mut conn = conn.clone();
            let _: redis::Value = redis::cmd("PING").query_async(&mut conn).await?;
        }
    }
    Ok(())
}

// =============================================================================
// SUBSCRIBER CONNECTIONS
// =============================================================================

/// Client for a dedicated pub/sub connection, outside any pool.
///
/// Standalone and cluster use the first configured node. Sentinel asks the
/// sentinels for the current master.
///
/// # Errors
///
/// Returns an error if no node is configured or the sentinels cannot name a
/// master.
pub async fn subscriber_client(config: &TopologyConfig) -> Result<redis::Client> {
    let redis_info = redis::RedisConnectionInfo {
        password: config.password.clone(),
        ..redis::RedisConnectionInfo::default()
    };

    match config.kind {
        TopologyKind::Standalone | TopologyKind::Cluster => {
            let node = config
                .primary_node()
                .ok_or(ConfigError::MissingNodes(config.kind))?;
            Ok(redis::Client::open(redis::ConnectionInfo {
                addr: redis::ConnectionAddr::Tcp(node.host.clone(), node.port),
                redis: redis_info,
            })?)
        }
        TopologyKind::Sentinel => {
            let master = config
                .master_name
                .as_deref()
                .ok_or(ConfigError::MissingMasterName)?;
            let urls = config.nodes.iter().map(NodeAddr::url).collect::<Vec<_>>();
            let mut sentinel = redis::sentinel::Sentinel::build(urls)?;
            let node_info = redis::sentinel::SentinelNodeConnectionInfo {
                tls_mode: None,
                redis_connection_info: Some(redis_info),
            };
            Ok(sentinel.async_master_for(master, Some(&node_info)).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_store::FakeStore;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn local(kind: TopologyKind) -> TopologyConfig {
        TopologyConfig::builder("handle-test")
            .kind(kind)
            .node(NodeAddr::new("127.0.0.1", 1))
            .max_wait(Duration::from_millis(100))
            .connect_timeout(Duration::from_millis(100))
            .build()
    }

    #[tokio::test]
    async fn test_standalone_pool_is_lazy() {
        let pool = standalone_pool(&local(TopologyKind::Standalone)).unwrap();
        let status = pool.status();
        assert_eq!(status.max_size, 16);
        assert_eq!(status.size, 0);
    }

    #[tokio::test]
    async fn test_standalone_pool_requires_node() {
        let config = TopologyConfig::builder("handle-test").build();
        let err = standalone_pool(&config).unwrap_err();
        assert!(matches!(
            err,
            CacheError::Config(ConfigError::MissingNodes(TopologyKind::Standalone))
        ));
    }

    #[tokio::test]
    async fn test_sentinel_pool_requires_master() {
        let err = sentinel_pool(&local(TopologyKind::Sentinel)).unwrap_err();
        assert!(matches!(err, CacheError::Config(ConfigError::MissingMasterName)));
    }

    fn sentinel(password: Option<&str>) -> TopologyConfig {
        let mut builder = TopologyConfig::builder("handle-test")
            .kind(TopologyKind::Sentinel)
            .nodes([NodeAddr::new("127.0.0.1", 1), NodeAddr::new("127.0.0.1", 2)])
            .master_name("mymaster");
        if let Some(password) = password {
            builder = builder.password(password);
        }
        builder.build()
    }

    #[tokio::test]
    async fn test_sentinel_pool_builds_without_io() {
        for password in [None, Some("s3cret")] {
            let pool = assert_ok!(sentinel_pool(&sentinel(password)));
            assert_eq!(pool.status().size, 0);
            assert!(!pool.is_closed());
        }
    }

    #[tokio::test]
    async fn test_factory_builds_warm_standalone_pool() {
        let store = FakeStore::start(|_| None).await;
        let handle = assert_ok!(RedisHandleFactory.build(&store.config("handle-test")).await);

        let PoolHandle::Standalone(pool) = &handle else {
            panic!("expected a standalone pool, got {handle:?}");
        };
        assert_eq!(pool.status().size, 1);
        assert!(store.count("PING") >= 1);
    }

    #[tokio::test]
    async fn test_factory_builds_cluster_connection_from_slot_map() {
        let store = FakeStore::start(|_| None).await;
        let config = TopologyConfig::builder("handle-test")
            .kind(TopologyKind::Cluster)
            .node(store.node())
            .build();

        let handle = assert_ok!(RedisHandleFactory.build(&config).await);

        assert_eq!(handle.kind(), TopologyKind::Cluster);
        assert!(!handle.is_closed());
        assert!(store.count("CLUSTER") >= 1);
        assert!(store.count("PING") >= 1);
    }

    #[tokio::test]
    async fn test_close_marks_pool_closed() {
        let handle = PoolHandle::Standalone(standalone_pool(&local(TopologyKind::Standalone)).unwrap());
        assert!(!handle.is_closed());
        handle.close();
        assert!(handle.is_closed());
        assert_eq!(handle.kind(), TopologyKind::Standalone);
    }

    #[tokio::test]
    async fn test_factory_fails_against_unreachable_node() {
        let result = RedisHandleFactory.build(&local(TopologyKind::Standalone)).await;
        assert!(result.is_err());
    }
}
