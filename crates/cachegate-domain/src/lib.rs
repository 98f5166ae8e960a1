//! # cachegate - Domain Model
//!
//! Configuration and key types shared by every layer of the cachegate
//! client: which topology to talk to, how to reach it, and how cache keys
//! are named and expire.
//!
//! Nothing in this crate performs I/O.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// TTL CONSTANTS
// =============================================================================

/// Default key lifetime: 30 minutes.
pub const DEFAULT_TTL: i64 = 60 * 30;

/// One day.
pub const ONE_DAY_TTL: i64 = DEFAULT_TTL * 2 * 24;

/// One week.
pub const ONE_WEEK_TTL: i64 = ONE_DAY_TTL * 7;

/// Thirty days.
pub const ONE_MONTH_TTL: i64 = ONE_DAY_TTL * 30;

/// 365 days.
pub const ONE_YEAR_TTL: i64 = ONE_DAY_TTL * 365;

/// Stand-in for "never expires". `EXPIRE`/`SETEX` reject non-positive
/// lifetimes, so permanent keys get ten years instead.
pub const NEVER_TTL: i64 = ONE_YEAR_TTL * 10;

/// Map a declared TTL onto one the store accepts on the refresh path.
#[must_use]
pub const fn normalize_ttl(ttl_secs: i64) -> i64 {
    if ttl_secs > 0 { ttl_secs } else { NEVER_TTL }
}

// =============================================================================
// KEY DESCRIPTORS
// =============================================================================

/// A family of cache keys sharing one prefix and one TTL policy.
///
/// Applications usually implement this on an enum listing every key family
/// they use, or declare [`KeyNamespace`] constants.
pub trait KeySpec {
    /// Prefix every key of this family starts with.
    fn prefix(&self) -> &str;

    /// Declared lifetime in seconds. Zero or negative means "never expire".
    fn ttl_secs(&self) -> i64;

    /// Human-readable purpose, used in logs.
    fn description(&self) -> &str;

    /// Build a concrete key below this family.
    fn key(&self, suffix: &str) -> CacheKey {
        CacheKey::new(self, suffix)
    }
}

/// Const-constructible [`KeySpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyNamespace {
    prefix: &'static str,
    ttl_secs: i64,
    description: &'static str,
}

impl KeyNamespace {
    #[must_use]
    pub const fn new(prefix: &'static str, ttl_secs: i64, description: &'static str) -> Self {
        Self {
            prefix,
            ttl_secs,
            description,
        }
    }
}

impl KeySpec for KeyNamespace {
    fn prefix(&self) -> &str {
        self.prefix
    }

    fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    fn description(&self) -> &str {
        self.description
    }
}

/// A fully resolved cache key: name plus the TTL of its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    name: String,
    ttl_secs: i64,
    description: String,
}

impl CacheKey {
    /// Resolve `suffix` under `spec`. An empty suffix yields the bare prefix.
    pub fn new<K: KeySpec + ?Sized>(spec: &K, suffix: &str) -> Self {
        Self {
            name: format!("{}{suffix}", spec.prefix()),
            ttl_secs: normalize_ttl(spec.ttl_secs()),
            description: spec.description().to_string(),
        }
    }

    /// Key consisting of the namespace prefix only.
    pub fn bare<K: KeySpec + ?Sized>(spec: &K) -> Self {
        Self::new(spec, "")
    }

    /// Derive `"<name>:<suffix>"`, keeping this key's TTL.
    #[must_use]
    pub fn child(&self, suffix: &str) -> Self {
        Self {
            name: format!("{}:{suffix}", self.name),
            ttl_secs: self.ttl_secs,
            description: self.description.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized lifetime in seconds, always positive.
    pub const fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A name and an application value, as accepted by multi-key writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue<V> {
    pub key: String,
    pub value: V,
}

impl<V> KeyValue<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

// =============================================================================
// TOPOLOGY
// =============================================================================

/// Deployment shape of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    #[default]
    Standalone,
    Sentinel,
    Cluster,
}

impl TopologyKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Sentinel => "sentinel",
            Self::Cluster => "cluster",
        }
    }

    /// Whether an execution scope pins one borrowed connection.
    ///
    /// Only the standalone pool is pinned. Sentinel connections are borrowed
    /// per call and the cluster connection is shared.
    pub const fn binds_per_scope(&self) -> bool {
        matches!(self, Self::Standalone)
    }

    /// Pool sizing used when the configuration does not supply one.
    pub const fn default_pool(&self) -> PoolSizing {
        match self {
            Self::Standalone => PoolSizing::new(16, 0),
            Self::Sentinel => PoolSizing::new(24, 0),
            Self::Cluster => PoolSizing::new(40, 8),
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopologyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standalone" | "single" => Ok(Self::Standalone),
            "sentinel" => Ok(Self::Sentinel),
            "cluster" => Ok(Self::Cluster),
            other => Err(ConfigError::UnknownTopology(other.to_string())),
        }
    }
}

/// Host/port pair of one store (or sentinel) node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
}

impl NodeAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `redis://host:port` form understood by the store client.
    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for NodeAddr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidNode(s.to_string()))?;
        if host.is_empty() {
            return Err(ConfigError::InvalidNode(s.to_string()));
        }
        let port = port
            .parse()
            .map_err(|_| ConfigError::InvalidNode(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

/// Borrow/return pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSizing {
    pub max_size: usize,
    pub min_idle: usize,
}

impl PoolSizing {
    pub const fn new(max_size: usize, min_idle: usize) -> Self {
        Self { max_size, min_idle }
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);
const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(1000);
const DEFAULT_MAX_REDIRECTIONS: u32 = 3;

/// Everything needed to reach one store deployment.
///
/// Handed to a connection provider once and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct TopologyConfig {
    /// Application identifier, the registry key
    pub app_id: String,

    /// Security token, informational only
    pub secret: Option<String>,

    /// Store nodes (sentinels for the sentinel topology)
    pub nodes: Vec<NodeAddr>,

    /// Sentinel master group name
    pub master_name: Option<String>,

    /// Store password
    pub password: Option<String>,

    pub connect_timeout: Duration,

    pub read_timeout: Duration,

    /// Longest a caller waits to borrow a pooled connection
    pub max_wait: Duration,

    /// Redirection budget (cluster only)
    pub max_redirections: u32,

    /// Explicit pool sizing; topology default otherwise
    pub pool: Option<PoolSizing>,

    pub kind: TopologyKind,
}

impl TopologyConfig {
    pub fn builder(app_id: impl Into<String>) -> TopologyConfigBuilder {
        TopologyConfigBuilder::new(app_id)
    }

    /// Load configuration from `CACHEGATE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`TopologyConfig::from_env`] with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let millis = |name: &str| -> Result<Option<Duration>, ConfigError> {
            lookup(name)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .map(Duration::from_millis)
                        .map_err(|_| ConfigError::InvalidValue {
                            name: name.to_string(),
                            value: v.clone(),
                        })
                })
                .transpose()
        };

        let mut builder = Self::builder(lookup("CACHEGATE_APP_ID").unwrap_or_default());

        if let Some(secret) = lookup("CACHEGATE_SECRET") {
            builder = builder.secret(secret);
        }
        if let Some(nodes) = lookup("CACHEGATE_NODES") {
            let nodes = nodes
                .split(',')
                .filter(|n| !n.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<NodeAddr>, _>>()?;
            builder = builder.nodes(nodes);
        }
        if let Some(kind) = lookup("CACHEGATE_TOPOLOGY") {
            builder = builder.kind(kind.parse()?);
        }
        if let Some(master) = lookup("CACHEGATE_MASTER_NAME") {
            builder = builder.master_name(master);
        }
        if let Some(password) = lookup("CACHEGATE_PASSWORD") {
            builder = builder.password(password);
        }
        if let Some(timeout) = millis("CACHEGATE_CONNECT_TIMEOUT_MS")? {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = millis("CACHEGATE_READ_TIMEOUT_MS")? {
            builder = builder.read_timeout(timeout);
        }
        if let Some(wait) = millis("CACHEGATE_MAX_WAIT_MS")? {
            builder = builder.max_wait(wait);
        }
        if let Some(hops) = lookup("CACHEGATE_MAX_REDIRECTIONS") {
            let parsed = hops.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "CACHEGATE_MAX_REDIRECTIONS".to_string(),
                value: hops.clone(),
            })?;
            builder = builder.max_redirections(parsed);
        }
        if let Some(size) = lookup("CACHEGATE_POOL_MAX_SIZE") {
            let max_size: usize = size.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "CACHEGATE_POOL_MAX_SIZE".to_string(),
                value: size.clone(),
            })?;
            let min_idle = builder.kind.default_pool().min_idle.min(max_size);
            builder = builder.pool(PoolSizing::new(max_size, min_idle));
        }

        Ok(builder.build())
    }

    /// Reject configurations that can never produce a working client.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::MissingAppId);
        }
        if self.nodes.is_empty() {
            return Err(ConfigError::MissingNodes(self.kind));
        }
        if self.kind == TopologyKind::Sentinel
            && self.master_name.as_deref().is_none_or(|m| m.trim().is_empty())
        {
            return Err(ConfigError::MissingMasterName);
        }
        if self.pool.is_some_and(|p| p.max_size == 0) {
            return Err(ConfigError::InvalidPool);
        }
        Ok(())
    }

    /// Explicit sizing, or the topology default.
    pub fn pool_sizing(&self) -> PoolSizing {
        self.pool.unwrap_or_else(|| self.kind.default_pool())
    }

    /// First configured node, the only one a standalone client uses.
    pub fn primary_node(&self) -> Option<&NodeAddr> {
        self.nodes.first()
    }

    /// Non-sensitive fields, for structured logs.
    pub fn summary(&self) -> HashMap<&'static str, String> {
        let nodes = self
            .nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        HashMap::from([
            ("app_id", self.app_id.clone()),
            ("kind", self.kind.to_string()),
            ("nodes", nodes),
            ("max_pool", self.pool_sizing().max_size.to_string()),
        ])
    }
}

impl fmt::Debug for TopologyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologyConfig")
            .field("app_id", &self.app_id)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("nodes", &self.nodes)
            .field("master_name", &self.master_name)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("max_wait", &self.max_wait)
            .field("max_redirections", &self.max_redirections)
            .field("pool", &self.pool)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Builder for [`TopologyConfig`]
#[derive(Debug, Clone)]
pub struct TopologyConfigBuilder {
    app_id: String,
    secret: Option<String>,
    nodes: Vec<NodeAddr>,
    master_name: Option<String>,
    password: Option<String>,
    connect_timeout: Duration,
    read_timeout: Duration,
    max_wait: Duration,
    max_redirections: u32,
    pool: Option<PoolSizing>,
    kind: TopologyKind,
}

impl TopologyConfigBuilder {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            secret: None,
            nodes: Vec::new(),
            master_name: None,
            password: None,
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            max_wait: DEFAULT_MAX_WAIT,
            max_redirections: DEFAULT_MAX_REDIRECTIONS,
            pool: None,
            kind: TopologyKind::default(),
        }
    }

    #[must_use]
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Append one node, ignoring duplicates.
    #[must_use]
    pub fn node(mut self, node: NodeAddr) -> Self {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
        self
    }

    /// Replace the node set.
    #[must_use]
    pub fn nodes(mut self, nodes: impl IntoIterator<Item = NodeAddr>) -> Self {
        self.nodes.clear();
        for node in nodes {
            self = self.node(node);
        }
        self
    }

    /// Blank passwords are ignored.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        if !password.trim().is_empty() {
            self.password = Some(password);
        }
        self
    }

    #[must_use]
    pub fn master_name(mut self, name: impl Into<String>) -> Self {
        self.master_name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn kind(mut self, kind: TopologyKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.connect_timeout = timeout;
        }
        self
    }

    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.read_timeout = timeout;
        }
        self
    }

    #[must_use]
    pub const fn max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    /// Zero keeps the default of three.
    #[must_use]
    pub const fn max_redirections(mut self, hops: u32) -> Self {
        if hops > 0 {
            self.max_redirections = hops;
        }
        self
    }

    #[must_use]
    pub const fn pool(mut self, pool: PoolSizing) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn build(self) -> TopologyConfig {
        TopologyConfig {
            app_id: self.app_id,
            secret: self.secret,
            nodes: self.nodes,
            master_name: self.master_name,
            password: self.password,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            max_wait: self.max_wait,
            max_redirections: self.max_redirections,
            pool: self.pool,
            kind: self.kind,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Configuration problems, fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("application id must not be empty")]
    MissingAppId,

    #[error("no nodes configured for {0} topology")]
    MissingNodes(TopologyKind),

    #[error("sentinel topology requires a master name")]
    MissingMasterName,

    #[error("pool max size must be greater than zero")]
    InvalidPool,

    #[error("invalid node address '{0}', expected host:port")]
    InvalidNode(String),

    #[error("unknown topology '{0}'")]
    UnknownTopology(String),

    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::{Fake, Faker};

    const USER: KeyNamespace = KeyNamespace::new("user:", 1800, "user profile");
    const FOREVER: KeyNamespace = KeyNamespace::new("flags:", 0, "feature flags");

    #[test]
    fn test_key_resolution() {
        let key = USER.key("42");
        assert_eq!(key.name(), "user:42");
        assert_eq!(key.ttl_secs(), 1800);
        assert_eq!(key.description(), "user profile");
    }

    #[test]
    fn test_non_positive_ttl_means_never() {
        assert_eq!(FOREVER.key("dark-mode").ttl_secs(), NEVER_TTL);
        assert_eq!(normalize_ttl(-1), NEVER_TTL);
        assert_eq!(normalize_ttl(5), 5);
    }

    #[test]
    fn test_namespace_keeps_ttl_for_any_suffix() {
        for _ in 0..16 {
            let suffix: String = Faker.fake();
            let key = USER.key(&suffix);
            assert!(key.name().starts_with("user:"));
            assert_eq!(key.ttl_secs(), USER.ttl_secs());
            assert_eq!(key.child("x").ttl_secs(), USER.ttl_secs());
        }
    }

    #[test]
    fn test_child_key() {
        let key = USER.key("42").child("orders");
        assert_eq!(key.name(), "user:42:orders");
    }

    #[test]
    fn test_default_pool_ordering() {
        let standalone = TopologyKind::Standalone.default_pool().max_size;
        let sentinel = TopologyKind::Sentinel.default_pool().max_size;
        let cluster = TopologyKind::Cluster.default_pool().max_size;
        assert!(cluster > sentinel);
        assert!(sentinel > standalone);
    }

    #[test]
    fn test_node_parsing() {
        let node: NodeAddr = "10.0.0.7:6380".parse().unwrap();
        assert_eq!(node, NodeAddr::new("10.0.0.7", 6380));
        assert_eq!(node.url(), "redis://10.0.0.7:6380");
        assert!("no-port".parse::<NodeAddr>().is_err());
        assert!(":6379".parse::<NodeAddr>().is_err());
        assert!("host:notaport".parse::<NodeAddr>().is_err());
    }

    #[test]
    fn test_builder_defaults_and_filters() {
        let config = TopologyConfig::builder("app1")
            .node(NodeAddr::new("127.0.0.1", 6379))
            .node(NodeAddr::new("127.0.0.1", 6379))
            .password("   ")
            .max_redirections(0)
            .build();

        assert_eq!(config.nodes.len(), 1);
        assert!(config.password.is_none());
        assert_eq!(config.max_redirections, 3);
        assert_eq!(config.kind, TopologyKind::Standalone);
        assert_eq!(config.read_timeout, Duration::from_millis(2000));
        assert_eq!(config.pool_sizing(), TopologyKind::Standalone.default_pool());
    }

    #[test]
    fn test_validation() {
        let missing_app = TopologyConfig::builder(" ")
            .node(NodeAddr::new("h", 1))
            .build();
        assert_eq!(missing_app.validate(), Err(ConfigError::MissingAppId));

        let missing_nodes = TopologyConfig::builder("app").build();
        assert_eq!(
            missing_nodes.validate(),
            Err(ConfigError::MissingNodes(TopologyKind::Standalone))
        );

        let sentinel = TopologyConfig::builder("app")
            .kind(TopologyKind::Sentinel)
            .node(NodeAddr::new("h", 26379))
            .build();
        assert_eq!(sentinel.validate(), Err(ConfigError::MissingMasterName));

        let zero_pool = TopologyConfig::builder("app")
            .node(NodeAddr::new("h", 1))
            .pool(PoolSizing::new(0, 0))
            .build();
        assert_eq!(zero_pool.validate(), Err(ConfigError::InvalidPool));
    }

    #[test]
    fn test_summary_omits_credentials() {
        let config = TopologyConfig::builder("app1")
            .nodes([NodeAddr::new("10.0.0.1", 7000), NodeAddr::new("10.0.0.2", 7000)])
            .kind(TopologyKind::Cluster)
            .password("s3cret")
            .secret("token")
            .build();

        let summary = config.summary();
        assert_eq!(summary["app_id"], "app1");
        assert_eq!(summary["kind"], "cluster");
        assert_eq!(summary["nodes"], "10.0.0.1:7000,10.0.0.2:7000");
        assert!(summary.values().all(|v| !v.contains("s3cret") && !v.contains("token")));
    }

    #[test]
    fn test_from_lookup() {
        let vars = HashMap::from([
            ("CACHEGATE_APP_ID", "billing"),
            ("CACHEGATE_NODES", "n1:7000, n2:7001,"),
            ("CACHEGATE_TOPOLOGY", "Cluster"),
            ("CACHEGATE_READ_TIMEOUT_MS", "750"),
            ("CACHEGATE_POOL_MAX_SIZE", "64"),
            ("CACHEGATE_PASSWORD", "hunter2"),
        ]);
        let config =
            TopologyConfig::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();

        assert_eq!(config.app_id, "billing");
        assert_eq!(config.kind, TopologyKind::Cluster);
        assert_eq!(config.nodes, vec![NodeAddr::new("n1", 7000), NodeAddr::new("n2", 7001)]);
        assert_eq!(config.read_timeout, Duration::from_millis(750));
        assert_eq!(config.pool_sizing(), PoolSizing::new(64, 8));
        assert!(config.validate().is_ok());
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = TopologyConfig::from_lookup(|k| {
            (k == "CACHEGATE_MAX_WAIT_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = TopologyConfig::from_lookup(|k| {
            (k == "CACHEGATE_TOPOLOGY").then(|| "mesh".to_string())
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownTopology("mesh".to_string()));
    }
}
