//! # cachegate Client Library
//!
//! One Redis client API over three deployment shapes: a single node, a
//! sentinel-managed master, or a sharded cluster.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application Layer                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ClientRegistry                           │
//! │             (app id → CacheClient, default)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CacheClient                             │
//! │    (command catalogue, TTL refresh, error boundary)          │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                   │
//!            ▼                                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │    ExecutionScope       │   │     ConnectionProvider        │
//! │ (pinned connection)     │──▶│ (lazy single-flight handle)   │
//! └─────────────────────────┘   └──────────────────────────────┘
//!                                   │          │          │
//!                                   ▼          ▼          ▼
//!                              Standalone   Sentinel    Cluster
//!                                 pool        pool    connection
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cachegate_client::{ClientRegistry, JsonSerializer};
//! use cachegate_domain::{KeyNamespace, KeySpec, TopologyConfig};
//!
//! const USER: KeyNamespace = KeyNamespace::new("user:", 1800, "user profile");
//!
//! let registry = ClientRegistry::new();
//! let cache = registry.start(TopologyConfig::from_env()?, JsonSerializer)?;
//!
//! let key = USER.key("42");
//! cache.hset(&key, "name", "Ada").await;
//! let name: Option<String> = cache.hget(&key, "name").await;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod codec;
pub mod error;
pub mod registry;
pub mod scope;
pub mod strategy;
pub mod topology;

#[cfg(test)]
pub(crate) mod fake_store;

// Re-export commonly used types
pub use cache::{CacheClient, PubSubMessage, Subscription};
pub use codec::{BincodeSerializer, JsonSerializer, Serializer};
pub use error::{CacheError, Result};
pub use registry::{ClientRegistry, SharedRegistry};
pub use scope::{Binding, ExecutionScope};
pub use strategy::{Touched, TtlRefresh};
pub use topology::{
    Backoff, ConnectionProvider, HandleFactory, PoolHandle, RedisHandleFactory,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
