//! # Topology Module
//!
//! Turns a [`TopologyConfig`](cachegate_domain::TopologyConfig) into a live
//! connection handle.
//!
//! - [`PoolHandle`] - pooled connections (standalone, sentinel) or the shared
//!   cluster connection
//! - [`HandleFactory`] - how a handle is built; [`RedisHandleFactory`] in
//!   production
//! - [`ConnectionProvider`] - lazy single-flight initialization with
//!   jittered retry

pub mod handle;
pub mod provider;
pub mod slot;

pub use handle::{HandleFactory, PoolHandle, RedisHandleFactory, subscriber_client};
pub use provider::{Backoff, ConnectionProvider};
pub use slot::key_slot;
