//! # Cache Module
//!
//! Command façade over whichever topology the client was configured for.

pub mod hashes;
mod lease;
pub mod lists;
pub mod pubsub;
pub mod redis_client;
pub mod server;
pub mod sets;
pub mod sorted_sets;
pub mod strings;

pub use pubsub::{PubSubMessage, SUBSCRIBE_CONFIRM_TIMEOUT, Subscription};
pub use redis_client::CacheClient;
