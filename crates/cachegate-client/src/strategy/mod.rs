//! # Strategy Module
//!
//! Enum-based TTL refresh policies using the dispatch pattern.
//!
//! ## Available Policies
//!
//! - `OnChange` - Re-arm expiry after a write that added or changed something (default)
//! - `OnHit` - Re-arm expiry after a read that found something
//! - `Always` - Re-arm expiry after every successful call
//! - `Never` - Leave expiry alone
//!
//! ## Example
//!
//! ```rust
//! use cachegate_client::strategy::TtlRefresh;
//!
//! let added: i64 = 1;
//! assert!(TtlRefresh::OnChange.applies(&added));
//! assert!(!TtlRefresh::OnHit.applies(&None::<String>));
//! ```

pub mod ttl_refresh;

pub use ttl_refresh::{Touched, TtlRefresh};
