//! # Client Registry
//!
//! Clients keyed by application id. The first client ever registered is the
//! default.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use cachegate_domain::{TopologyConfig, TopologyKind};
use parking_lot::RwLock;
use tracing::info;

use crate::cache::CacheClient;
use crate::codec::{JsonSerializer, Serializer};
use crate::error::Result;

/// Shared registry handle.
pub type SharedRegistry<S = JsonSerializer> = Arc<ClientRegistry<S>>;

pub struct ClientRegistry<S: Serializer = JsonSerializer> {
    clients: RwLock<HashMap<String, CacheClient<S>>>,
    default_app: OnceLock<String>,
}

impl<S: Serializer> Default for ClientRegistry<S> {
    fn default() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            default_app: OnceLock::new(),
        }
    }
}

impl<S: Serializer> ClientRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry<S> {
        Arc::new(Self::new())
    }

    /// Validate `config`, create its client and register it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn start(&self, config: TopologyConfig, serializer: S) -> Result<CacheClient<S>> {
        let client = CacheClient::with_serializer(config, serializer)?;
        info!(
            app_id = %client.app_id(),
            summary = ?client.config().summary(),
            "Cache client started"
        );
        self.register(client.clone());
        Ok(client)
    }

    /// Register under the client's app id. A later registration for the same
    /// id replaces the earlier one, which is returned.
    pub fn register(&self, client: CacheClient<S>) -> Option<CacheClient<S>> {
        let app_id = client.app_id().to_string();
        self.default_app.get_or_init(|| app_id.clone());
        self.clients.write().insert(app_id, client)
    }

    pub fn get(&self, app_id: &str) -> Option<CacheClient<S>> {
        self.clients.read().get(app_id).cloned()
    }

    /// Client of the first registered app id, if still registered.
    pub fn default_client(&self) -> Option<CacheClient<S>> {
        self.get(self.default_app.get()?)
    }

    pub fn default_app_id(&self) -> Option<&str> {
        self.default_app.get().map(String::as_str)
    }

    pub fn kind(&self, app_id: &str) -> Option<TopologyKind> {
        self.clients.read().get(app_id).map(CacheClient::kind)
    }

    /// Unregister and shut down the client for `app_id`.
    pub fn remove(&self, app_id: &str) -> Option<CacheClient<S>> {
        let removed = self.clients.write().remove(app_id)?;
        removed.shutdown();
        info!(app_id, "Cache client removed");
        Some(removed)
    }

    pub fn app_ids(&self) -> Vec<String> {
        let mut ids = self.clients.read().keys().cloned().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

impl<S: Serializer> std::fmt::Debug for ClientRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("app_ids", &self.app_ids())
            .field("default", &self.default_app_id())
            .finish()
    }
}
