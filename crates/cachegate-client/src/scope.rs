//! # Execution Scopes
//!
//! Pins one pooled connection to a unit of work so consecutive commands
//! share it. Only the standalone topology pins; sentinel commands borrow per
//! call and the cluster connection is already shared, so binding there does
//! nothing.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::CacheClient;
use crate::codec::{JsonSerializer, Serializer};
use crate::error::{CacheError, Result};
use crate::topology::PoolHandle;

/// Slot holding at most one borrowed resource.
#[derive(Debug)]
pub struct Binding<C> {
    slot: Mutex<Option<C>>,
}

impl<C> Default for Binding<C> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<C: Send> Binding<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the slot with `borrow()` unless it is already filled.
    ///
    /// Returns `Ok(true)` when a resource was borrowed, `Ok(false)` when one
    /// was already bound. On error the slot is left empty.
    ///
    /// # Errors
    ///
    /// Returns whatever `borrow` failed with.
    pub async fn bind_with<F, Fut, E>(&self, borrow: F) -> std::result::Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<C, E>>,
    {
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            return Ok(false);
        }
        match borrow().await {
            Ok(resource) => {
                *slot = Some(resource);
                Ok(true)
            }
            Err(err) => {
                *slot = None;
                Err(err)
            }
        }
    }

    /// Drop the bound resource. Returns whether one was bound.
    pub async fn unbind(&self) -> bool {
        self.slot.lock().await.take().is_some()
    }

    pub async fn is_bound(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Lock the slot if it holds a resource.
    pub(crate) async fn lease(&self) -> Option<MutexGuard<'_, Option<C>>> {
        let guard = self.slot.lock().await;
        guard.is_some().then_some(guard)
    }

    /// Synchronous release for `Drop`. `None` if the slot is busy.
    fn try_release(&self) -> Option<bool> {
        self.slot
            .try_lock()
            .ok()
            .map(|mut slot| slot.take().is_some())
    }
}

/// One unit of work against a [`CacheClient`].
///
/// Commands issued through [`ExecutionScope::client`] use the bound
/// connection once [`ExecutionScope::bind`] succeeded. Dropping the scope
/// releases the connection.
pub struct ExecutionScope<S: Serializer = JsonSerializer> {
    id: Uuid,
    client: CacheClient<S>,
    binding: Arc<Binding<deadpool_redis::Connection>>,
}

impl<S: Serializer> ExecutionScope<S> {
    pub(crate) fn new(parent: &CacheClient<S>) -> Self {
        let binding = Arc::new(Binding::new());
        Self {
            id: Uuid::new_v4(),
            client: parent.scoped(Arc::clone(&binding)),
            binding,
        }
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Client routing through this scope.
    pub const fn client(&self) -> &CacheClient<S> {
        &self.client
    }

    /// Borrow a connection for this scope. Idempotent.
    ///
    /// Only standalone clients bind; for the other topologies this returns
    /// `Ok(false)` without touching the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection could be borrowed. The scope is
    /// left unbound.
    pub async fn bind(&self) -> Result<bool> {
        if !self.client.kind().binds_per_scope() {
            return Ok(false);
        }

        let bound: Result<bool> = self
            .binding
            .bind_with(|| async {
                let handle = self
                    .client
                    .provider()
                    .acquire()
                    .await
                    .ok_or_else(|| CacheError::Unavailable(self.client.app_id().to_string()))?;
                match handle.as_ref() {
                    PoolHandle::Standalone(pool) => Ok(pool.get().await?),
                    other => Err(CacheError::Unsupported {
                        topology: other.kind().as_str(),
                        operation: "bind",
                    }),
                }
            })
            .await;

        match &bound {
            Ok(true) => debug!(scope = %self.id, app_id = %self.client.app_id(), "Connection bound"),
            Ok(false) => {}
            Err(err) => warn!(scope = %self.id, app_id = %self.client.app_id(), error = %err, "Bind failed"),
        }
        bound
    }

    /// Return the bound connection to its pool. Idempotent and infallible.
    pub async fn unbind(&self) -> bool {
        let released = self.binding.unbind().await;
        if released {
            debug!(scope = %self.id, app_id = %self.client.app_id(), "Connection released");
        }
        released
    }

    pub async fn is_bound(&self) -> bool {
        self.binding.is_bound().await
    }
}

impl<S: Serializer> Drop for ExecutionScope<S> {
    fn drop(&mut self) {
        match self.binding.try_release() {
            Some(true) => debug!(scope = %self.id, "Connection released on drop"),
            Some(false) => {}
            None => warn!(
                scope = %self.id,
                "Scope dropped while its connection was in use; it returns to the pool when the command ends"
            ),
        }
    }
}

impl<S: Serializer> std::fmt::Debug for ExecutionScope<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionScope")
            .field("id", &self.id)
            .field("app_id", &self.client.app_id())
            .finish_non_exhaustive()
    }
}
