//! One connection borrowed for the duration of a command.

use deadpool_redis::Connection;
use redis::aio::ConnectionLike;
use redis::cluster_async::ClusterConnection;
use redis::{Cmd, ErrorKind, Pipeline, RedisError, RedisFuture, Value};
use tokio::sync::MutexGuard;

/// A connection from whichever source applies to the current call: the
/// scope's bound connection, a pool, or the shared cluster connection.
///
/// Implements [`ConnectionLike`] so every command is written once against
/// `redis::AsyncCommands` for all topologies.
pub(crate) enum Lease<'a> {
    Bound(MutexGuard<'a, Option<Connection>>),
    Pooled(Connection),
    Sentinel(deadpool_redis::sentinel::Connection),
    Shared(ClusterConnection),
}

impl Lease<'_> {
    pub(crate) const fn source(&self) -> &'static str {
        match self {
            Self::Bound(_) => "bound",
            Self::Pooled(_) => "pool",
            Self::Sentinel(_) => "sentinel",
            Self::Shared(_) => "cluster",
        }
    }

    pub(crate) const fn cluster(&mut self) -> Option<&mut ClusterConnection> {
        match self {
            Self::Shared(conn) => Some(conn),
            _ => None,
        }
    }
}

fn released<'a, T: Send + 'a>() -> RedisFuture<'a, T> {
    Box::pin(async {
        Err(RedisError::from((
            ErrorKind::ClientError,
            "scope binding was released",
        )))
    })
}

impl ConnectionLike for Lease<'_> {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match self {
            Self::Bound(slot) => match slot.as_mut() {
                Some(conn) => conn.req_packed_command(cmd),
                None => released(),
            },
            Self::Pooled(conn) => conn.req_packed_command(cmd),
            Self::Sentinel(conn) => conn.req_packed_command(cmd),
            Self::Shared(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match self {
            Self::Bound(slot) => match slot.as_mut() {
                Some(conn) => conn.req_packed_commands(cmd, offset, count),
                None => released(),
            },
            Self::Pooled(conn) => conn.req_packed_commands(cmd, offset, count),
            Self::Sentinel(conn) => conn.req_packed_commands(cmd, offset, count),
            Self::Shared(conn) => conn.req_packed_commands(cmd, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            Self::Bound(slot) => slot.as_ref().map_or(0, ConnectionLike::get_db),
            Self::Pooled(conn) => conn.get_db(),
            Self::Sentinel(conn) => conn.get_db(),
            Self::Shared(conn) => conn.get_db(),
        }
    }
}
