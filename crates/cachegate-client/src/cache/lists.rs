//! List commands.

use std::time::Duration;

use cachegate_domain::CacheKey;
use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};

use super::redis_client::CacheClient;
use crate::codec::Serializer;
use crate::strategy::TtlRefresh;

impl<S: Serializer> CacheClient<S> {
    // =========================================================================
    // PUSH / POP
    // =========================================================================

    /// Prepend values. Returns the list length afterwards.
    pub async fn lpush<V: Serialize>(&self, key: &CacheKey, values: &[V]) -> i64 {
        self.push("lpush", "LPUSH", key, values).await
    }

    /// Append values. Returns the list length afterwards.
    pub async fn rpush<V: Serialize>(&self, key: &CacheKey, values: &[V]) -> i64 {
        self.push("rpush", "RPUSH", key, values).await
    }

    async fn push<V: Serialize>(
        &self,
        op: &'static str,
        command: &'static str,
        key: &CacheKey,
        values: &[V],
    ) -> i64 {
        if values.is_empty() {
            return 0;
        }
        self.guarded(op, key.name(), async {
            let payloads = self.encode_each(values)?;
            let mut conn = self.lease().await?;
            let len: i64 = redis::cmd(command)
                .arg(self.key_bytes(key))
                .arg(&payloads)
                .query_async(&mut conn)
                .await?;
            self.refresh(&mut conn, key, TtlRefresh::OnChange, &len)
                .await;
            Ok(len)
        })
        .await
    }

    pub async fn lpop<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.pop("lpop", "LPOP", key).await
    }

    pub async fn rpop<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.pop("rpop", "RPOP", key).await
    }

    async fn pop<T: DeserializeOwned>(
        &self,
        op: &'static str,
        command: &'static str,
        key: &CacheKey,
    ) -> Option<T> {
        self.guarded(op, key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Option<Vec<u8>> = redis::cmd(command)
                .arg(self.key_bytes(key))
                .query_async(&mut conn)
                .await?;
            self.decode_opt(raw)
        })
        .await
    }

    /// Pop from the head of the first non-empty list, waiting up to
    /// `timeout` (zero waits forever). Returns the source key name and the
    /// value.
    pub async fn blpop<T: DeserializeOwned>(&self, timeout: Duration, names: &[&str]) -> Option<(String, T)> {
        self.blocking_pop("blpop", "BLPOP", timeout, names).await
    }

    /// Tail-side counterpart of [`CacheClient::blpop`].
    pub async fn brpop<T: DeserializeOwned>(&self, timeout: Duration, names: &[&str]) -> Option<(String, T)> {
        self.blocking_pop("brpop", "BRPOP", timeout, names).await
    }

    async fn blocking_pop<T: DeserializeOwned>(
        &self,
        op: &'static str,
        command: &'static str,
        timeout: Duration,
        names: &[&str],
    ) -> Option<(String, T)> {
        if names.is_empty() {
            return None;
        }
        let limit = if timeout.is_zero() {
            Duration::MAX
        } else {
            self.config().read_timeout.saturating_add(timeout)
        };

        self.guarded_within(op, names[0], limit, async {
            let keys = names.iter().map(|n| self.raw_key(n)).collect::<Vec<_>>();
            let mut conn = self.lease().await?;
            let popped: Option<(Vec<u8>, Vec<u8>)> = redis::cmd(command)
                .arg(&keys)
                .arg(timeout.as_secs_f64())
                .query_async(&mut conn)
                .await?;
            let Some((source, raw)) = popped else {
                return Ok(None);
            };
            let source = self.decode_key(&source)?;
            Ok(self.decode_opt(Some(raw))?.map(|value| (source, value)))
        })
        .await
    }

    /// Move the tail of `source` to the head of `destination`, returning the
    /// moved value. The destination's TTL is re-armed when something moved.
    pub async fn rpoplpush<T: DeserializeOwned>(&self, source: &CacheKey, destination: &CacheKey) -> Option<T> {
        self.guarded("rpoplpush", source.name(), async {
            let mut conn = self.lease().await?;
            let moved: Option<Vec<u8>> = conn
                .rpoplpush(self.key_bytes(source), self.key_bytes(destination))
                .await?;
            self.refresh(&mut conn, destination, TtlRefresh::OnChange, &moved)
                .await;
            self.decode_opt(moved)
        })
        .await
    }

    // =========================================================================
    // INDEXED ACCESS
    // =========================================================================

    /// Elements between `start` and `stop` inclusive; negative indices count
    /// from the tail.
    pub async fn lrange<T: DeserializeOwned>(&self, key: &CacheKey, start: isize, stop: isize) -> Vec<T> {
        self.guarded("lrange", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Vec<Vec<u8>> = conn.lrange(self.key_bytes(key), start, stop).await?;
            self.refresh(&mut conn, key, TtlRefresh::OnHit, &raw).await;
            self.decode_all(&raw)
        })
        .await
    }

    pub async fn lindex<T: DeserializeOwned>(&self, key: &CacheKey, index: isize) -> Option<T> {
        self.guarded("lindex", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Option<Vec<u8>> = conn.lindex(self.key_bytes(key), index).await?;
            self.refresh(&mut conn, key, TtlRefresh::OnHit, &raw).await;
            self.decode_opt(raw)
        })
        .await
    }

    pub async fn lset<V: Serialize + ?Sized>(&self, key: &CacheKey, index: isize, value: &V) -> bool {
        self.guarded("lset", key.name(), async {
            let payload = self.encode(value)?;
            let mut conn = self.lease().await?;
            let _: () = conn.lset(self.key_bytes(key), index, payload).await?;
            self.refresh(&mut conn, key, TtlRefresh::Always, &true)
                .await;
            Ok(true)
        })
        .await
    }

    /// Remove up to `count` occurrences of `value` (all when zero, from the
    /// tail when negative). Returns how many were removed.
    pub async fn lrem<V: Serialize + ?Sized>(&self, key: &CacheKey, count: isize, value: &V) -> i64 {
        self.guarded("lrem", key.name(), async {
            let payload = self.encode(value)?;
            let mut conn = self.lease().await?;
            let removed: i64 = conn.lrem(self.key_bytes(key), count, payload).await?;
            Ok(removed)
        })
        .await
    }

    /// Keep only the elements between `start` and `stop` inclusive.
    pub async fn ltrim(&self, key: &CacheKey, start: isize, stop: isize) -> bool {
        self.guarded("ltrim", key.name(), async {
            let mut conn = self.lease().await?;
            let _: () = conn.ltrim(self.key_bytes(key), start, stop).await?;
            Ok(true)
        })
        .await
    }

    pub async fn llen(&self, key: &CacheKey) -> i64 {
        self.guarded("llen", key.name(), async {
            let mut conn = self.lease().await?;
            let len: i64 = conn.llen(self.key_bytes(key)).await?;
            Ok(len)
        })
        .await
    }
}
