//! Set commands.

use cachegate_domain::CacheKey;
use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};

use super::redis_client::CacheClient;
use crate::codec::Serializer;
use crate::strategy::TtlRefresh;

impl<S: Serializer> CacheClient<S> {
    /// Add members. Returns how many were new.
    pub async fn sadd<V: Serialize>(&self, key: &CacheKey, members: &[V]) -> i64 {
        if members.is_empty() {
            return 0;
        }
        self.guarded("sadd", key.name(), async {
            let members = self.encode_each(members)?;
            let mut conn = self.lease().await?;
            let added: i64 = conn.sadd(self.key_bytes(key), members).await?;
            self.refresh(&mut conn, key, TtlRefresh::OnChange, &added)
                .await;
            Ok(added)
        })
        .await
    }

    /// Remove members. Returns how many were present.
    pub async fn srem<V: Serialize>(&self, key: &CacheKey, members: &[V]) -> i64 {
        if members.is_empty() {
            return 0;
        }
        self.guarded("srem", key.name(), async {
            let members = self.encode_each(members)?;
            let mut conn = self.lease().await?;
            let removed: i64 = conn.srem(self.key_bytes(key), members).await?;
            Ok(removed)
        })
        .await
    }

    pub async fn spop<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.guarded("spop", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Option<Vec<u8>> = conn.spop(self.key_bytes(key)).await?;
            self.decode_opt(raw)
        })
        .await
    }

    pub async fn smembers<T: DeserializeOwned>(&self, key: &CacheKey) -> Vec<T> {
        self.guarded("smembers", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Vec<Vec<u8>> = conn.smembers(self.key_bytes(key)).await?;
            self.decode_all(&raw)
        })
        .await
    }

    pub async fn sismember<V: Serialize + ?Sized>(&self, key: &CacheKey, member: &V) -> bool {
        self.guarded("sismember", key.name(), async {
            let member = self.encode(member)?;
            let mut conn = self.lease().await?;
            let found: bool = conn.sismember(self.key_bytes(key), member).await?;
            Ok(found)
        })
        .await
    }

    pub async fn scard(&self, key: &CacheKey) -> i64 {
        self.guarded("scard", key.name(), async {
            let mut conn = self.lease().await?;
            let len: i64 = conn.scard(self.key_bytes(key)).await?;
            Ok(len)
        })
        .await
    }

    // =========================================================================
    // SET ALGEBRA
    // =========================================================================

    /// Members present in every set. On a cluster the keys must share a
    /// hash slot.
    pub async fn sinter<T: DeserializeOwned>(&self, keys: &[CacheKey]) -> Vec<T> {
        self.combine("sinter", "SINTER", keys).await
    }

    pub async fn sunion<T: DeserializeOwned>(&self, keys: &[CacheKey]) -> Vec<T> {
        self.combine("sunion", "SUNION", keys).await
    }

    /// Members of the first set absent from all the others.
    pub async fn sdiff<T: DeserializeOwned>(&self, keys: &[CacheKey]) -> Vec<T> {
        self.combine("sdiff", "SDIFF", keys).await
    }

    async fn combine<T: DeserializeOwned>(
        &self,
        op: &'static str,
        command: &'static str,
        keys: &[CacheKey],
    ) -> Vec<T> {
        let Some(first) = keys.first() else {
            return Vec::new();
        };
        self.guarded(op, first.name(), async {
            let names = keys.iter().map(|k| self.key_bytes(k)).collect::<Vec<_>>();
            let mut conn = self.lease().await?;
            let raw: Vec<Vec<u8>> = redis::cmd(command)
                .arg(&names)
                .query_async(&mut conn)
                .await?;
            self.decode_all(&raw)
        })
        .await
    }

    // =========================================================================
    // SAMPLING
    // =========================================================================

    pub async fn srandmember<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.guarded("srandmember", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Option<Vec<u8>> = conn.srandmember(self.key_bytes(key)).await?;
            self.decode_opt(raw)
        })
        .await
    }

    /// Up to `count` distinct random members.
    pub async fn srandmember_count<T: DeserializeOwned>(&self, key: &CacheKey, count: usize) -> Vec<T> {
        if count == 0 {
            return Vec::new();
        }
        self.guarded("srandmember", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Vec<Vec<u8>> = conn
                .srandmember_multiple(self.key_bytes(key), count)
                .await?;
            self.decode_all(&raw)
        })
        .await
    }
}
