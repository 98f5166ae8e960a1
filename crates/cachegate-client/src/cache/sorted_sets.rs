//! Sorted set commands.

use cachegate_domain::CacheKey;
use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};

use super::redis_client::CacheClient;
use crate::codec::Serializer;
use crate::error::Result;
use crate::strategy::TtlRefresh;

impl<S: Serializer> CacheClient<S> {
    // =========================================================================
    // WRITES
    // =========================================================================

    /// Add or rescore one member. Returns 1 if the member is new.
    pub async fn zadd<V: Serialize + ?Sized>(&self, key: &CacheKey, score: f64, member: &V) -> i64 {
        self.guarded("zadd", key.name(), async {
            let member = self.encode(member)?;
            let mut conn = self.lease().await?;
            let added: i64 = conn.zadd(self.key_bytes(key), member, score).await?;
            self.refresh(&mut conn, key, TtlRefresh::OnChange, &added)
                .await;
            Ok(added)
        })
        .await
    }

    /// Add or rescore several `(score, member)` pairs. Returns how many
    /// members were new.
    pub async fn zadd_multiple<V: Serialize>(&self, key: &CacheKey, members: &[(f64, V)]) -> i64 {
        if members.is_empty() {
            return 0;
        }
        self.guarded("zadd", key.name(), async {
            let items = members
                .iter()
                .map(|(score, member)| Ok((*score, self.encode(member)?)))
                .collect::<Result<Vec<_>>>()?;
            let mut conn = self.lease().await?;
            let added: i64 = conn.zadd_multiple(self.key_bytes(key), &items).await?;
            self.refresh(&mut conn, key, TtlRefresh::OnChange, &added)
                .await;
            Ok(added)
        })
        .await
    }

    pub async fn zrem<V: Serialize>(&self, key: &CacheKey, members: &[V]) -> i64 {
        if members.is_empty() {
            return 0;
        }
        self.guarded("zrem", key.name(), async {
            let members = self.encode_each(members)?;
            let mut conn = self.lease().await?;
            let removed: i64 = conn.zrem(self.key_bytes(key), members).await?;
            Ok(removed)
        })
        .await
    }

    /// Add `delta` to a member's score, returning the new score.
    pub async fn zincr_by<V: Serialize + ?Sized>(&self, key: &CacheKey, delta: f64, member: &V) -> f64 {
        self.guarded("zincrby", key.name(), async {
            let member = self.encode(member)?;
            let mut conn = self.lease().await?;
            let score: f64 = conn.zincr(self.key_bytes(key), member, delta).await?;
            self.refresh(&mut conn, key, TtlRefresh::Always, &true)
                .await;
            Ok(score)
        })
        .await
    }

    // =========================================================================
    // RANGES
    // =========================================================================

    /// Members by ascending rank between `start` and `stop` inclusive.
    pub async fn zrange<T: DeserializeOwned>(&self, key: &CacheKey, start: isize, stop: isize) -> Vec<T> {
        self.guarded("zrange", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Vec<Vec<u8>> = conn.zrange(self.key_bytes(key), start, stop).await?;
            self.decode_all(&raw)
        })
        .await
    }

    /// Members by descending rank between `start` and `stop` inclusive.
    pub async fn zrevrange<T: DeserializeOwned>(&self, key: &CacheKey, start: isize, stop: isize) -> Vec<T> {
        self.guarded("zrevrange", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Vec<Vec<u8>> = conn.zrevrange(self.key_bytes(key), start, stop).await?;
            self.decode_all(&raw)
        })
        .await
    }

    /// Members with `min <= score <= max`, lowest score first.
    pub async fn zrange_by_score<T: DeserializeOwned>(&self, key: &CacheKey, min: f64, max: f64) -> Vec<T> {
        self.guarded("zrangebyscore", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Vec<Vec<u8>> = conn.zrangebyscore(self.key_bytes(key), min, max).await?;
            self.decode_all(&raw)
        })
        .await
    }

    pub async fn zcount(&self, key: &CacheKey, min: f64, max: f64) -> i64 {
        self.guarded("zcount", key.name(), async {
            let mut conn = self.lease().await?;
            let count: i64 = conn.zcount(self.key_bytes(key), min, max).await?;
            Ok(count)
        })
        .await
    }

    pub async fn zcard(&self, key: &CacheKey) -> i64 {
        self.guarded("zcard", key.name(), async {
            let mut conn = self.lease().await?;
            let len: i64 = conn.zcard(self.key_bytes(key)).await?;
            Ok(len)
        })
        .await
    }

    // =========================================================================
    // MEMBER LOOKUP
    // =========================================================================

    /// Zero-based ascending rank.
    pub async fn zrank<V: Serialize + ?Sized>(&self, key: &CacheKey, member: &V) -> Option<i64> {
        self.guarded("zrank", key.name(), async {
            let member = self.encode(member)?;
            let mut conn = self.lease().await?;
            let rank: Option<i64> = conn.zrank(self.key_bytes(key), member).await?;
            Ok(rank)
        })
        .await
    }

    /// Zero-based descending rank.
    pub async fn zrevrank<V: Serialize + ?Sized>(&self, key: &CacheKey, member: &V) -> Option<i64> {
        self.guarded("zrevrank", key.name(), async {
            let member = self.encode(member)?;
            let mut conn = self.lease().await?;
            let rank: Option<i64> = conn.zrevrank(self.key_bytes(key), member).await?;
            Ok(rank)
        })
        .await
    }

    pub async fn zscore<V: Serialize + ?Sized>(&self, key: &CacheKey, member: &V) -> Option<f64> {
        self.guarded("zscore", key.name(), async {
            let member = self.encode(member)?;
            let mut conn = self.lease().await?;
            let score: Option<f64> = conn.zscore(self.key_bytes(key), member).await?;
            Ok(score)
        })
        .await
    }
}
