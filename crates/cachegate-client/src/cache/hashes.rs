//! Hash commands.
//!
//! Field names go through the codec's field encoding, values through the
//! value encoding. Reads that find data re-arm the key's TTL.

use std::collections::HashMap;

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

    /// Set one field. Returns the number of fields added (0 on overwrite).
    pub async fn hset<V: Serialize + ?Sized>(&self, key: &CacheKey, field: &str, value: &V) -> i64 {
        self.guarded("hset", key.name(), async {
            let payload = self.encode(value)?;
            let mut conn = self.lease().await?;
            let added: i64 = conn
                .hset(self.key_bytes(key), self.field_bytes(field), payload)
                .await?;
            self.refresh(&mut conn, key, TtlRefresh::OnChange, &added)
                .await;
            Ok(added)
        })
        .await
    }

    /// Set several fields in one `HMSET`.
    pub async fn hmset<I, F, V>(&self, key: &CacheKey, fields: I) -> bool
    where
        I: IntoIterator<Item = (F, V)>,
        F: AsRef<str>,
        V: Serialize,
    {
        let items = fields
            .into_iter()
            .map(|(field, value)| Ok((self.field_bytes(field.as_ref()), self.encode(&value)?)))
            .collect::<Result<Vec<_>>>();

        self.guarded("hmset", key.name(), async {
            let items = items?;
            if items.is_empty() {
                return Ok(false);
            }
            let mut conn = self.lease().await?;
            let _: () = conn.hset_multiple(self.key_bytes(key), &items).await?;
            self.refresh(&mut conn, key, TtlRefresh::Always, &true)
                .await;
            Ok(true)
        })
        .await
    }

    /// Remove fields. Returns how many existed.
    pub async fn hdel(&self, key: &CacheKey, fields: &[&str]) -> i64 {
        if fields.is_empty() {
            return 0;
        }
        self.guarded("hdel", key.name(), async {
            let fields = fields.iter().map(|f| self.field_bytes(f)).collect::<Vec<_>>();
            let mut conn = self.lease().await?;
            let removed: i64 = conn.hdel(self.key_bytes(key), fields).await?;
            Ok(removed)
        })
        .await
    }

    /// Add `delta` to an integer field, returning the new value.
    pub async fn hincr_by(&self, key: &CacheKey, field: &str, delta: i64) -> i64 {
        self.guarded("hincrby", key.name(), async {
            let mut conn = self.lease().await?;
            let value: i64 = conn
                .hincr(self.key_bytes(key), self.field_bytes(field), delta)
                .await?;
            self.refresh(&mut conn, key, TtlRefresh::Always, &true)
                .await;
            Ok(value)
        })
        .await
    }

    /// Add `delta` to a float field, returning the new value.
    pub async fn hincr_by_float(&self, key: &CacheKey, field: &str, delta: f64) -> f64 {
        self.guarded("hincrbyfloat", key.name(), async {
            let mut conn = self.lease().await?;
            let value: f64 = conn
                .hincr(self.key_bytes(key), self.field_bytes(field), delta)
                .await?;
            self.refresh(&mut conn, key, TtlRefresh::Always, &true)
                .await;
            Ok(value)
        })
        .await
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub async fn hget<T: DeserializeOwned>(&self, key: &CacheKey, field: &str) -> Option<T> {
        self.guarded("hget", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Option<Vec<u8>> = conn
                .hget(self.key_bytes(key), self.field_bytes(field))
                .await?;
            self.refresh(&mut conn, key, TtlRefresh::OnHit, &raw).await;
            self.decode_opt(raw)
        })
        .await
    }

    /// Values for `fields`, in request order.
    pub async fn hmget<T: DeserializeOwned>(&self, key: &CacheKey, fields: &[&str]) -> Vec<Option<T>> {
        if fields.is_empty() {
            return Vec::new();
        }
        self.guarded("hmget", key.name(), async {
            let fields = fields.iter().map(|f| self.field_bytes(f)).collect::<Vec<_>>();
            let mut conn = self.lease().await?;
            let raw: Vec<Option<Vec<u8>>> = redis::cmd("HMGET")
                .arg(self.key_bytes(key))
                .arg(&fields)
                .query_async(&mut conn)
                .await?;
            let found = raw.iter().any(Option::is_some);
            self.refresh(&mut conn, key, TtlRefresh::OnHit, &found).await;
            self.decode_each(raw)
        })
        .await
    }

    pub async fn hgetall<T: DeserializeOwned>(&self, key: &CacheKey) -> HashMap<String, T> {
        self.guarded("hgetall", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: HashMap<Vec<u8>, Vec<u8>> = conn.hgetall(self.key_bytes(key)).await?;
            self.refresh(&mut conn, key, TtlRefresh::OnHit, &raw).await;

            let mut entries = HashMap::with_capacity(raw.len());
            for (field, value) in raw {
                if let Some(decoded) = self.decode_opt(Some(value))? {
                    entries.insert(self.decode_key(&field)?, decoded);
                }
            }
            Ok(entries)
        })
        .await
    }

    pub async fn hvals<T: DeserializeOwned>(&self, key: &CacheKey) -> Vec<T> {
        self.guarded("hvals", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Vec<Vec<u8>> = conn.hvals(self.key_bytes(key)).await?;
            self.refresh(&mut conn, key, TtlRefresh::OnHit, &raw).await;
            self.decode_all(&raw)
        })
        .await
    }

    pub async fn hkeys(&self, key: &CacheKey) -> Vec<String> {
        self.guarded("hkeys", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Vec<Vec<u8>> = conn.hkeys(self.key_bytes(key)).await?;
            raw.iter()
                .map(|f| self.decode_key(f))
                .collect::<Result<Vec<_>>>()
        })
        .await
    }

    pub async fn hlen(&self, key: &CacheKey) -> i64 {
        self.guarded("hlen", key.name(), async {
            let mut conn = self.lease().await?;
            let len: i64 = conn.hlen(self.key_bytes(key)).await?;
            Ok(len)
        })
        .await
    }

    pub async fn hexists(&self, key: &CacheKey, field: &str) -> bool {
        self.guarded("hexists", key.name(), async {
            let mut conn = self.lease().await?;
            let found: bool = conn
                .hexists(self.key_bytes(key), self.field_bytes(field))
                .await?;
            Ok(found)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_store::{FakeStore, Reply};
    use cachegate_domain::{KeyNamespace, KeySpec};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

    const PROFILE: KeyNamespace = KeyNamespace::new("profile:", 600, "profile hash");

    fn expire(key: &str, ttl: i64) -> Vec<String> {
        vec!["EXPIRE".to_string(), key.to_string(), ttl.to_string()]
    }

    #[tokio::test]
    async fn test_hset_refreshes_ttl_only_when_a_field_was_added() {
        let added = Arc::new(AtomicI64::new(1));
        let reply = Arc::clone(&added);
        let store = FakeStore::start(move |cmd| {
            (cmd[0] == "HSET").then(|| Reply::int(reply.load(Ordering::SeqCst)))
        })
        .await;
        let client = CacheClient::new(store.config("hash-ttl")).unwrap();
        let key = PROFILE.key("7");

        assert_eq!(client.hset(&key, "name", "Ada").await, 1);
        assert_eq!(
            store.received("HSET"),
            vec![vec!["HSET", "profile:7", "name", "\"Ada\""]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()]
        );
        assert_eq!(store.received("EXPIRE"), vec![expire("profile:7", 600)]);

        added.store(0, Ordering::SeqCst);
        assert_eq!(client.hset(&key, "name", "Ada").await, 0);
        assert_eq!(store.count("HSET"), 2);
        assert_eq!(store.count("EXPIRE"), 1);
    }

    #[tokio::test]
    async fn test_hget_slides_expiry_on_hit_only() {
        let hit = Arc::new(AtomicBool::new(true));
        let reply = Arc::clone(&hit);
        let store = FakeStore::start(move |cmd| {
            (cmd[0] == "HGET").then(|| {
                if reply.load(Ordering::SeqCst) {
                    Reply::bulk("\"Ada\"")
                } else {
                    Reply::nil()
                }
            })
        })
        .await;
        let client = CacheClient::new(store.config("hash-ttl")).unwrap();
        let key = PROFILE.key("8");

        assert_eq!(client.hget::<String>(&key, "name").await.as_deref(), Some("Ada"));
        assert_eq!(store.received("EXPIRE"), vec![expire("profile:8", 600)]);

        hit.store(false, Ordering::SeqCst);
        assert_eq!(client.hget::<String>(&key, "name").await, None);
        assert_eq!(store.count("HGET"), 2);
        assert_eq!(store.count("EXPIRE"), 1);
    }

    #[tokio::test]
    async fn test_hincr_by_always_refreshes() {
        let store = FakeStore::start(|cmd| (cmd[0] == "HINCRBY").then(|| Reply::int(3))).await;
        let client = CacheClient::new(store.config("hash-ttl")).unwrap();
        let key = PROFILE.key("9");

        assert_eq!(client.hincr_by(&key, "visits", 3).await, 3);
        assert_eq!(store.received("EXPIRE"), vec![expire("profile:9", 600)]);
    }
}
