//! Key and string commands.

use cachegate_domain::{CacheKey, KeyValue};
use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};

use super::redis_client::CacheClient;
use crate::codec::Serializer;
use crate::error::Result;
use crate::strategy::TtlRefresh;

impl<S: Serializer> CacheClient<S> {
    // =========================================================================
    // KEY OPERATIONS
    // =========================================================================

    pub async fn exists(&self, key: &CacheKey) -> bool {
        self.guarded("exists", key.name(), async {
            let mut conn = self.lease().await?;
            let found: bool = conn.exists(self.key_bytes(key)).await?;
            Ok(found)
        })
        .await
    }

    /// Delete the key. Returns the number of keys removed.
    pub async fn del(&self, key: &CacheKey) -> i64 {
        self.guarded("del", key.name(), async {
            let mut conn = self.lease().await?;
            let removed: i64 = conn.del(self.key_bytes(key)).await?;
            Ok(removed)
        })
        .await
    }

    /// Re-arm the key's declared TTL.
    pub async fn expire(&self, key: &CacheKey) -> bool {
        self.guarded("expire", key.name(), async {
            let mut conn = self.lease().await?;
            let applied: bool = conn.expire(self.key_bytes(key), key.ttl_secs()).await?;
            Ok(applied)
        })
        .await
    }

    /// Remaining lifetime in seconds as reported by the store (`-1` no
    /// expiry, `-2` missing key). `None` if the call failed.
    pub async fn ttl(&self, key: &CacheKey) -> Option<i64> {
        self.guarded("ttl", key.name(), async {
            let mut conn = self.lease().await?;
            let remaining: i64 = conn.ttl(self.key_bytes(key)).await?;
            Ok(Some(remaining))
        })
        .await
    }

    pub async fn persist(&self, key: &CacheKey) -> bool {
        self.guarded("persist", key.name(), async {
            let mut conn = self.lease().await?;
            let removed: bool = conn.persist(self.key_bytes(key)).await?;
            Ok(removed)
        })
        .await
    }

    /// Rename `key` to `new_key`, replacing any existing target.
    pub async fn rename(&self, key: &CacheKey, new_key: &CacheKey) -> bool {
        self.guarded("rename", key.name(), async {
            let mut conn = self.lease().await?;
            let _: () = conn
                .rename(self.key_bytes(key), self.key_bytes(new_key))
                .await?;
            self.refresh(&mut conn, new_key, TtlRefresh::Always, &true)
                .await;
            Ok(true)
        })
        .await
    }

    /// Store type name (`string`, `hash`, ...), `none` for a missing key.
    pub async fn key_type(&self, key: &CacheKey) -> Option<String> {
        self.guarded("type", key.name(), async {
            let mut conn = self.lease().await?;
            let kind: String = conn.key_type(self.key_bytes(key)).await?;
            Ok(Some(kind))
        })
        .await
    }

    /// Key names matching a glob pattern. Scans the whole keyspace.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        self.guarded("keys", pattern, async {
            let mut conn = self.lease().await?;
            let names: Vec<Vec<u8>> = conn.keys(self.raw_key(pattern)).await?;
            names
                .iter()
                .map(|n| self.decode_key(n))
                .collect::<Result<Vec<_>>>()
        })
        .await
    }

    // =========================================================================
    // STRING VALUES
    // =========================================================================

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.guarded("get", key.name(), async {
            let mut conn = self.lease().await?;
            let raw: Option<Vec<u8>> = conn.get(self.key_bytes(key)).await?;
            self.decode_opt(raw)
        })
        .await
    }

    /// `SET key value EX ttl`: value and expiry in one command.
    pub async fn set<V: Serialize + ?Sized>(&self, key: &CacheKey, value: &V) -> bool {
        self.guarded("set", key.name(), async {
            let payload = self.encode(value)?;
            let mut conn = self.lease().await?;
            let _: () = redis::cmd("SET")
                .arg(self.key_bytes(key))
                .arg(payload)
                .arg("EX")
                .arg(key.ttl_secs())
                .query_async(&mut conn)
                .await?;
            Ok(true)
        })
        .await
    }

    /// `SETEX key ttl value`.
    pub async fn setex<V: Serialize + ?Sized>(&self, key: &CacheKey, value: &V) -> bool {
        self.guarded("setex", key.name(), async {
            let payload = self.encode(value)?;
            let mut conn = self.lease().await?;
            let _: () = conn
                .set_ex(self.key_bytes(key), payload, key.ttl_secs().unsigned_abs())
                .await?;
            Ok(true)
        })
        .await
    }

    /// Replace the value, returning the previous one. The TTL is re-armed
    /// whether or not the key existed.
    pub async fn getset<T, V>(&self, key: &CacheKey, value: &V) -> Option<T>
    where
        T: DeserializeOwned,
        V: Serialize + ?Sized,
    {
        self.guarded("getset", key.name(), async {
            let payload = self.encode(value)?;
            let mut conn = self.lease().await?;
            let old: Option<Vec<u8>> = conn.getset(self.key_bytes(key), payload).await?;
            self.refresh(&mut conn, key, TtlRefresh::Always, &old)
                .await;
            self.decode_opt(old)
        })
        .await
    }

    pub async fn incr(&self, key: &CacheKey) -> i64 {
        self.incr_by(key, 1).await
    }

    pub async fn incr_by(&self, key: &CacheKey, delta: i64) -> i64 {
        self.guarded("incrby", key.name(), async {
            let mut conn = self.lease().await?;
            let value: i64 = conn.incr(self.key_bytes(key), delta).await?;
            Ok(value)
        })
        .await
    }

    pub async fn decr(&self, key: &CacheKey) -> i64 {
        self.decr_by(key, 1).await
    }

    pub async fn decr_by(&self, key: &CacheKey, delta: i64) -> i64 {
        self.guarded("decrby", key.name(), async {
            let mut conn = self.lease().await?;
            let value: i64 = conn.decr(self.key_bytes(key), delta).await?;
            Ok(value)
        })
        .await
    }

    // =========================================================================
    // MULTI-KEY
    // =========================================================================

    /// Write several values in one `MSET`. Each pair's name is a child of
    /// `base` and inherits its TTL, which is re-armed per key afterwards.
    pub async fn mset<V: Serialize>(&self, base: &CacheKey, pairs: &[KeyValue<V>]) -> bool {
        if pairs.is_empty() {
            return false;
        }
        self.guarded("mset", base.name(), async {
            let keys = pairs
                .iter()
                .map(|pair| base.child(&pair.key))
                .collect::<Vec<_>>();
            let items = keys
                .iter()
                .zip(pairs)
                .map(|(key, pair)| Ok((self.key_bytes(key), self.encode(&pair.value)?)))
                .collect::<Result<Vec<_>>>()?;

            let mut conn = self.lease().await?;
            let _: () = conn.mset(&items).await?;
            for key in &keys {
                self.refresh(&mut conn, key, TtlRefresh::Always, &true)
                    .await;
            }
            Ok(true)
        })
        .await
    }

    /// Values for raw key names, in request order.
    pub async fn mget<T: DeserializeOwned>(&self, names: &[&str]) -> Vec<Option<T>> {
        if names.is_empty() {
            return Vec::new();
        }
        self.guarded("mget", names[0], async {
            let keys = names.iter().map(|n| self.raw_key(n)).collect::<Vec<_>>();
            let mut conn = self.lease().await?;
            let raw: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
                .arg(&keys)
                .query_async(&mut conn)
                .await?;
            self.decode_each(raw)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BincodeSerializer;
    use crate::fake_store::{FakeStore, Reply};
    use cachegate_domain::{KeyNamespace, KeySpec};

    const USER: KeyNamespace = KeyNamespace::new("user:", 1800, "user profile");

    #[tokio::test]
    async fn test_getset_on_missing_key_still_arms_expiry() {
        let store = FakeStore::start(|cmd| (cmd[0] == "GETSET").then(Reply::nil)).await;
        let client = CacheClient::new(store.config("string-ttl")).unwrap();
        let key = USER.key("42");

        assert_eq!(client.getset::<String, _>(&key, "fresh").await, None);
        assert_eq!(
            store.received("EXPIRE"),
            vec![vec!["EXPIRE".to_string(), "user:42".to_string(), "1800".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_set_carries_ttl_in_the_write() {
        let store = FakeStore::start(|_| None).await;
        let client = CacheClient::new(store.config("string-ttl")).unwrap();

        assert!(client.set(&USER.key("42"), &serde_json::json!({ "id": "42" })).await);

        let sets = store.received("SET");
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0][1], "user:42");
        assert_eq!(sets[0][2], r#"{"id":"42"}"#);
        assert!(sets[0][3].eq_ignore_ascii_case("EX"));
        assert_eq!(sets[0][4], "1800");
        assert_eq!(store.count("EXPIRE"), 0);
    }

    #[tokio::test]
    async fn test_serializer_is_chosen_by_the_client_type() {
        let store = FakeStore::start(|_| None).await;
        let client = CacheClient::with_serializer(store.config("string-codec"), BincodeSerializer).unwrap();

        assert!(client.set(&USER.key("7"), &7u32).await);

        let sets = store.received("SET");
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0][2].as_bytes(), bincode::serialize(&7u32).unwrap().as_slice());
    }
}
