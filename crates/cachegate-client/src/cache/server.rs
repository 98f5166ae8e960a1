//! Server and scripting commands.

use cachegate_domain::{CacheKey, TopologyKind};
use redis::FromRedisValue;
use redis::cluster_routing::{Route, RoutingInfo, SingleNodeRoutingInfo, SlotAddr};

use super::redis_client::CacheClient;
use crate::codec::Serializer;
use crate::error::CacheError;
use crate::topology::key_slot;

impl<S: Serializer> CacheClient<S> {
    /// `PONG` when the store answers.
    pub async fn ping(&self) -> Option<String> {
        self.guarded("ping", "", async {
            let mut conn = self.lease().await?;
            let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(Some(reply))
        })
        .await
    }

    /// Remove every key of the current database. Refused on a cluster.
    pub async fn flush_db(&self) -> bool {
        self.flush("flushdb", "FLUSHDB").await
    }

    /// Remove every key of every database. Refused on a cluster.
    pub async fn flush_all(&self) -> bool {
        self.flush("flushall", "FLUSHALL").await
    }

    async fn flush(&self, op: &'static str, command: &'static str) -> bool {
        self.guarded(op, "", async {
            if self.kind() == TopologyKind::Cluster {
                return Err(CacheError::Unsupported {
                    topology: TopologyKind::Cluster.as_str(),
                    operation: op,
                });
            }
            let mut conn = self.lease().await?;
            let _: () = redis::cmd(command).query_async(&mut conn).await?;
            Ok(true)
        })
        .await
    }

    /// Load a script and return its SHA1 digest.
    ///
    /// On a cluster the script is loaded on the primary owning
    /// `sample_key`, which is then required; run it with keys from the same
    /// slot.
    pub async fn script_load(&self, script: &str, sample_key: Option<&CacheKey>) -> Option<String> {
        let label = sample_key.map_or("", CacheKey::name);
        self.guarded("script_load", label, async {
            let mut cmd = redis::cmd("SCRIPT");
            cmd.arg("LOAD").arg(script);

            let mut conn = self.lease().await?;
            let digest: String = match conn.cluster() {
                Some(cluster) => {
                    let sample = sample_key.ok_or(CacheError::MissingSampleKey)?;
                    let slot = key_slot(&self.key_bytes(sample));
                    let routing = RoutingInfo::SingleNode(SingleNodeRoutingInfo::SpecificNode(
                        Route::new(slot, SlotAddr::Master),
                    ));
                    let reply = cluster.route_command(&cmd, routing).await?;
                    String::from_redis_value(&reply)?
                }
                None => cmd.query_async(&mut conn).await?,
            };
            Ok(Some(digest))
        })
        .await
    }

    /// Run a loaded script by digest. `None` on failure, including an
    /// unknown digest.
    pub async fn eval_sha<T: FromRedisValue>(&self, sha: &str, keys: &[CacheKey], args: &[&str]) -> Option<T> {
        self.guarded("evalsha", keys.first().map_or("", CacheKey::name), async {
            let names = keys.iter().map(|k| self.key_bytes(k)).collect::<Vec<_>>();
            let mut conn = self.lease().await?;
            let reply: T = redis::cmd("EVALSHA")
                .arg(sha)
                .arg(names.len())
                .arg(&names)
                .arg(args)
                .query_async(&mut conn)
                .await?;
            Ok(Some(reply))
        })
        .await
    }
}
