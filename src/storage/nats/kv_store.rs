//! NATS JetStream KV implementation of [`KvStore`].

use std::fmt::Display;

use async_nats::jetstream::{
    self,
    kv::{Entry, Operation, Store},
    Context,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use tracing::{debug, info};

use crate::config::NatsConfig;
use crate::storage::{KvEntry, KvStore, Result, Revision, StoreError};

/// Bucket creation settings.
#[derive(Debug, Clone)]
pub struct BucketSettings {
    /// Values retained per key. Only the latest is read.
    pub history: i64,
    /// Stream replicas.
    pub replicas: usize,
    /// Maximum value size in bytes.
    pub max_value_size: i32,
}

impl Default for BucketSettings {
    fn default() -> Self {
        Self {
            history: 1,
            replicas: 1,
            max_value_size: 1024 * 1024,
        }
    }
}

impl From<&NatsConfig> for BucketSettings {
    fn from(config: &NatsConfig) -> Self {
        Self {
            history: config.history,
            replicas: config.replicas,
            max_value_size: config.max_value_size,
        }
    }
}

/// KvStore backed by a single JetStream KV bucket.
pub struct NatsKvStore {
    kv: Store,
    bucket: String,
}

impl NatsKvStore {
    /// Open the bucket, creating it with `settings` if it does not exist.
    pub async fn new(
        client: async_nats::Client,
        bucket: &str,
        settings: &BucketSettings,
    ) -> std::result::Result<Self, async_nats::Error> {
        let jetstream = jetstream::new(client);
        let kv = Self::ensure_bucket(&jetstream, bucket, settings).await?;
        info!(%bucket, "NATS KV bucket ready");

        Ok(Self {
            kv,
            bucket: bucket.to_string(),
        })
    }

    async fn ensure_bucket(
        jetstream: &Context,
        bucket: &str,
        settings: &BucketSettings,
    ) -> std::result::Result<Store, async_nats::Error> {
        match jetstream.get_key_value(bucket).await {
            Ok(store) => Ok(store),
            Err(_) => jetstream
                .create_key_value(jetstream::kv::Config {
                    bucket: bucket.to_string(),
                    history: settings.history,
                    num_replicas: settings.replicas,
                    max_value_size: settings.max_value_size,
                    ..Default::default()
                })
                .await
                .map_err(|e| e.into()),
        }
    }

    /// Latest entry for `key`, treating delete and purge markers as absent.
    async fn live_entry(&self, key: &str) -> Result<Option<Entry>> {
        match self.kv.entry(key).await {
            Ok(Some(entry)) if matches!(entry.operation, Operation::Put) => Ok(Some(entry)),
            Ok(_) => Ok(None),
            Err(e) => Err(classify(key, e)),
        }
    }

    /// Map a rejected conditional write.
    ///
    /// JetStream reports "wrong last sequence" both when another writer got
    /// there first and when the key has been deleted, so look again.
    async fn classify_rejection(&self, key: &str, expected: Revision, message: String) -> StoreError {
        if !is_wrong_last_sequence(&message) {
            return classify(key, message);
        }

        match self.live_entry(key).await {
            Ok(None) => StoreError::NotFound(key.to_string()),
            Ok(Some(_)) => StoreError::WrongLastSequence {
                key: key.to_string(),
                expected,
            },
            Err(e) => e,
        }
    }
}

fn is_wrong_last_sequence(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("wrong last sequence") || message.contains("wrong last revision")
}

fn classify(key: &str, err: impl Display) -> StoreError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();

    if lower.contains("invalid key") {
        StoreError::InvalidKey(format!("{}: {}", key, message))
    } else if lower.contains("timed out")
        || lower.contains("no responders")
        || lower.contains("disconnected")
        || lower.contains("connection")
    {
        StoreError::Unavailable(message)
    } else {
        StoreError::Backend(format!("{}: {}", key, message))
    }
}

#[async_trait]
impl KvStore for NatsKvStore {
    fn name(&self) -> &str {
        &self.bucket
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let keys = self
            .kv
            .keys()
            .await
            .map_err(|e| classify(&self.bucket, e))?;

        keys.try_collect::<Vec<String>>()
            .await
            .map_err(|e| classify(&self.bucket, e))
    }

    async fn get(&self, key: &str) -> Result<KvEntry> {
        let entry = self
            .live_entry(key)
            .await?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        Ok(KvEntry {
            key: key.to_string(),
            value: entry.value,
            revision: Revision(entry.revision),
        })
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<Revision> {
        let revision = self
            .kv
            .put(key, value)
            .await
            .map_err(|e| classify(key, e))?;
        debug!(bucket = %self.bucket, %key, revision, "put");
        Ok(Revision(revision))
    }

    async fn update(&self, key: &str, value: Bytes, expected: Revision) -> Result<Revision> {
        match self.kv.update(key, value, expected.0).await {
            Ok(revision) => {
                debug!(bucket = %self.bucket, %key, revision, "update");
                Ok(Revision(revision))
            }
            Err(e) => Err(self.classify_rejection(key, expected, e.to_string()).await),
        }
    }

    async fn delete(&self, key: &str, expected: Option<Revision>) -> Result<()> {
        match expected {
            Some(expected) => match self.kv.delete_expect_revision(key, Some(expected.0)).await {
                Ok(()) => Ok(()),
                Err(e) => Err(self.classify_rejection(key, expected, e.to_string()).await),
            },
            None => {
                // JetStream writes a tombstone even for absent keys.
                if self.live_entry(key).await?.is_none() {
                    return Err(StoreError::NotFound(key.to_string()));
                }
                self.kv.delete(key).await.map_err(|e| classify(key, e))
            }
        }
    }
}
