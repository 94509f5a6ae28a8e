//! NATS JetStream KV store backend.
//!
//! Provides the [`KvStore`](super::KvStore) implementation backed by
//! JetStream KV buckets.
//!
//! ## Architecture
//!
//! - One bucket per entity type: `{prefix}-{bucket}` when a prefix is
//!   configured, otherwise `{bucket}` (`meeting-registrants`, ...)
//! - Entity documents and their index markers share the bucket
//! - Revisions are the bucket's stream sequence numbers: monotonic per key,
//!   but not contiguous
//! - Conditional writes use JetStream's expected-last-subject-sequence check;
//!   a rejected write surfaces as "wrong last sequence"

use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use tracing::{info, warn};

use crate::config::{NatsConfig, StorageConfig};
use crate::utils::retry::connection_backoff;

use super::{Result, StoreError, StoreSet};

mod kv_store;

pub use kv_store::{BucketSettings, NatsKvStore};

/// Connect to the NATS server, retrying with backoff.
///
/// Gives up after `connect_retries` retries.
pub async fn connect(config: &NatsConfig) -> Result<async_nats::Client> {
    let url = config.url.as_str();
    let client = (|| async_nats::connect(url))
        .retry(connection_backoff().with_max_times(config.connect_retries as usize))
        .notify(|err: &async_nats::ConnectError, delay: Duration| {
            warn!(address = %url, error = %err, ?delay, "NATS connection failed, retrying");
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to connect to {}: {}", url, e)))?;

    info!(address = %url, "Connected to NATS");
    Ok(client)
}

/// Full bucket name for a configured bucket.
pub fn bucket_name(prefix: Option<&str>, bucket: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}-{}", prefix, bucket),
        _ => bucket.to_string(),
    }
}

/// Open (creating if needed) one bucket per configured entity type.
pub async fn init_stores(config: &StorageConfig) -> Result<StoreSet> {
    let client = connect(&config.nats).await?;
    let settings = BucketSettings::from(&config.nats);

    let mut set = StoreSet::new();
    for (entity_type, bucket) in config.buckets.entries() {
        let Some(bucket) = bucket else {
            info!(%entity_type, "No bucket configured; repository will be detached");
            continue;
        };

        let name = bucket_name(config.nats.bucket_prefix.as_deref(), bucket);
        let store = NatsKvStore::new(client.clone(), &name, &settings)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open bucket {}: {}", name, e)))?;
        set.insert(entity_type, Arc::new(store));
    }

    Ok(set)
}
