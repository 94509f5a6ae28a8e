//! Storage configuration types.

use serde::Deserialize;

use crate::keys::entity_types;

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// In-process store. Data is lost on exit.
    #[default]
    Memory,
    /// NATS JetStream KV.
    Nats,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// NATS-specific configuration.
    pub nats: NatsConfig,
    /// Bucket per entity type.
    pub buckets: BucketsConfig,
}

/// NATS-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL.
    pub url: String,
    /// Optional prefix prepended to every bucket name (`{prefix}-{bucket}`).
    pub bucket_prefix: Option<String>,
    /// Values retained per key when a bucket is created.
    pub history: i64,
    /// Stream replicas when a bucket is created.
    pub replicas: usize,
    /// Maximum value size in bytes when a bucket is created.
    pub max_value_size: i32,
    /// Connection attempts before giving up.
    pub connect_retries: u32,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            bucket_prefix: None,
            history: 1,
            replicas: 1,
            max_value_size: 1024 * 1024,
            connect_retries: 30,
        }
    }
}

/// Bucket name per entity type.
///
/// Setting a bucket to `null` leaves that entity type without a store; its
/// repository reports `Unavailable` for every operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BucketsConfig {
    pub meeting: Option<String>,
    pub registrant: Option<String>,
    pub past_meeting: Option<String>,
    pub recording: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub rsvp: Option<String>,
    pub attachment: Option<String>,
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            meeting: Some("meetings".to_string()),
            registrant: Some("meeting-registrants".to_string()),
            past_meeting: Some("past-meetings".to_string()),
            recording: Some("past-meeting-recordings".to_string()),
            transcript: Some("past-meeting-transcripts".to_string()),
            summary: Some("past-meeting-summaries".to_string()),
            rsvp: Some("meeting-rsvps".to_string()),
            attachment: Some("meeting-attachments".to_string()),
        }
    }
}

impl BucketsConfig {
    /// (entity type, bucket) pairs in registration order.
    pub fn entries(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            (entity_types::MEETING, self.meeting.as_deref()),
            (entity_types::REGISTRANT, self.registrant.as_deref()),
            (entity_types::PAST_MEETING, self.past_meeting.as_deref()),
            (entity_types::RECORDING, self.recording.as_deref()),
            (entity_types::TRANSCRIPT, self.transcript.as_deref()),
            (entity_types::SUMMARY, self.summary.as_deref()),
            (entity_types::RSVP, self.rsvp.as_deref()),
            (entity_types::ATTACHMENT, self.attachment.as_deref()),
        ]
    }
}
