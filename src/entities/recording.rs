use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::entity_types;
use crate::repository::{Entity, IndexedField, IndexedRepository, RepositoryResult};

pub const INDEX_PAST_MEETING: &str = "past_meeting";

/// A single downloadable artifact of a recording session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingFile {
    pub file_type: String,
    pub download_url: String,
    pub file_size: u64,
    pub recording_start: Option<DateTime<Utc>>,
    pub recording_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recording {
    pub uid: String,
    pub past_meeting_uid: String,
    pub platform_recording_id: Option<String>,
    pub files: Vec<RecordingFile>,
    pub total_size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recording {
    pub fn new(past_meeting_uid: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            past_meeting_uid: past_meeting_uid.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

fn past_meeting_uid(r: &Recording) -> Option<&str> {
    Some(&r.past_meeting_uid)
}

impl Entity for Recording {
    const ENTITY_TYPE: &'static str = entity_types::RECORDING;

    fn uid(&self) -> &str {
        &self.uid
    }

    fn indexed_fields() -> Vec<IndexedField<Self>> {
        vec![IndexedField::new(INDEX_PAST_MEETING, past_meeting_uid)]
    }
}

pub type RecordingRepository = IndexedRepository<Recording>;

impl IndexedRepository<Recording> {
    pub async fn list_by_past_meeting(&self, past_meeting_uid: &str) -> RepositoryResult<Vec<Recording>> {
        self.list_by_index(INDEX_PAST_MEETING, past_meeting_uid).await
    }
}
