use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::entity_types;
use crate::repository::{Entity, IndexedField, IndexedRepository, RepositoryResult};

pub const INDEX_PAST_MEETING: &str = "past_meeting";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transcript {
    pub uid: String,
    pub past_meeting_uid: String,
    pub language: String,
    pub download_url: String,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    pub fn new(past_meeting_uid: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            past_meeting_uid: past_meeting_uid.into(),
            language: "en".to_string(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

fn past_meeting_uid(t: &Transcript) -> Option<&str> {
    Some(&t.past_meeting_uid)
}

impl Entity for Transcript {
    const ENTITY_TYPE: &'static str = entity_types::TRANSCRIPT;

    fn uid(&self) -> &str {
        &self.uid
    }

    fn indexed_fields() -> Vec<IndexedField<Self>> {
        vec![IndexedField::new(INDEX_PAST_MEETING, past_meeting_uid)]
    }
}

pub type TranscriptRepository = IndexedRepository<Transcript>;

impl IndexedRepository<Transcript> {
    pub async fn list_by_past_meeting(&self, past_meeting_uid: &str) -> RepositoryResult<Vec<Transcript>> {
        self.list_by_index(INDEX_PAST_MEETING, past_meeting_uid).await
    }
}
