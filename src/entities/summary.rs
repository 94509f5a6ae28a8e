//! Generated meeting summaries awaiting or past approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::entity_types;
use crate::repository::{Entity, IndexedField, IndexedRepository, RepositoryResult};

pub const INDEX_PAST_MEETING: &str = "past_meeting";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub uid: String,
    pub past_meeting_uid: String,
    pub title: String,
    pub content: String,
    /// Edited text, if a host revised the generated content.
    pub edited_content: Option<String>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Summary {
    pub fn new(past_meeting_uid: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            past_meeting_uid: past_meeting_uid.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

fn past_meeting_uid(s: &Summary) -> Option<&str> {
    Some(&s.past_meeting_uid)
}

impl Entity for Summary {
    const ENTITY_TYPE: &'static str = entity_types::SUMMARY;

    fn uid(&self) -> &str {
        &self.uid
    }

    fn indexed_fields() -> Vec<IndexedField<Self>> {
        vec![IndexedField::new(INDEX_PAST_MEETING, past_meeting_uid)]
    }
}

pub type SummaryRepository = IndexedRepository<Summary>;

impl IndexedRepository<Summary> {
    pub async fn list_by_past_meeting(&self, past_meeting_uid: &str) -> RepositoryResult<Vec<Summary>> {
        self.list_by_index(INDEX_PAST_MEETING, past_meeting_uid).await
    }
}
