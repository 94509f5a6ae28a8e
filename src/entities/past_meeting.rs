//! Past meetings: one record per occurrence that actually took place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::entity_types;
use crate::repository::{
    Entity, IndexedField, IndexedRepository, RepositoryError, RepositoryResult,
};

pub const INDEX_MEETING: &str = "meeting";
pub const INDEX_PLATFORM_MEETING_ID: &str = "platform_meeting_id";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PastMeeting {
    pub uid: String,
    pub meeting_uid: String,
    pub project_uid: String,
    pub title: String,
    /// Platform identifier of this occurrence. Webhooks refer to it.
    pub platform_meeting_id: Option<String>,
    pub occurrence_id: Option<String>,
    pub scheduled_start_time: DateTime<Utc>,
    pub scheduled_end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PastMeeting {
    pub fn new(meeting_uid: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            meeting_uid: meeting_uid.into(),
            scheduled_start_time: now,
            scheduled_end_time: now,
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

fn meeting_uid(p: &PastMeeting) -> Option<&str> {
    Some(&p.meeting_uid)
}

fn platform_meeting_id(p: &PastMeeting) -> Option<&str> {
    p.platform_meeting_id.as_deref()
}

impl Entity for PastMeeting {
    const ENTITY_TYPE: &'static str = entity_types::PAST_MEETING;

    fn uid(&self) -> &str {
        &self.uid
    }

    fn indexed_fields() -> Vec<IndexedField<Self>> {
        vec![
            IndexedField::new(INDEX_MEETING, meeting_uid),
            IndexedField::new(INDEX_PLATFORM_MEETING_ID, platform_meeting_id),
        ]
    }
}

pub type PastMeetingRepository = IndexedRepository<PastMeeting>;

impl IndexedRepository<PastMeeting> {
    pub async fn list_by_meeting(&self, meeting_uid: &str) -> RepositoryResult<Vec<PastMeeting>> {
        self.list_by_index(INDEX_MEETING, meeting_uid).await
    }

    /// The past meeting recorded for a platform meeting id. When several
    /// match, the earliest scheduled one wins.
    pub async fn get_by_platform_meeting_id(&self, id: &str) -> RepositoryResult<PastMeeting> {
        self.list_by_index(INDEX_PLATFORM_MEETING_ID, id)
            .await?
            .into_iter()
            .min_by_key(|p| p.scheduled_start_time)
            .ok_or_else(|| RepositoryError::NotFound(format!("past meeting for platform id {}", id)))
    }
}
