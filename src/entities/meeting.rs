//! Scheduled meetings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::entity_types;
use crate::repository::{Entity, IndexedField, IndexedRepository, RepositoryResult};

/// Index on the owning project.
pub const INDEX_PROJECT: &str = "project";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meeting {
    pub uid: String,
    pub project_uid: String,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub timezone: String,
    pub visibility: Visibility,
    /// Only registrants may join.
    pub restricted: bool,
    /// Identifier assigned by the meeting platform, once provisioned.
    pub platform_meeting_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn new(project_uid: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            project_uid: project_uid.into(),
            title: title.into(),
            start_time: now,
            duration_minutes: 60,
            timezone: "UTC".to_string(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

fn project_uid(m: &Meeting) -> Option<&str> {
    Some(&m.project_uid)
}

impl Entity for Meeting {
    const ENTITY_TYPE: &'static str = entity_types::MEETING;

    fn uid(&self) -> &str {
        &self.uid
    }

    fn indexed_fields() -> Vec<IndexedField<Self>> {
        vec![IndexedField::new(INDEX_PROJECT, project_uid)]
    }
}

pub type MeetingRepository = IndexedRepository<Meeting>;

impl IndexedRepository<Meeting> {
    pub async fn list_by_project(&self, project_uid: &str) -> RepositoryResult<Vec<Meeting>> {
        self.list_by_index(INDEX_PROJECT, project_uid).await
    }
}
