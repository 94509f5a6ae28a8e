//! RSVP responses from registrants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::entity_types;
use crate::repository::{
    Entity, IndexedField, IndexedRepository, RepositoryError, RepositoryResult,
};

pub const INDEX_MEETING: &str = "meeting";
pub const INDEX_REGISTRANT: &str = "registrant";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpResponse {
    Accepted,
    Declined,
    #[default]
    Maybe,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rsvp {
    pub uid: String,
    pub meeting_uid: String,
    pub registrant_uid: String,
    pub response: RsvpResponse,
    /// Occurrence the response applies to; `None` means all occurrences.
    pub occurrence_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rsvp {
    pub fn new(
        meeting_uid: impl Into<String>,
        registrant_uid: impl Into<String>,
        response: RsvpResponse,
    ) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            meeting_uid: meeting_uid.into(),
            registrant_uid: registrant_uid.into(),
            response,
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

fn meeting_uid(r: &Rsvp) -> Option<&str> {
    Some(&r.meeting_uid)
}

fn registrant_uid(r: &Rsvp) -> Option<&str> {
    Some(&r.registrant_uid)
}

impl Entity for Rsvp {
    const ENTITY_TYPE: &'static str = entity_types::RSVP;

    fn uid(&self) -> &str {
        &self.uid
    }

    fn indexed_fields() -> Vec<IndexedField<Self>> {
        vec![
            IndexedField::new(INDEX_MEETING, meeting_uid),
            IndexedField::new(INDEX_REGISTRANT, registrant_uid),
        ]
    }
}

pub type RsvpRepository = IndexedRepository<Rsvp>;

impl IndexedRepository<Rsvp> {
    pub async fn list_by_meeting(&self, meeting_uid: &str) -> RepositoryResult<Vec<Rsvp>> {
        self.list_by_index(INDEX_MEETING, meeting_uid).await
    }

    /// The registrant's response for the meeting. If several exist, the
    /// most recently updated wins.
    pub async fn get_by_meeting_and_registrant(
        &self,
        meeting_uid: &str,
        registrant_uid: &str,
    ) -> RepositoryResult<Rsvp> {
        self.list_by_index(INDEX_REGISTRANT, registrant_uid)
            .await?
            .into_iter()
            .filter(|r| r.meeting_uid == meeting_uid)
            .max_by_key(|r| r.updated_at)
            .ok_or_else(|| {
                RepositoryError::NotFound(format!(
                    "rsvp for registrant {} in meeting {}",
                    registrant_uid, meeting_uid
                ))
            })
    }
}
