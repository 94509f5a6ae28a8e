//! Meeting registrants.
//!
//! A registrant is unique per (meeting, email). The store cannot enforce
//! that, so callers check [`exists_by_meeting_and_email`] before creating
//! and accept the race between check and write.
//!
//! [`exists_by_meeting_and_email`]: IndexedRepository::exists_by_meeting_and_email

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::entity_types;
use crate::repository::{
    Entity, IndexedField, IndexedRepository, RepositoryError, RepositoryResult,
};

pub const INDEX_MEETING: &str = "meeting";
pub const INDEX_EMAIL: &str = "email";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registrant {
    pub uid: String,
    pub meeting_uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub org_name: Option<String>,
    pub host: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registrant {
    pub fn new(meeting_uid: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            meeting_uid: meeting_uid.into(),
            email: email.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

fn meeting_uid(r: &Registrant) -> Option<&str> {
    Some(&r.meeting_uid)
}

fn email(r: &Registrant) -> Option<&str> {
    Some(&r.email)
}

impl Entity for Registrant {
    const ENTITY_TYPE: &'static str = entity_types::REGISTRANT;

    fn uid(&self) -> &str {
        &self.uid
    }

    fn indexed_fields() -> Vec<IndexedField<Self>> {
        vec![
            IndexedField::new(INDEX_MEETING, meeting_uid),
            IndexedField::new(INDEX_EMAIL, email),
        ]
    }
}

pub type RegistrantRepository = IndexedRepository<Registrant>;

impl IndexedRepository<Registrant> {
    pub async fn list_by_meeting(&self, meeting_uid: &str) -> RepositoryResult<Vec<Registrant>> {
        self.list_by_index(INDEX_MEETING, meeting_uid).await
    }

    /// Registrations across all meetings for `email`.
    pub async fn list_by_email(&self, email: &str) -> RepositoryResult<Vec<Registrant>> {
        self.list_by_index(INDEX_EMAIL, email).await
    }

    pub async fn get_by_meeting_and_email(
        &self,
        meeting_uid: &str,
        email: &str,
    ) -> RepositoryResult<Registrant> {
        self.list_by_email(email)
            .await?
            .into_iter()
            .find(|r| r.meeting_uid == meeting_uid)
            .ok_or_else(|| {
                RepositoryError::NotFound(format!(
                    "registrant {} in meeting {}",
                    email, meeting_uid
                ))
            })
    }

    pub async fn exists_by_meeting_and_email(
        &self,
        meeting_uid: &str,
        email: &str,
    ) -> RepositoryResult<bool> {
        match self.get_by_meeting_and_email(meeting_uid, email).await {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
