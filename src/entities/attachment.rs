use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::entity_types;
use crate::repository::{Entity, IndexedField, IndexedRepository, RepositoryResult};

pub const INDEX_MEETING: &str = "meeting";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    #[default]
    File,
    Link,
}

/// A file or link attached to a meeting. File contents live elsewhere;
/// this is metadata only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub uid: String,
    pub meeting_uid: String,
    pub kind: AttachmentKind,
    pub name: String,
    pub link: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<u64>,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attachment {
    pub fn new(meeting_uid: impl Into<String>, name: impl Into<String>, kind: AttachmentKind) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            meeting_uid: meeting_uid.into(),
            name: name.into(),
            kind,
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

fn meeting_uid(a: &Attachment) -> Option<&str> {
    Some(&a.meeting_uid)
}

impl Entity for Attachment {
    const ENTITY_TYPE: &'static str = entity_types::ATTACHMENT;

    fn uid(&self) -> &str {
        &self.uid
    }

    fn indexed_fields() -> Vec<IndexedField<Self>> {
        vec![IndexedField::new(INDEX_MEETING, meeting_uid)]
    }
}

pub type AttachmentRepository = IndexedRepository<Attachment>;

impl IndexedRepository<Attachment> {
    pub async fn list_by_meeting(&self, meeting_uid: &str) -> RepositoryResult<Vec<Attachment>> {
        self.list_by_index(INDEX_MEETING, meeting_uid).await
    }
}
