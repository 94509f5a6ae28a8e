//! Meeting-domain entities and their repositories.
//!
//! Each entity module declares the record type, its indexed fields, and the
//! lookups built on those indexes. [`Repositories`] wires one repository per
//! entity type to its store.

pub mod attachment;
pub mod meeting;
pub mod past_meeting;
pub mod recording;
pub mod registrant;
pub mod rsvp;
pub mod summary;
pub mod transcript;

pub use attachment::{Attachment, AttachmentKind, AttachmentRepository};
pub use meeting::{Meeting, MeetingRepository, Visibility};
pub use past_meeting::{PastMeeting, PastMeetingRepository};
pub use recording::{Recording, RecordingFile, RecordingRepository};
pub use registrant::{Registrant, RegistrantRepository};
pub use rsvp::{Rsvp, RsvpRepository, RsvpResponse};
pub use summary::{Summary, SummaryRepository};
pub use transcript::{Transcript, TranscriptRepository};

use tracing::warn;

use crate::config::StorageConfig;
use crate::keys::entity_types;
use crate::repository::{Entity, IndexedRepository, PruneReport, RepositoryResult};
use crate::storage::{init_storage, StoreSet};

/// One repository per entity type.
#[derive(Clone)]
pub struct Repositories {
    pub meetings: MeetingRepository,
    pub registrants: RegistrantRepository,
    pub past_meetings: PastMeetingRepository,
    pub recordings: RecordingRepository,
    pub transcripts: TranscriptRepository,
    pub summaries: SummaryRepository,
    pub rsvps: RsvpRepository,
    pub attachments: AttachmentRepository,
}

fn repository<T: Entity>(stores: &StoreSet) -> IndexedRepository<T> {
    match stores.get(T::ENTITY_TYPE) {
        Some(store) => IndexedRepository::new(store),
        None => {
            warn!(entity_type = T::ENTITY_TYPE, "No store configured, repository detached");
            IndexedRepository::detached()
        }
    }
}

impl Repositories {
    /// Entity types without a store get a detached repository.
    pub fn from_stores(stores: &StoreSet) -> Self {
        Self {
            meetings: repository(stores),
            registrants: repository(stores),
            past_meetings: repository(stores),
            recordings: repository(stores),
            transcripts: repository(stores),
            summaries: repository(stores),
            rsvps: repository(stores),
            attachments: repository(stores),
        }
    }

    /// Fresh in-memory stores for every entity type.
    pub fn memory() -> Self {
        Self::from_stores(&StoreSet::memory(&entity_types::ALL))
    }

    /// Open the configured stores and build the repositories.
    pub async fn init(config: &StorageConfig) -> RepositoryResult<Self> {
        let stores = init_storage(config).await?;
        Ok(Self::from_stores(&stores))
    }

    /// Prune stale index entries for every entity type.
    pub async fn prune_stale_indices(&self) -> Vec<(&'static str, RepositoryResult<PruneReport>)> {
        vec![
            (entity_types::MEETING, self.meetings.prune_stale_indices().await),
            (entity_types::REGISTRANT, self.registrants.prune_stale_indices().await),
            (entity_types::PAST_MEETING, self.past_meetings.prune_stale_indices().await),
            (entity_types::RECORDING, self.recordings.prune_stale_indices().await),
            (entity_types::TRANSCRIPT, self.transcripts.prune_stale_indices().await),
            (entity_types::SUMMARY, self.summaries.prune_stale_indices().await),
            (entity_types::RSVP, self.rsvps.prune_stale_indices().await),
            (entity_types::ATTACHMENT, self.attachments.prune_stale_indices().await),
        ]
    }

    /// Rewrite index entries for every entity of every type.
    pub async fn reindex_all(&self) -> Vec<(&'static str, RepositoryResult<usize>)> {
        vec![
            (entity_types::MEETING, self.meetings.reindex_all().await),
            (entity_types::REGISTRANT, self.registrants.reindex_all().await),
            (entity_types::PAST_MEETING, self.past_meetings.reindex_all().await),
            (entity_types::RECORDING, self.recordings.reindex_all().await),
            (entity_types::TRANSCRIPT, self.transcripts.reindex_all().await),
            (entity_types::SUMMARY, self.summaries.reindex_all().await),
            (entity_types::RSVP, self.rsvps.reindex_all().await),
            (entity_types::ATTACHMENT, self.attachments.reindex_all().await),
        ]
    }
}
