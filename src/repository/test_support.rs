//! Test entity shared by the repository unit tests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Entity, IndexedField};
use crate::storage::MemoryKvStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub uid: String,
    pub event: String,
    pub email: String,
    pub seat: u32,
}

impl Ticket {
    pub fn new(uid: &str, event: &str, email: &str) -> Self {
        Self {
            uid: uid.to_string(),
            event: event.to_string(),
            email: email.to_string(),
            seat: 0,
        }
    }
}

fn ticket_event(t: &Ticket) -> Option<&str> {
    Some(&t.event)
}

fn ticket_email(t: &Ticket) -> Option<&str> {
    Some(&t.email)
}

impl Entity for Ticket {
    const ENTITY_TYPE: &'static str = "ticket";

    fn uid(&self) -> &str {
        &self.uid
    }

    fn indexed_fields() -> Vec<IndexedField<Self>> {
        vec![
            IndexedField::new("event", ticket_event),
            IndexedField::new("email", ticket_email),
        ]
    }
}

pub fn memory_store() -> Arc<MemoryKvStore> {
    Arc::new(MemoryKvStore::with_name("tickets"))
}

pub fn ticket_key(uid: &str) -> String {
    format!("{}/{}", Ticket::ENTITY_TYPE, uid)
}
