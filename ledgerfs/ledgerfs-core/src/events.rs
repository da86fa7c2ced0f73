use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{EntryType, ObjectId};

pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Notification published once per committed namespace operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Event {
    FileCreated {
        file_id: ObjectId,
        folder_id: ObjectId,
        name: String,
        owner: String,
    },
    FolderCreated {
        folder_id: ObjectId,
        parent_id: Option<ObjectId>,
        name: String,
        owner: String,
    },
    LinkCreated {
        link_id: ObjectId,
        folder_id: ObjectId,
        name: String,
        target_id: ObjectId,
        owner: String,
    },
    EntryDeleted {
        parent_id: ObjectId,
        name: String,
        entry_type: EntryType,
    },
    EntryRenamed {
        parent_id: ObjectId,
        old_name: String,
        new_name: String,
    },
    RootCreated {
        root_id: ObjectId,
        root_folder_id: ObjectId,
        owner: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Delivery is best effort; having no subscribers is not an error.
    pub fn send(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
