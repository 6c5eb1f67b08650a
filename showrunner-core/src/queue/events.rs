use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::item::{ItemHeader, ItemState};

/// Lifecycle notifications emitted by the show queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum QueueEvent {
    Enqueued(ItemHeader),
    /// Dropped from the pending set by a Remove for the same show.
    Evicted(ItemHeader),
    /// Dropped at dispatch time because it was no longer admissible.
    Discarded { item: ItemHeader, reason: String },
    Started(ItemHeader),
    Finished(ItemHeader),
    Failed {
        item: ItemHeader,
        error: Option<String>,
    },
}

impl QueueEvent {
    pub fn item(&self) -> &ItemHeader {
        match self {
            QueueEvent::Enqueued(item)
            | QueueEvent::Evicted(item)
            | QueueEvent::Started(item)
            | QueueEvent::Finished(item)
            | QueueEvent::Discarded { item, .. }
            | QueueEvent::Failed { item, .. } => item,
        }
    }

    /// The item state this event leaves behind.
    pub fn state(&self) -> ItemState {
        match self {
            QueueEvent::Enqueued(_) => ItemState::Pending,
            QueueEvent::Started(_) => ItemState::Running,
            QueueEvent::Finished(_) => ItemState::Finished,
            QueueEvent::Evicted(_) | QueueEvent::Discarded { .. } | QueueEvent::Failed { .. } => {
                ItemState::Failed
            }
        }
    }
}

/// In-process fan-out of queue events. Publishing never blocks; slow
/// subscribers lose the oldest events.
pub struct QueueEventBus {
    sender: broadcast::Sender<QueueEvent>,
    capacity: usize,
}

impl fmt::Debug for QueueEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl QueueEventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: QueueEvent) {
        let _ = self.sender.send(event);
    }
}
