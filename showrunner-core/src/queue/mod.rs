//! The show queue: admission control, a priority-ordered pending set, a
//! single current item and the worker that drains it.

pub mod action;
pub mod events;
pub mod item;
pub mod runtime;
pub mod show_queue;

pub use action::{ActionKind, QueuePriority};
pub use events::{QueueEvent, QueueEventBus};
pub use item::{AddRequest, ItemHeader, ItemId, ItemPayload, ItemState, QueueItem, QueueTicket};
pub use runtime::ShowQueueRuntime;
pub use show_queue::{Dispatched, LoadingShow, QueueSnapshot, ShowQueue};
