//! # Showrunner Core
//!
//! A single-flight, priority-ordered work queue for tracked TV shows.
//!
//! Every mutating action on a show (adding it, refreshing it from disk,
//! updating it from its indexer, renaming episode files, fetching
//! subtitles, removing it) goes through one [`ShowQueue`]. The queue:
//!
//! - rejects requests that conflict with work already pending or running
//!   for the same show ([`QueueError::CantUpdate`] and friends),
//! - orders pending work by [`QueuePriority`] and then by arrival,
//! - runs exactly one item at a time, so run procedures never race on a
//!   show's state.
//!
//! The collaborators an item drives (metadata provider, entity store,
//! registry, media layer, notifier...) are injected through
//! [`QueueServices`]; see [`ports`] for the contracts and in-memory
//! implementations.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use showrunner_core::ports::{
//!     InMemoryEntityStore, InMemoryShowRegistry, QueueServices, StaticMetadataProvider,
//! };
//! use showrunner_core::{AddRequest, ShowQueue, ShowQueueConfig, ShowQueueRuntime};
//! use showrunner_model::Indexer;
//!
//! # async fn demo() -> showrunner_core::Result<()> {
//! let services = QueueServices::new(
//!     Arc::new(StaticMetadataProvider::new()),
//!     Arc::new(InMemoryEntityStore::new()),
//!     Arc::new(InMemoryShowRegistry::new()),
//! );
//! let queue = Arc::new(ShowQueue::new(ShowQueueConfig::default(), services));
//! let runtime = ShowQueueRuntime::new(Arc::clone(&queue));
//! runtime.start().await?;
//!
//! let mut ticket = queue
//!     .request_add(AddRequest::new(Indexer::Tvdb, 81189, "/tv/Breaking Bad"))
//!     .await?;
//! ticket.wait().await;
//! runtime.shutdown().await?;
//! # Ok(())
//! # }
//! ```
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod ports;
pub mod queue;
pub mod run;

pub use config::{AddDefaults, LibrarySyncConfig, ShowQueueConfig};
pub use error::{ProviderError, QueueError, Result};
pub use ports::QueueServices;
pub use queue::{
    ActionKind, AddRequest, Dispatched, ItemHeader, ItemId, ItemState, LoadingShow,
    QueueEvent, QueuePriority, QueueSnapshot, QueueTicket, ShowQueue, ShowQueueRuntime,
};
pub use run::{RunOutcome, rename_targets};
