//! Run procedures, one per action kind, behind a single [`execute`] entry
//! point. Soft failures come back as [`RunOutcome::Aborted`]; an `Err` is a
//! structural failure the item could not recover from.

mod add;
mod refresh;
mod remove;
mod rename;
mod subtitle;
mod update;

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use showrunner_model::Show;
use tracing::{error, warn};

use crate::error::{QueueError, Result};
use crate::queue::{ItemHeader, ItemPayload, QueueItem, ShowQueue};

pub use rename::rename_targets;

/// How a run procedure ended when it did not return an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Stopped early on a soft failure that was already logged and, where
    /// the user needs to know, notified.
    Aborted { reason: String },
}

impl RunOutcome {
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted { reason: reason.into() }
    }
}

/// Runs the item's procedure. A panic inside it, or inside a collaborator it
/// calls, is caught and reported as an internal error.
pub(crate) async fn execute(queue: &ShowQueue, item: &QueueItem) -> Result<RunOutcome> {
    match AssertUnwindSafe(dispatch(queue, item)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(QueueError::Internal(format!(
            "run procedure panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

async fn dispatch(queue: &ShowQueue, item: &QueueItem) -> Result<RunOutcome> {
    let header = item.header();
    match item.payload() {
        ItemPayload::Add(request) => add::run(queue, header, request).await,
        ItemPayload::Refresh { force } => refresh::run(queue, header, *force).await,
        ItemPayload::Update { force } => update::run(queue, header, *force).await,
        ItemPayload::Rename => rename::run(queue, header).await,
        ItemPayload::Subtitle => subtitle::run(queue, header).await,
        ItemPayload::Remove { show, full } => remove::run(queue, show, *full).await,
    }
}

/// Shared tail of every item: flush buffered episode state for the show,
/// whatever the run procedure returned.
pub(crate) async fn finish(queue: &ShowQueue, header: &ItemHeader) {
    let Some(key) = header.show else {
        return;
    };
    let flush = queue.services().store.flush_episodes(&key);
    match AssertUnwindSafe(flush).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            warn!(target: "show_queue", show = %key, error = %err, "failed to flush episode state");
        }
        Err(panic) => {
            error!(
                target: "show_queue",
                show = %key,
                panic = %panic_message(panic.as_ref()),
                "episode flush panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Loads the registered show an item refers to. Dispatch already checked
/// registration, so absence here means it vanished mid-flight.
async fn registered_show(queue: &ShowQueue, header: &ItemHeader) -> Result<Show> {
    queue.services().registry.get(&header.subject).await?.ok_or_else(|| {
        QueueError::Internal(format!("{} disappeared from the show list", header.subject))
    })
}
