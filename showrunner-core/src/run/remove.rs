use showrunner_model::Show;
use tracing::{info, warn};

use crate::error::Result;
use crate::queue::ShowQueue;

use super::RunOutcome;

/// Works from the snapshot taken at request time, so it also cleans up a
/// show that never made it into the show list.
pub(super) async fn run(queue: &ShowQueue, show: &Show, full: bool) -> Result<RunOutcome> {
    let services = queue.services();
    info!(target: "show_queue", show = %show.name, full, "removing show");

    services.store.delete(show, full).await?;
    services.registry.remove(&show.key).await?;

    let sync = queue.config().library_sync;
    if let Some(service) = services.library_sync.as_ref().filter(|_| sync.enabled) {
        if let Err(err) = service.remove_from_library(show).await {
            warn!(
                target: "show_queue",
                show = %show.name,
                error = %err,
                "unable to delete show from library sync service"
            );
        }
    }

    info!(target: "show_queue", show = %show.name, "finished removing show");
    Ok(RunOutcome::Completed)
}
