use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::Result;
use crate::queue::{ItemHeader, ShowQueue};

use super::{RunOutcome, registered_show};

/// Every step is best-effort; a show without a directory still gets its
/// refresh stamp.
pub(super) async fn run(queue: &ShowQueue, header: &ItemHeader, force: bool) -> Result<RunOutcome> {
    let started = Instant::now();
    let services = queue.services();
    let mut show = registered_show(queue, header).await?;
    info!(target: "show_queue", show = %show.name, force, "performing refresh for show");

    if !services.media.directory_exists(&show.location).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            location = %show.location.display(),
            "show directory is missing, refreshing what remains"
        );
    }
    if let Err(err) = services.media.refresh_dir(&show).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "failed to rescan show directory"
        );
    }
    if let Err(err) = services.media.write_metadata(&show).await {
        warn!(target: "show_queue", show = %show.name, error = %err, "failed to write metadata");
    }
    if force {
        if let Err(err) = services.media.update_metadata(&show).await {
            warn!(
                target: "show_queue",
                show = %show.name,
                error = %err,
                "failed to update metadata"
            );
        }
    }
    if let Err(err) = services.media.populate_cache(&show, force).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "failed to populate image cache"
        );
    }
    if let Err(err) = services.scene.refresh(&show.key, false).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "scene numbering refresh failed"
        );
    }

    show.last_refresh = Some(Utc::now().date_naive());
    if let Err(err) = services.store.persist(&show).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "failed to save refreshed show"
        );
    } else if let Err(err) = services.registry.insert(show.clone()).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "failed to update show list entry"
        );
    }

    info!(
        target: "show_queue",
        show = %show.name,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "finished refresh"
    );
    Ok(RunOutcome::Completed)
}
