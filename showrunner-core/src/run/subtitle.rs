use std::time::Instant;

use tracing::{info, warn};

use crate::error::Result;
use crate::queue::{ItemHeader, ShowQueue};

use super::{RunOutcome, registered_show};

/// Always completes; a failed fetch is only reported.
pub(super) async fn run(queue: &ShowQueue, header: &ItemHeader) -> Result<RunOutcome> {
    let started = Instant::now();
    let services = queue.services();
    let show = registered_show(queue, header).await?;
    info!(target: "show_queue", show = %show.name, "started downloading subtitles for show");

    if let Err(err) = services.media.download_subtitles(&show).await {
        warn!(target: "show_queue", show = %show.name, error = %err, "subtitle download failed");
        services
            .notifier
            .error(
                "Subtitle download failed",
                &format!("Unable to download subtitles for {}: {err}", show.name),
            )
            .await;
    }

    info!(
        target: "show_queue",
        show = %show.name,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "finished downloading subtitles"
    );
    Ok(RunOutcome::Completed)
}
