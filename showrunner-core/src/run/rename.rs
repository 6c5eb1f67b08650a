use std::collections::BTreeSet;
use std::time::Instant;

use showrunner_model::{EpisodeMap, EpisodeRecord};
use tracing::{info, warn};

use crate::error::Result;
use crate::queue::{ItemHeader, ShowQueue};

use super::{RunOutcome, registered_show};

pub(super) async fn run(queue: &ShowQueue, header: &ItemHeader) -> Result<RunOutcome> {
    let started = Instant::now();
    let services = queue.services();
    let show = registered_show(queue, header).await?;
    info!(target: "show_queue", show = %show.name, "performing renames for show");

    if !services.media.directory_exists(&show.location).await {
        let message = format!(
            "Can't perform rename on {} when the show dir is missing.",
            show.name
        );
        warn!(
            target: "show_queue",
            show = %show.name,
            location = %show.location.display(),
            "{message}"
        );
        services.notifier.error("Rename skipped", &message).await;
        return Ok(RunOutcome::aborted(message));
    }

    let episodes = services.store.load_episodes(&show.key).await?;
    let targets = rename_targets(&episodes);
    let mut failed = 0usize;
    for episode in &targets {
        if let Err(err) = services.media.rename_episode(&show, episode).await {
            failed += 1;
            warn!(
                target: "show_queue",
                show = %show.name,
                episode = %episode.number,
                error = %err,
                "failed to rename episode"
            );
        }
    }

    info!(
        target: "show_queue",
        show = %show.name,
        renamed = targets.len() - failed,
        failed,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "finished renames"
    );
    Ok(RunOutcome::Completed)
}

/// Episodes to rename, one per file on disk. An episode sharing a file
/// with one already picked (through either side's related list) is
/// skipped.
pub fn rename_targets(episodes: &EpisodeMap) -> Vec<EpisodeRecord> {
    let mut claimed = BTreeSet::new();
    let mut targets = Vec::new();
    for episode in episodes.iter().filter(|e| e.location.is_some()) {
        let already = claimed.contains(&episode.number)
            || episode.related.iter().any(|number| claimed.contains(number));
        if already {
            continue;
        }
        claimed.insert(episode.number);
        claimed.extend(episode.related.iter().copied());
        targets.push(episode.clone());
    }
    targets
}
