use std::time::Instant;

use showrunner_model::{EpisodeMap, EpisodeNumber};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, Result};
use crate::queue::{ItemHeader, ShowQueue};

use super::{RunOutcome, registered_show};

pub(super) async fn run(queue: &ShowQueue, header: &ItemHeader, force: bool) -> Result<RunOutcome> {
    let started = Instant::now();
    let services = queue.services();
    let mut show = registered_show(queue, header).await?;
    let key = show.key;
    let indexer = key.indexer.name();
    info!(target: "show_queue", show = %show.name, force, "performing updates for show");

    debug!(target: "show_queue", show = %show.name, indexer, "retrieving show info");
    let record = match services
        .metadata
        .lookup(key.indexer, key.indexer_id, &show.language, false)
        .await
    {
        Ok(record) => record,
        Err(err @ ProviderError::Unreachable(_)) => {
            warn!(
                target: "show_queue",
                show = %show.name,
                indexer,
                error = %err,
                "unable to contact indexer, aborting"
            );
            return Ok(RunOutcome::aborted(err.to_string()));
        }
        Err(err) => {
            error!(
                target: "show_queue",
                show = %show.name,
                indexer,
                error = %err,
                "data retrieved from indexer was incomplete, aborting"
            );
            return Ok(RunOutcome::aborted(err.to_string()));
        }
    };

    show.apply_record(&record);
    if let Err(err) = services.store.persist(&show).await {
        warn!(target: "show_queue", show = %show.name, error = %err, "failed to save updated show");
    } else if let Err(err) = services.registry.insert(show.clone()).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "failed to update show list entry"
        );
    }

    let local = services.store.load_episodes(&key).await?;
    match services.metadata.list_episodes(key.indexer, key.indexer_id).await {
        Ok(remote) => {
            let (keep, stale) = reconcile(&local, remote);
            if let Err(err) = services.store.save_episodes(&key, keep).await {
                warn!(
                    target: "show_queue",
                    show = %show.name,
                    error = %err,
                    "failed to store episode list"
                );
            }
            for number in stale {
                info!(
                    target: "show_queue",
                    show = %show.name,
                    episode = %number,
                    "permanently deleting episode"
                );
                if let Err(err) = services.store.delete_episode(&key, number).await {
                    warn!(
                        target: "show_queue",
                        show = %show.name,
                        episode = %number,
                        error = %err,
                        "failed to delete episode"
                    );
                }
            }
        }
        Err(err) => {
            error!(
                target: "show_queue",
                show = %show.name,
                indexer,
                error = %err,
                "no episode data returned, unable to update this show"
            );
        }
    }

    info!(
        target: "show_queue",
        show = %show.name,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "finished updates"
    );

    match queue.enqueue_follow_up_refresh(header, force).await {
        Ok(_) => {}
        Err(err) if err.is_admission() => {
            info!(
                target: "show_queue",
                show = %show.name,
                reason = %err,
                "follow-up refresh not queued"
            );
        }
        Err(err) => {
            warn!(
                target: "show_queue",
                show = %show.name,
                error = %err,
                "failed to queue follow-up refresh"
            );
        }
    }
    Ok(RunOutcome::Completed)
}

/// Splits the remote listing into episodes to save and local episodes to
/// delete. Saved episodes keep their local status, file and grouping;
/// provider-owned fields come from the remote copy.
pub(crate) fn reconcile(
    local: &EpisodeMap,
    remote: EpisodeMap,
) -> (EpisodeMap, Vec<EpisodeNumber>) {
    let stale = local.missing_from(&remote);
    let keep = remote
        .iter()
        .map(|fresh| match local.get(fresh.number) {
            Some(known) => {
                let mut merged = known.clone();
                merged.name = fresh.name.clone().or_else(|| known.name.clone());
                merged
            }
            None => fresh.clone(),
        })
        .collect();
    (keep, stale)
}
