use std::time::Instant;

use showrunner_model::{EpisodeStatus, ReleaseGroups, SeriesRecord, Show, ShowFlags};
use tracing::{debug, error, info, warn};

use crate::config::AddDefaults;
use crate::error::{QueueError, Result};
use crate::queue::{AddRequest, ItemHeader, ShowQueue};

use super::RunOutcome;

pub(super) async fn run(
    queue: &ShowQueue,
    header: &ItemHeader,
    request: &AddRequest,
) -> Result<RunOutcome> {
    let started = Instant::now();
    let services = queue.services();
    let config = queue.config();
    let key = request.key();
    let indexer = key.indexer.name();
    let dir = request.show_dir.display().to_string();

    info!(
        target: "show_queue",
        show = %header.display_name(),
        show_dir = %dir,
        "started adding show"
    );

    if services.registry.contains(&key).await? {
        warn!(target: "show_queue", show_dir = %dir, "show is already in the show list, skipping");
        services
            .notifier
            .error(
                "Show skipped",
                &format!("The show in {dir} is already in your show list"),
            )
            .await;
        return Ok(RunOutcome::aborted("already in the show list"));
    }

    let language = request
        .language
        .clone()
        .unwrap_or_else(|| config.defaults.language.clone());
    let record = match services
        .metadata
        .lookup(key.indexer, key.indexer_id, &language, false)
        .await
    {
        Ok(record) => record,
        Err(err) => {
            error!(
                target: "show_queue",
                show = %key,
                indexer,
                error = %err,
                "error while loading information from indexer"
            );
            services
                .notifier
                .error(
                    "Unable to add show",
                    &format!(
                        "Unable to look up the show in {dir} on {indexer} using ID {}, not using the NFO. Delete .nfo and try adding manually again.",
                        key.indexer_id
                    ),
                )
                .await;
            drop_from_watchlist(queue, header, request).await;
            return Ok(RunOutcome::aborted(err.to_string()));
        }
    };

    let Some(name) = record.display_name().map(str::to_owned) else {
        error!(
            target: "show_queue",
            show_dir = %dir,
            indexer,
            "show has no name on indexer, probably the wrong language used to search with"
        );
        services
            .notifier
            .error(
                "Unable to add show",
                &format!(
                    "Show in {dir} has no name on {indexer}, probably the wrong language. Delete .nfo and add manually in the correct language"
                ),
            )
            .await;
        return Ok(RunOutcome::aborted("show has no name"));
    };

    if !record.has_episodes() {
        let message =
            format!("Show {name} is on {indexer} but contains no season/episode data.");
        error!(target: "show_queue", show = %key, "{message}");
        services.notifier.error("Unable to add show", &message).await;
        return Ok(RunOutcome::aborted(message));
    }

    let mut show = build_show(&record, name, language, request, &config.defaults);
    info!(
        target: "show_queue",
        show = %show.name,
        status = ?show.default_ep_status,
        "setting all current episodes to the requested default status"
    );
    queue.resolve_current(header.id, key).await;

    if let Err(err) = register(queue, &show).await {
        error!(target: "show_queue", show = %show.name, error = %err, "error saving the show");
        return roll_back(queue, show, err).await;
    }

    match services.metadata.list_episodes(key.indexer, key.indexer_id).await {
        Ok(episodes) => {
            if let Err(err) = services.store.save_episodes(&key, episodes).await {
                error!(
                    target: "show_queue",
                    show = %show.name,
                    error = %err,
                    "failed to store episode list"
                );
            }
        }
        Err(err) => {
            error!(
                target: "show_queue",
                show = %show.name,
                indexer,
                error = %err,
                "error with indexer, not creating episode list"
            );
        }
    }
    if let Err(err) = services.media.scan_episodes_from_dir(&show).await {
        debug!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "error searching dir for episodes"
        );
    }

    if show.default_ep_status == EpisodeStatus::Wanted {
        info!(
            target: "show_queue",
            show = %show.name,
            "launching backlog for this show since its episodes are wanted"
        );
        if let Err(err) = services.backlog.search_backlog(&show).await {
            warn!(target: "show_queue", show = %show.name, error = %err, "backlog search failed");
        }
    }

    if let Err(err) = services.media.write_metadata(&show).await {
        warn!(target: "show_queue", show = %show.name, error = %err, "failed to write metadata");
    }
    if let Err(err) = services.media.update_metadata(&show).await {
        warn!(target: "show_queue", show = %show.name, error = %err, "failed to update metadata");
    }
    if let Err(err) = services.media.populate_cache(&show, false).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "failed to populate image cache"
        );
    }

    sync_new_show(queue, &show).await;

    if let Err(err) = services.scene.refresh(&key, true).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "scene numbering refresh failed"
        );
    }
    if request.scene.is_none() {
        match services.scene.has_mapping(&key).await {
            Ok(true) => show.flags.scene = true,
            Ok(false) => {}
            Err(err) => {
                debug!(
                    target: "show_queue",
                    show = %show.name,
                    error = %err,
                    "scene mapping check failed"
                );
            }
        }
    }

    if let Some(status) = request.default_status_after {
        show.default_ep_status = status;
    }
    if let Err(err) = register(queue, &show).await {
        error!(target: "show_queue", show = %show.name, error = %err, "error saving the show");
        return roll_back(queue, show, err).await;
    }

    info!(
        target: "show_queue",
        show = %show.name,
        show_dir = %dir,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "finished adding show"
    );
    Ok(RunOutcome::Completed)
}

/// Request values win; unset ones fall back to the configured defaults.
fn build_show(
    record: &SeriesRecord,
    name: String,
    language: String,
    request: &AddRequest,
    defaults: &AddDefaults,
) -> Show {
    let mut show = Show::from_record(record, name, language, request.show_dir.clone());
    show.quality = request.quality.unwrap_or(defaults.quality);
    show.default_ep_status = request.default_status.unwrap_or_default();
    show.flags = ShowFlags {
        subtitles: request.subtitles.unwrap_or(defaults.subtitles),
        subtitles_sr_metadata: request.subtitles_sr_metadata,
        flatten_folders: request.flatten_folders.unwrap_or(defaults.flatten_folders),
        anime: request.anime.unwrap_or(defaults.anime),
        scene: request.scene.unwrap_or(defaults.scene),
        archive_firstmatch: request.archive.unwrap_or(defaults.archive_firstmatch),
        paused: request.paused.unwrap_or(false),
    };
    if show.flags.anime {
        show.release_groups = Some(ReleaseGroups {
            blacklist: request.blacklist.clone(),
            whitelist: request.whitelist.clone(),
        });
    }
    show
}

async fn register(queue: &ShowQueue, show: &Show) -> Result<()> {
    let services = queue.services();
    services.store.persist(show).await?;
    services.registry.insert(show.clone()).await
}

/// Queues removal of a half-built show, then reports the original error.
async fn roll_back(queue: &ShowQueue, show: Show, cause: QueueError) -> Result<RunOutcome> {
    let name = show.name.clone();
    if let Err(err) = queue.enqueue_rollback_remove(show).await {
        warn!(
            target: "show_queue",
            show = %name,
            error = %err,
            "could not queue removal of partially added show"
        );
    }
    Err(cause)
}

async fn drop_from_watchlist(queue: &ShowQueue, header: &ItemHeader, request: &AddRequest) {
    let sync = queue.config().library_sync;
    let Some(service) = queue.services().library_sync.as_ref() else {
        return;
    };
    if !(sync.enabled && sync.sync_watchlist) {
        return;
    }
    let title = header.display_name();
    if let Err(err) = service.remove_from_watchlist(&title, &request.key()).await {
        warn!(
            target: "show_queue",
            show = %title,
            error = %err,
            "failed to remove show from watchlist"
        );
    }
}

async fn sync_new_show(queue: &ShowQueue, show: &Show) {
    let sync = queue.config().library_sync;
    let Some(service) = queue.services().library_sync.as_ref() else {
        return;
    };
    if !sync.enabled {
        return;
    }

    if let Err(err) = service.manage_new_show(show).await {
        warn!(
            target: "show_queue",
            show = %show.name,
            error = %err,
            "library sync rejected new show"
        );
    }
    if sync.sync_library {
        if let Err(err) = service.add_to_library(show).await {
            warn!(
                target: "show_queue",
                show = %show.name,
                error = %err,
                "failed to add show to library"
            );
        }
    }
    if sync.sync_watchlist {
        info!(target: "show_queue", show = %show.name, "updating watchlist");
        if let Err(err) = service.update_watchlist(show).await {
            warn!(
                target: "show_queue",
                show = %show.name,
                error = %err,
                "failed to update watchlist"
            );
        }
    }
}
