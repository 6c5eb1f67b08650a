use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use showrunner_core::ports::{
    EntityStore, InMemoryEntityStore, InMemoryShowRegistry, LibrarySync, RecordingNotifier,
    ShowMedia, ShowRegistry, StaticMetadataProvider,
};
use showrunner_core::{
    ActionKind, AddRequest, ItemState, LibrarySyncConfig, ProviderError, QueueEvent,
    QueueServices, ShowQueue, ShowQueueConfig, ShowQueueRuntime,
};
use showrunner_model::{
    EpisodeMap, EpisodeNumber, EpisodeRecord, EpisodeStatus, Indexer, SeriesRecord, Show,
    ShowKey,
};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Default)]
struct RecordingMedia {
    renamed: Arc<Mutex<Vec<EpisodeNumber>>>,
    refreshed: Arc<Mutex<Vec<ShowKey>>>,
    broken_subtitles: Arc<AtomicBool>,
}

#[async_trait]
impl ShowMedia for RecordingMedia {
    async fn refresh_dir(&self, show: &Show) -> showrunner_core::Result<()> {
        self.refreshed.lock().await.push(show.key);
        Ok(())
    }

    async fn scan_episodes_from_dir(&self, _show: &Show) -> showrunner_core::Result<()> {
        Ok(())
    }

    async fn write_metadata(&self, _show: &Show) -> showrunner_core::Result<()> {
        Ok(())
    }

    async fn update_metadata(&self, _show: &Show) -> showrunner_core::Result<()> {
        Ok(())
    }

    async fn populate_cache(&self, _show: &Show, _force: bool) -> showrunner_core::Result<()> {
        Ok(())
    }

    async fn rename_episode(
        &self,
        _show: &Show,
        episode: &EpisodeRecord,
    ) -> showrunner_core::Result<()> {
        self.renamed.lock().await.push(episode.number);
        Ok(())
    }

    async fn download_subtitles(&self, show: &Show) -> showrunner_core::Result<()> {
        if self.broken_subtitles.load(Ordering::SeqCst) {
            panic!("subtitle provider crashed on {}", show.key);
        }
        Err(showrunner_core::QueueError::Internal("no subtitle providers".into()))
    }
}

#[derive(Clone, Default)]
struct RecordingSync {
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LibrarySync for RecordingSync {
    async fn manage_new_show(&self, show: &Show) -> showrunner_core::Result<()> {
        self.calls.lock().await.push(format!("manage {}", show.key));
        Ok(())
    }

    async fn add_to_library(&self, show: &Show) -> showrunner_core::Result<()> {
        self.calls.lock().await.push(format!("library {}", show.key));
        Ok(())
    }

    async fn remove_from_library(&self, show: &Show) -> showrunner_core::Result<()> {
        self.calls.lock().await.push(format!("unlibrary {}", show.key));
        Err(showrunner_core::QueueError::Sync("service offline".into()))
    }

    async fn update_watchlist(&self, show: &Show) -> showrunner_core::Result<()> {
        self.calls.lock().await.push(format!("watchlist {}", show.key));
        Ok(())
    }

    async fn remove_from_watchlist(
        &self,
        title: &str,
        key: &ShowKey,
    ) -> showrunner_core::Result<()> {
        self.calls.lock().await.push(format!("unwatch {title} {key}"));
        Ok(())
    }
}

struct Harness {
    queue: Arc<ShowQueue>,
    metadata: StaticMetadataProvider,
    store: InMemoryEntityStore,
    registry: InMemoryShowRegistry,
    notifier: RecordingNotifier,
    media: RecordingMedia,
    sync: RecordingSync,
}

fn harness() -> Harness {
    harness_with(ShowQueueConfig::default())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn harness_with(config: ShowQueueConfig) -> Harness {
    init_tracing();
    let metadata = StaticMetadataProvider::new();
    let store = InMemoryEntityStore::new();
    let registry = InMemoryShowRegistry::new();
    let notifier = RecordingNotifier::new();
    let media = RecordingMedia::default();
    let sync = RecordingSync::default();

    let services = QueueServices::new(
        Arc::new(metadata.clone()),
        Arc::new(store.clone()),
        Arc::new(registry.clone()),
    )
    .with_media(Arc::new(media.clone()))
    .with_notifier(Arc::new(notifier.clone()))
    .with_library_sync(Arc::new(sync.clone()));

    Harness {
        queue: Arc::new(ShowQueue::new(config, services)),
        metadata,
        store,
        registry,
        notifier,
        media,
        sync,
    }
}

async fn track(h: &Harness, id: u64, location: &Path) -> Show {
    let record = SeriesRecord::new(Indexer::Tvdb, id, format!("Show {id}")).with_season(1, 2);
    let show = Show::from_record(&record, format!("Show {id}"), "en", location);
    h.metadata.insert_series(record).await;
    h.store.persist(&show).await.expect("persist");
    h.registry.insert(show.clone()).await.expect("register");
    show
}

fn episodes(numbers: &[(u32, u32)]) -> EpisodeMap {
    numbers
        .iter()
        .map(|&(season, episode)| EpisodeRecord::new(season, episode))
        .collect()
}

#[tokio::test]
async fn update_deletes_local_only_episodes_and_chains_a_refresh() {
    let h = harness();
    let show = track(&h, 100, Path::new("/tv/Show 100")).await;
    h.store
        .save_episodes(&show.key, episodes(&[(1, 1), (1, 2)]))
        .await
        .expect("seed episodes");
    h.metadata.insert_episodes(show.key, episodes(&[(1, 1)])).await;

    let mut ticket = h.queue.request_update(show.key, false).await.expect("update");
    let dispatched = h.queue.run_next().await.expect("update ran");

    assert_eq!(dispatched.state, ItemState::Finished);
    assert_eq!(ticket.wait().await, ItemState::Finished);
    let stored = h.store.episodes(&show.key).await;
    assert!(stored.contains(EpisodeNumber::new(1, 1)));
    assert!(!stored.contains(EpisodeNumber::new(1, 2)));

    let snapshot = h.queue.snapshot().await;
    assert_eq!(snapshot.pending.len(), 1);
    assert_eq!(snapshot.pending[0].kind, ActionKind::Refresh);
    assert_eq!(snapshot.pending[0].subject, show.key);
    assert!(!snapshot.pending[0].force);
    assert_eq!(h.store.flush_count(&show.key).await, 1);
}

#[tokio::test]
async fn forced_update_chains_a_forced_refresh() {
    let h = harness();
    let show = track(&h, 101, Path::new("/tv/Show 101")).await;

    h.queue.request_update(show.key, true).await.expect("update");
    h.queue.run_next().await.expect("update ran");

    let snapshot = h.queue.snapshot().await;
    assert_eq!(snapshot.pending.len(), 1);
    assert!(snapshot.pending[0].force);

    let refresh = h.queue.run_next().await.expect("refresh ran");
    assert_eq!(refresh.state, ItemState::Finished);
    assert_eq!(h.media.refreshed.lock().await.as_slice(), &[show.key]);
    let refreshed = h.registry.get(&show.key).await.expect("get").expect("show");
    assert!(refreshed.last_refresh.is_some());
}

#[tokio::test]
async fn update_without_episode_listing_still_refreshes() {
    let h = harness();
    let show = track(&h, 102, Path::new("/tv/Show 102")).await;
    h.store
        .save_episodes(&show.key, episodes(&[(1, 1), (1, 2)]))
        .await
        .expect("seed episodes");
    let unreachable = ProviderError::Unreachable("timeout".into());
    h.metadata.fail_episodes(show.key, unreachable).await;

    h.queue.request_update(show.key, false).await.expect("update");
    h.queue.run_next().await.expect("update ran");

    assert_eq!(h.store.episodes(&show.key).await.len(), 2);
    assert!(h.queue.is_in_refresh_queue(&show.key).await);
}

#[tokio::test]
async fn unreachable_indexer_aborts_update_without_refresh() {
    let h = harness();
    let show = track(&h, 103, Path::new("/tv/Show 103")).await;
    let unreachable = ProviderError::Unreachable("connection refused".into());
    h.metadata.fail_series(show.key, unreachable).await;

    h.queue.request_update(show.key, false).await.expect("update");
    let dispatched = h.queue.run_next().await.expect("update ran");

    assert_eq!(dispatched.state, ItemState::Failed);
    assert!(h.queue.is_idle().await);
    // finish still flushes
    assert_eq!(h.store.flush_count(&show.key).await, 1);
}

#[tokio::test]
async fn add_with_no_episodes_creates_nothing() {
    let h = harness();
    let record = SeriesRecord::new(Indexer::Tvmaze, 7, "Empty Show");
    let key = record.key();
    h.metadata.insert_series(record).await;

    let mut ticket = h
        .queue
        .request_add(AddRequest::new(Indexer::Tvmaze, 7, "/tv/Empty Show"))
        .await
        .expect("add");
    h.queue.run_next().await.expect("add ran");

    assert_eq!(ticket.wait().await, ItemState::Failed);
    assert!(h.store.show(&key).await.is_none());
    assert!(h.registry.is_empty().await);
    let sent = h.notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Unable to add show");
    assert!(sent[0].message.contains("no season/episode data"));
}

#[tokio::test]
async fn add_registers_show_with_request_options() {
    let config = ShowQueueConfig {
        library_sync: LibrarySyncConfig {
            enabled: true,
            sync_library: true,
            sync_watchlist: false,
        },
        ..ShowQueueConfig::default()
    };
    let h = harness_with(config);
    let record = SeriesRecord::new(Indexer::Tvdb, 81189, "Breaking Bad").with_season(1, 7);
    let key = record.key();
    h.metadata.insert_series(record).await;
    h.metadata.insert_episodes(key, episodes(&[(1, 1), (1, 2), (1, 3)])).await;

    let mut request = AddRequest::new(Indexer::Tvdb, 81189, "/tv/Breaking Bad");
    request.default_status = Some(EpisodeStatus::Wanted);
    request.default_status_after = Some(EpisodeStatus::Skipped);
    request.anime = Some(true);
    request.blacklist = vec!["badgroup".into()];
    h.queue.request_add(request).await.expect("add");
    assert_eq!(h.queue.loading_shows().await.len(), 1);

    let dispatched = h.queue.run_next().await.expect("add ran");

    assert_eq!(dispatched.state, ItemState::Finished);
    assert_eq!(dispatched.item.show, Some(key));
    let show = h.registry.get(&key).await.expect("get").expect("registered");
    assert_eq!(show.name, "Breaking Bad");
    assert_eq!(show.default_ep_status, EpisodeStatus::Skipped);
    assert!(show.flags.anime);
    assert_eq!(
        show.release_groups.as_ref().map(|groups| groups.blacklist.clone()),
        Some(vec!["badgroup".to_string()])
    );
    assert_eq!(h.store.show(&key).await, Some(show));
    assert_eq!(h.store.episodes(&key).await.len(), 3);
    assert_eq!(h.store.flush_count(&key).await, 1);
    assert!(h.queue.loading_shows().await.is_empty());
    assert_eq!(
        h.sync.calls.lock().await.as_slice(),
        &[format!("manage {key}"), format!("library {key}")]
    );
}

#[tokio::test]
async fn add_of_a_tracked_show_is_skipped() {
    let h = harness();
    let show = track(&h, 104, Path::new("/tv/Show 104")).await;

    h.queue
        .request_add(AddRequest::new(Indexer::Tvdb, 104, "/tv/Elsewhere"))
        .await
        .expect("add");
    let dispatched = h.queue.run_next().await.expect("add ran");

    assert_eq!(dispatched.state, ItemState::Failed);
    let sent = h.notifier.sent().await;
    assert_eq!(sent[0].title, "Show skipped");
    let kept = h.registry.get(&show.key).await.expect("get").expect("show");
    assert_eq!(kept.location, show.location);
}

#[tokio::test]
async fn failed_lookup_drops_show_from_watchlist() {
    let config = ShowQueueConfig {
        library_sync: LibrarySyncConfig {
            enabled: true,
            sync_library: false,
            sync_watchlist: true,
        },
        ..ShowQueueConfig::default()
    };
    let h = harness_with(config);

    h.queue
        .request_add(AddRequest::new(Indexer::Tmdb, 1396, "/tv/Missing"))
        .await
        .expect("add");
    let dispatched = h.queue.run_next().await.expect("add ran");

    assert_eq!(dispatched.state, ItemState::Failed);
    assert_eq!(
        h.sync.calls.lock().await.as_slice(),
        &["unwatch Missing tmdb:1396".to_string()]
    );
    assert!(h.notifier.sent().await[0].message.contains("using ID 1396"));
}

#[tokio::test]
async fn add_persist_failure_rolls_back_through_remove() {
    let h = harness();
    let record = SeriesRecord::new(Indexer::Tvdb, 5, "Fragile").with_season(1, 1);
    let key = record.key();
    h.metadata.insert_series(record).await;
    h.store.reject_persist(true).await;

    h.queue
        .request_add(AddRequest::new(Indexer::Tvdb, 5, "/tv/Fragile"))
        .await
        .expect("add");
    let add = h.queue.run_next().await.expect("add ran");
    assert_eq!(add.state, ItemState::Failed);
    assert!(h.queue.is_in_remove_queue(&key).await);

    let remove = h.queue.run_next().await.expect("rollback ran");
    assert_eq!(remove.item.kind, ActionKind::Remove);
    assert_eq!(remove.state, ItemState::Finished);
    assert_eq!(h.store.deleted().await, vec![(key, false)]);
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn remove_survives_library_sync_failure() {
    let config = ShowQueueConfig {
        library_sync: LibrarySyncConfig {
            enabled: true,
            ..LibrarySyncConfig::default()
        },
        ..ShowQueueConfig::default()
    };
    let h = harness_with(config);
    let show = track(&h, 105, Path::new("/tv/Show 105")).await;

    h.queue.request_remove(show.key, true).await.expect("remove");
    let dispatched = h.queue.run_next().await.expect("remove ran");

    assert_eq!(dispatched.state, ItemState::Finished);
    assert_eq!(h.store.deleted().await, vec![(show.key, true)]);
    assert!(h.registry.get(&show.key).await.expect("get").is_none());
    assert_eq!(h.sync.calls.lock().await.as_slice(), &[format!("unlibrary {}", show.key)]);
}

#[tokio::test]
async fn rename_without_show_directory_is_aborted() {
    let h = harness();
    let show = track(&h, 106, Path::new("/definitely/not/here")).await;

    h.queue.request_rename(show.key).await.expect("rename");
    let dispatched = h.queue.run_next().await.expect("rename ran");

    assert_eq!(dispatched.state, ItemState::Failed);
    assert!(h.media.renamed.lock().await.is_empty());
    assert_eq!(h.notifier.sent().await[0].title, "Rename skipped");
}

#[tokio::test]
async fn subtitle_failure_still_finishes() {
    let h = harness();
    let show = track(&h, 107, Path::new("/tv/Show 107")).await;

    h.queue.request_subtitle_download(show.key).await.expect("subtitle");
    let dispatched = h.queue.run_next().await.expect("subtitle ran");

    assert_eq!(dispatched.state, ItemState::Finished);
    assert_eq!(h.notifier.sent().await.len(), 1);
}

#[tokio::test]
async fn runtime_drains_the_queue_in_order() -> anyhow::Result<()> {
    let h = harness();
    let dir = tempfile::tempdir()?;
    let show = track(&h, 108, dir.path()).await;
    let file = dir.path().join("s01e01-e02.mkv");
    h.store
        .save_episodes(
            &show.key,
            [
                EpisodeRecord::new(1, 1)
                    .with_location(&file)
                    .with_related(vec![EpisodeNumber::new(1, 2)]),
                EpisodeRecord::new(1, 2)
                    .with_location(&file)
                    .with_related(vec![EpisodeNumber::new(1, 1)]),
            ]
            .into_iter()
            .collect(),
        )
        .await?;

    let runtime = ShowQueueRuntime::new(Arc::clone(&h.queue));
    runtime.start().await?;

    let mut rename = h.queue.request_rename(show.key).await?;
    let mut refresh = h.queue.request_refresh(show.key, false).await?;

    let states = tokio::time::timeout(Duration::from_secs(5), async {
        (rename.wait().await, refresh.wait().await)
    })
    .await?;

    assert_eq!(states, (ItemState::Finished, ItemState::Finished));
    assert_eq!(h.media.renamed.lock().await.as_slice(), &[EpisodeNumber::new(1, 1)]);
    runtime.shutdown().await?;
    assert!(h.queue.is_idle().await);
    assert!(runtime.start().await.is_err());
    Ok(())
}

#[tokio::test]
async fn refresh_queued_ahead_of_an_update_is_discarded() {
    let h = harness();
    let show = track(&h, 109, Path::new("/tv/Show 109")).await;
    let mut events = h.queue.subscribe();

    let mut refresh = h.queue.request_refresh(show.key, false).await.expect("refresh");
    let update = h.queue.request_update(show.key, false).await.expect("update");

    let mut dispatched = Vec::new();
    while let Some(done) = h.queue.run_next().await {
        dispatched.push((done.item.kind, done.state));
    }

    assert_eq!(refresh.wait().await, ItemState::Failed);
    assert_eq!(
        dispatched,
        vec![
            (ActionKind::Update, ItemState::Finished),
            (ActionKind::Refresh, ItemState::Finished),
        ]
    );
    assert_eq!(h.media.refreshed.lock().await.as_slice(), &[show.key]);

    let mut discarded = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let QueueEvent::Discarded { item, .. } = event {
            discarded.push(item.id);
        }
    }
    assert_eq!(discarded, vec![refresh.id()]);
    assert_ne!(discarded[0], update.id());
}

#[tokio::test]
async fn panicking_collaborator_fails_the_item_and_frees_the_queue() {
    let h = harness();
    let show = track(&h, 110, Path::new("/tv/Show 110")).await;
    h.media.broken_subtitles.store(true, Ordering::SeqCst);

    let mut subtitle = h.queue.request_subtitle_download(show.key).await.expect("subtitle");
    let mut refresh = h.queue.request_refresh(show.key, false).await.expect("refresh");

    let crashed = h.queue.run_next().await.expect("subtitle ran");
    assert_eq!(crashed.item.kind, ActionKind::Subtitle);
    assert_eq!(crashed.state, ItemState::Failed);
    assert_eq!(subtitle.wait().await, ItemState::Failed);
    assert!(!h.queue.is_being_subtitled(&show.key).await);
    assert_eq!(h.store.flush_count(&show.key).await, 1);

    let next = h.queue.run_next().await.expect("refresh ran");
    assert_eq!(next.state, ItemState::Finished);
    assert_eq!(refresh.wait().await, ItemState::Finished);
    assert!(h.queue.is_idle().await);
}

#[tokio::test]
async fn runtime_keeps_draining_after_a_collaborator_panics() -> anyhow::Result<()> {
    let h = harness();
    let show = track(&h, 111, Path::new("/tv/Show 111")).await;
    h.media.broken_subtitles.store(true, Ordering::SeqCst);

    let runtime = ShowQueueRuntime::new(Arc::clone(&h.queue));
    runtime.start().await?;

    let mut subtitle = h.queue.request_subtitle_download(show.key).await?;
    let mut refresh = h.queue.request_refresh(show.key, false).await?;

    let states = tokio::time::timeout(Duration::from_secs(5), async {
        (subtitle.wait().await, refresh.wait().await)
    })
    .await?;

    assert_eq!(states, (ItemState::Failed, ItemState::Finished));
    runtime.shutdown().await?;
    assert!(h.queue.is_idle().await);
    Ok(())
}
