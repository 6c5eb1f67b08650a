use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use showrunner_model::{Show, ShowKey};
use tokio::sync::{Mutex, Notify, broadcast};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::ShowQueueConfig;
use crate::error::{QueueError, Result};
use crate::ports::QueueServices;
use crate::run::{self, RunOutcome};

use super::action::{
    ADD_ACTIONS, ActionKind, QueuePriority, REFRESH_ACTIONS, REMOVE_ACTIONS, RENAME_ACTIONS,
    SUBTITLE_ACTIONS, UPDATE_ACTIONS,
};
use super::events::{QueueEvent, QueueEventBus};
use super::item::{AddRequest, ItemHeader, ItemId, ItemPayload, ItemState, QueueItem, QueueTicket};

/// Ordering key of the pending set: highest tier first, then FIFO.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct PendingKey {
    priority: Reverse<QueuePriority>,
    sequence: u64,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: BTreeMap<PendingKey, QueueItem>,
    /// Also holds an item while its registration is checked at dispatch,
    /// before it is marked running.
    current: Option<ItemHeader>,
    next_sequence: u64,
}

impl QueueState {
    fn is_running(&self, key: &ShowKey, kinds: &[ActionKind]) -> bool {
        self.running_except(key, kinds, None)
    }

    fn running_except(&self, key: &ShowKey, kinds: &[ActionKind], exclude: Option<ItemId>) -> bool {
        self.current.as_ref().is_some_and(|current| {
            current.is_about(key, kinds) && Some(current.id) != exclude
        })
    }

    fn is_pending(&self, key: &ShowKey, kinds: &[ActionKind]) -> bool {
        self.pending
            .values()
            .any(|item| item.header.is_about(key, kinds))
    }

    fn is_active(&self, key: &ShowKey, kinds: &[ActionKind]) -> bool {
        self.is_running(key, kinds) || self.is_pending(key, kinds)
    }

    /// First kind of `conflicts`, in table order, that is running or
    /// pending for the show. `exclude` skips the item asking.
    fn first_conflict(
        &self,
        key: &ShowKey,
        conflicts: &[ActionKind],
        exclude: Option<ItemId>,
    ) -> Option<ActionKind> {
        conflicts.iter().copied().find(|kind| {
            self.running_except(key, &[*kind], exclude) || self.is_pending(key, &[*kind])
        })
    }

    fn add_for_dir(&self, dir: &Path) -> Option<&ItemHeader> {
        self.headers()
            .find(|header| header.show_dir.as_deref() == Some(dir))
    }

    /// Current item followed by the pending items in dispatch order.
    fn headers(&self) -> impl Iterator<Item = &ItemHeader> {
        self.current
            .iter()
            .chain(self.pending.values().map(QueueItem::header))
    }

    fn label_for(&self, key: &ShowKey) -> String {
        self.headers()
            .find(|header| header.is_about(key, ADD_ACTIONS))
            .map(ItemHeader::display_name)
            .unwrap_or_else(|| key.to_string())
    }

    fn insert(&mut self, item: QueueItem) {
        let key = PendingKey {
            priority: Reverse(item.header.priority),
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.pending.insert(key, item);
    }

    fn evict(&mut self, key: &ShowKey) -> Vec<QueueItem> {
        let doomed: Vec<PendingKey> = self
            .pending
            .iter()
            .filter(|(_, item)| item.header.subject == *key)
            .map(|(pending_key, _)| *pending_key)
            .collect();
        doomed
            .into_iter()
            .filter_map(|pending_key| self.pending.remove(&pending_key))
            .collect()
    }
}

/// Point-in-time view of the queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub sampled_at: DateTime<Utc>,
    pub current: Option<ItemHeader>,
    /// Pending items in the order they will be dispatched.
    pub pending: Vec<ItemHeader>,
}

/// An Add whose show entity does not exist yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingShow {
    pub item: ItemId,
    pub name: String,
    pub show_dir: Option<PathBuf>,
}

/// Result of dispatching one item.
#[derive(Clone, Debug)]
pub struct Dispatched {
    pub item: ItemHeader,
    pub state: ItemState,
}

/// Serialises every mutating action on tracked shows.
///
/// Requests may arrive from any task; admission and queries are
/// linearised through one mutex over the pending set and the current item.
/// Items are executed one at a time by [`ShowQueue::run_next`], normally
/// driven by a [`ShowQueueRuntime`](super::runtime::ShowQueueRuntime).
pub struct ShowQueue {
    config: ShowQueueConfig,
    services: QueueServices,
    state: Mutex<QueueState>,
    events: QueueEventBus,
    wake: Notify,
}

impl fmt::Debug for ShowQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ShowQueue");
        debug
            .field("config", &self.config)
            .field("services", &self.services)
            .field("events", &self.events);
        match self.state.try_lock() {
            Ok(state) => {
                debug
                    .field("pending", &state.pending.len())
                    .field("current", &state.current.as_ref().map(|c| c.id));
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }
        debug.finish()
    }
}

impl ShowQueue {
    pub fn new(config: ShowQueueConfig, services: QueueServices) -> Self {
        let events = QueueEventBus::new(config.event_capacity);
        Self {
            config,
            services,
            state: Mutex::new(QueueState::default()),
            events,
            wake: Notify::new(),
        }
    }

    pub fn config(&self) -> &ShowQueueConfig {
        &self.config
    }

    pub fn services(&self) -> &QueueServices {
        &self.services
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub async fn request_add(&self, request: AddRequest) -> Result<QueueTicket> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.add_for_dir(&request.show_dir) {
            return Err(QueueError::Conflict(format!(
                "{} is already queued to be added (item {})",
                request.show_dir.display(),
                existing.id
            )));
        }

        info!(
            target: "show_queue",
            show = %request.key(),
            show_dir = %request.show_dir.display(),
            "Queueing show add"
        );
        let subject = request.key();
        Ok(self.push(&mut state, subject, ItemPayload::Add(Box::new(request))))
    }

    /// Checks, in order: being added, being updated, update pending.
    pub async fn request_update(&self, key: ShowKey, force: bool) -> Result<QueueTicket> {
        let show = self.services.registry.get(&key).await?;
        let mut state = self.state.lock().await;
        let name = show
            .as_ref()
            .map(|show| show.name.clone())
            .unwrap_or_else(|| state.label_for(&key));

        if state.is_active(&key, ADD_ACTIONS) {
            return Err(QueueError::CantUpdate(format!(
                "{name} is still being added, please wait until it is finished before trying to update."
            )));
        }
        if state.is_running(&key, UPDATE_ACTIONS) {
            return Err(QueueError::CantUpdate(format!(
                "{name} is already being updated, can't update again until it's done."
            )));
        }
        if state.is_pending(&key, UPDATE_ACTIONS) {
            return Err(QueueError::CantUpdate(format!(
                "{name} is in the process of being updated, can't update again until it's done."
            )));
        }
        if show.is_none() {
            return Err(QueueError::CantUpdate(format!(
                "{name} is not in the show list"
            )));
        }

        debug!(target: "show_queue", show = %key, force, "Queueing show update");
        Ok(self.push(&mut state, key, ItemPayload::Update { force }))
    }

    pub async fn request_refresh(&self, key: ShowKey, force: bool) -> Result<QueueTicket> {
        self.admit_refresh(key, force, None).await
    }

    /// Follow-up refresh submitted by a running update. The update asking
    /// is still current, so it does not count as a conflicting update.
    pub(crate) async fn enqueue_follow_up_refresh(
        &self,
        origin: &ItemHeader,
        force: bool,
    ) -> Result<QueueTicket> {
        self.admit_refresh(origin.subject, force, Some(origin.id)).await
    }

    async fn admit_refresh(
        &self,
        key: ShowKey,
        force: bool,
        origin: Option<ItemId>,
    ) -> Result<QueueTicket> {
        let known = self.services.registry.contains(&key).await?;
        let mut state = self.state.lock().await;

        let conflicts = ActionKind::Refresh.conflicts(force);
        match state.first_conflict(&key, conflicts, origin) {
            Some(kind) if kind.is_update() => {
                return Err(QueueError::CantRefresh(
                    "A refresh was attempted but there is already an update queued or in progress. Since updates do a refresh at the end anyway, skipping this request.".into(),
                ));
            }
            Some(_) => {
                return Err(QueueError::CantRefresh(
                    "This show is already being refreshed or queued to be refreshed, skipping this request.".into(),
                ));
            }
            None => {}
        }
        if !known {
            return Err(QueueError::CantRefresh(format!(
                "{key} is not in the show list"
            )));
        }

        debug!(target: "show_queue", show = %key, force, "Queueing show refresh");
        Ok(self.push(&mut state, key, ItemPayload::Refresh { force }))
    }

    pub async fn request_rename(&self, key: ShowKey) -> Result<QueueTicket> {
        let mut state = self.state.lock().await;
        debug!(target: "show_queue", show = %key, "Queueing episode renames");
        Ok(self.push(&mut state, key, ItemPayload::Rename))
    }

    pub async fn request_subtitle_download(&self, key: ShowKey) -> Result<QueueTicket> {
        let mut state = self.state.lock().await;
        debug!(target: "show_queue", show = %key, "Queueing subtitle download");
        Ok(self.push(&mut state, key, ItemPayload::Subtitle))
    }

    /// Queues removal of a registered show, evicting every other pending
    /// item for it. A running item for the show is left to finish.
    pub async fn request_remove(&self, key: ShowKey, full: bool) -> Result<QueueTicket> {
        let Some(show) = self.services.registry.get(&key).await? else {
            return Err(QueueError::CantRemove(
                "Failed removing show: Show does not exist".into(),
            ));
        };
        self.admit_remove(show, full).await
    }

    /// Removal of a show an Add built but could not finish registering.
    pub(crate) async fn enqueue_rollback_remove(&self, show: Show) -> Result<QueueTicket> {
        self.admit_remove(show, false).await
    }

    async fn admit_remove(&self, show: Show, full: bool) -> Result<QueueTicket> {
        let key = show.key;
        let mut state = self.state.lock().await;
        if state
            .first_conflict(&key, ActionKind::Remove.conflicts(full), None)
            .is_some()
        {
            return Err(QueueError::CantRemove(format!(
                "{} is already queued to be removed",
                show.name
            )));
        }

        for item in state.evict(&key) {
            info!(
                target: "show_queue",
                show = %key,
                item = %item.header.id,
                action = %item.header.kind,
                "Evicting queued action ahead of show removal"
            );
            item.set_state(ItemState::Failed);
            self.events.publish(QueueEvent::Evicted(item.header));
        }

        info!(target: "show_queue", show = %key, full, "Queueing show removal");
        let payload = ItemPayload::Remove {
            show: Box::new(show),
            full,
        };
        Ok(self.push(&mut state, key, payload))
    }

    fn push(&self, state: &mut QueueState, subject: ShowKey, payload: ItemPayload) -> QueueTicket {
        let (item, ticket) = QueueItem::new(subject, payload);
        self.events
            .publish(QueueEvent::Enqueued(item.header.clone()));
        state.insert(item);
        self.wake.notify_one();
        ticket
    }

    pub async fn is_adding(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_active(key, ADD_ACTIONS)
    }

    pub async fn is_updating(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_active(key, UPDATE_ACTIONS)
    }

    pub async fn is_refreshing(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_active(key, REFRESH_ACTIONS)
    }

    pub async fn is_renaming(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_active(key, RENAME_ACTIONS)
    }

    pub async fn is_downloading_subtitles(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_active(key, SUBTITLE_ACTIONS)
    }

    pub async fn is_removing(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_active(key, REMOVE_ACTIONS)
    }

    pub async fn is_being_added(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_running(key, ADD_ACTIONS)
    }

    pub async fn is_being_updated(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_running(key, UPDATE_ACTIONS)
    }

    pub async fn is_being_refreshed(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_running(key, REFRESH_ACTIONS)
    }

    pub async fn is_being_renamed(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_running(key, RENAME_ACTIONS)
    }

    pub async fn is_being_subtitled(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_running(key, SUBTITLE_ACTIONS)
    }

    pub async fn is_in_update_queue(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_pending(key, UPDATE_ACTIONS)
    }

    pub async fn is_in_refresh_queue(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_pending(key, REFRESH_ACTIONS)
    }

    pub async fn is_in_rename_queue(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_pending(key, RENAME_ACTIONS)
    }

    pub async fn is_in_subtitle_queue(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_pending(key, SUBTITLE_ACTIONS)
    }

    pub async fn is_in_remove_queue(&self, key: &ShowKey) -> bool {
        self.state.lock().await.is_pending(key, REMOVE_ACTIONS)
    }

    pub async fn loading_shows(&self) -> Vec<LoadingShow> {
        let state = self.state.lock().await;
        state
            .headers()
            .filter(|header| header.kind == ActionKind::Add && header.show.is_none())
            .map(|header| LoadingShow {
                item: header.id,
                name: header.display_name(),
                show_dir: header.show_dir.clone(),
            })
            .collect()
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            sampled_at: Utc::now(),
            current: state.current.clone(),
            pending: state.pending.values().map(|item| item.header.clone()).collect(),
        }
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_idle(&self) -> bool {
        let state = self.state.lock().await;
        state.current.is_none() && state.pending.is_empty()
    }

    /// Completes once a request has been queued since the last wait.
    pub(crate) async fn wait_for_work(&self) {
        self.wake.notified().await;
    }

    /// Records the show an Add item has just created.
    pub(crate) async fn resolve_current(&self, id: ItemId, key: ShowKey) {
        let mut state = self.state.lock().await;
        if let Some(current) = state.current.as_mut().filter(|c| c.id == id) {
            current.show = Some(key);
        }
    }

    /// Dispatches the next admissible item and runs it to completion.
    /// Returns `None` when nothing was runnable.
    pub async fn run_next(&self) -> Option<Dispatched> {
        let mut item = self.take_next().await?;

        let span = info_span!(
            "queue_item",
            item = %item.header.id,
            action = %item.header.kind,
            show = %item.header.subject,
        );
        let outcome = run::execute(self, &item).instrument(span.clone()).await;

        item.header.show = self.current_show(item.header.id).await;
        run::finish(self, &item.header).instrument(span).await;

        Some(self.complete(item, outcome).await)
    }

    /// Pops pending items until one is admissible. The conflict table is
    /// checked under the lock; registration is checked with the slot
    /// claimed but the lock released.
    async fn take_next(&self) -> Option<QueueItem> {
        loop {
            let mut item = {
                let mut state = self.state.lock().await;
                if state.current.is_some() {
                    return None;
                }
                let (_, item) = state.pending.pop_first()?;
                let header = &item.header;
                let conflicts = header.kind.conflicts(header.force);
                if let Some(kind) = state.first_conflict(&header.subject, conflicts, None) {
                    let reason = format!("a {kind} for {} is still queued", header.subject);
                    self.discard(item, reason);
                    continue;
                }
                state.current = Some(item.header.clone());
                item
            };

            if let Err(reason) = self.admissible(&item.header).await {
                self.state.lock().await.current = None;
                self.discard(item, reason);
                continue;
            }

            item.header.started_at = Some(Utc::now());
            item.set_state(ItemState::Running);
            self.state.lock().await.current = Some(item.header.clone());
            self.events
                .publish(QueueEvent::Started(item.header.clone()));
            return Some(item);
        }
    }

    /// Re-checks registration against the world as it is at dispatch time.
    async fn admissible(&self, header: &ItemHeader) -> std::result::Result<(), String> {
        if !header.kind.requires_registered_show() {
            return Ok(());
        }
        match self.services.registry.contains(&header.subject).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(format!("{} is no longer in the show list", header.subject)),
            Err(err) => Err(err.to_string()),
        }
    }

    fn discard(&self, item: QueueItem, reason: String) {
        warn!(
            target: "show_queue",
            item = %item.header.id,
            action = %item.header.kind,
            show = %item.header.subject,
            %reason,
            "Discarding queued action"
        );
        item.set_state(ItemState::Failed);
        self.events.publish(QueueEvent::Discarded {
            item: item.header,
            reason,
        });
    }

    async fn current_show(&self, id: ItemId) -> Option<ShowKey> {
        let state = self.state.lock().await;
        state
            .current
            .as_ref()
            .filter(|current| current.id == id)
            .and_then(|current| current.show)
    }

    async fn complete(&self, item: QueueItem, outcome: Result<RunOutcome>) -> Dispatched {
        let mut state = self.state.lock().await;
        state.current = None;

        let header = item.header.clone();
        let (final_state, event) = match outcome {
            Ok(RunOutcome::Completed) => {
                (ItemState::Finished, QueueEvent::Finished(header.clone()))
            }
            Ok(RunOutcome::Aborted { reason }) => {
                debug!(
                    target: "show_queue",
                    item = %header.id,
                    action = %header.kind,
                    %reason,
                    "Queued action aborted"
                );
                let event = QueueEvent::Failed {
                    item: header.clone(),
                    error: Some(reason),
                };
                (ItemState::Failed, event)
            }
            Err(err) => {
                error!(
                    target: "show_queue",
                    item = %header.id,
                    action = %header.kind,
                    show = %header.subject,
                    error = %err,
                    "Queued action failed"
                );
                let event = QueueEvent::Failed {
                    item: header.clone(),
                    error: Some(err.to_string()),
                };
                (ItemState::Failed, event)
            }
        };

        item.set_state(final_state);
        self.events.publish(event);
        drop(state);

        Dispatched {
            item: header,
            state: final_state,
        }
    }
}
