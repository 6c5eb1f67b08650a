use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use showrunner_model::{EpisodeStatus, Indexer, Quality, Show, ShowKey};
use tokio::sync::watch;
use uuid::Uuid;

use super::action::{ActionKind, QueuePriority};

/// Unique identifier for queue items.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a queue item. Finished and Failed are terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ItemState {
    Pending,
    Running,
    Finished,
    Failed,
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Finished | ItemState::Failed)
    }
}

/// Everything supplied by a caller asking to add a show. Unset options fall
/// back to the queue's configured defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddRequest {
    pub indexer: Indexer,
    pub indexer_id: u64,
    pub show_dir: PathBuf,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub default_status: Option<EpisodeStatus>,
    #[serde(default)]
    pub default_status_after: Option<EpisodeStatus>,
    #[serde(default)]
    pub quality: Option<Quality>,
    #[serde(default)]
    pub flatten_folders: Option<bool>,
    #[serde(default)]
    pub subtitles: Option<bool>,
    #[serde(default)]
    pub subtitles_sr_metadata: bool,
    #[serde(default)]
    pub anime: Option<bool>,
    #[serde(default)]
    pub scene: Option<bool>,
    #[serde(default)]
    pub paused: Option<bool>,
    #[serde(default)]
    pub archive: Option<bool>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl AddRequest {
    pub fn new(indexer: Indexer, indexer_id: u64, show_dir: impl Into<PathBuf>) -> Self {
        Self {
            indexer,
            indexer_id,
            show_dir: show_dir.into(),
            language: None,
            default_status: None,
            default_status_after: None,
            quality: None,
            flatten_folders: None,
            subtitles: None,
            subtitles_sr_metadata: false,
            anime: None,
            scene: None,
            paused: None,
            archive: None,
            blacklist: Vec::new(),
            whitelist: Vec::new(),
        }
    }

    pub fn key(&self) -> ShowKey {
        ShowKey::new(self.indexer, self.indexer_id)
    }
}

/// Kind-specific data carried by an item.
#[derive(Clone, Debug)]
pub enum ItemPayload {
    Add(Box<AddRequest>),
    Refresh { force: bool },
    Update { force: bool },
    Rename,
    Subtitle,
    Remove { show: Box<Show>, full: bool },
}

impl ItemPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ItemPayload::Add(_) => ActionKind::Add,
            ItemPayload::Refresh { .. } => ActionKind::Refresh,
            ItemPayload::Update { force: false } => ActionKind::Update,
            ItemPayload::Update { force: true } => ActionKind::ForceUpdate,
            ItemPayload::Rename => ActionKind::Rename,
            ItemPayload::Subtitle => ActionKind::Subtitle,
            ItemPayload::Remove { .. } => ActionKind::Remove,
        }
    }

    pub fn force(&self) -> bool {
        matches!(
            self,
            ItemPayload::Refresh { force: true } | ItemPayload::Update { force: true }
        )
    }
}

/// Common, cheaply cloned view of an item used for admission checks,
/// snapshots and events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemHeader {
    pub id: ItemId,
    pub kind: ActionKind,
    /// The show the item is about. For Add this is the requested indexer
    /// id, known before the show itself exists.
    pub subject: ShowKey,
    /// Set once the item's show entity exists. Add items start unresolved.
    pub show: Option<ShowKey>,
    /// Target directory of an Add item.
    pub show_dir: Option<PathBuf>,
    pub priority: QueuePriority,
    pub force: bool,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

impl ItemHeader {
    pub fn is_about(&self, key: &ShowKey, kinds: &[ActionKind]) -> bool {
        self.subject == *key && kinds.contains(&self.kind)
    }

    /// Name shown while the show is still loading: the target directory's
    /// last component, else the show key.
    pub fn display_name(&self) -> String {
        self.show_dir
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.subject.to_string())
    }
}

/// A queued unit of work. Owned by the queue until it finishes.
#[derive(Debug)]
pub struct QueueItem {
    pub(crate) header: ItemHeader,
    pub(crate) payload: ItemPayload,
    state: watch::Sender<ItemState>,
}

impl QueueItem {
    pub(crate) fn new(subject: ShowKey, payload: ItemPayload) -> (Self, QueueTicket) {
        let kind = payload.kind();
        let show_dir = match &payload {
            ItemPayload::Add(request) => Some(request.show_dir.clone()),
            _ => None,
        };
        let header = ItemHeader {
            id: ItemId::new(),
            kind,
            subject,
            show: (kind != ActionKind::Add).then_some(subject),
            show_dir,
            priority: kind.priority(),
            force: payload.force(),
            enqueued_at: Utc::now(),
            started_at: None,
        };
        let (state, receiver) = watch::channel(ItemState::Pending);
        let ticket = QueueTicket {
            header: header.clone(),
            state: receiver,
        };
        (
            Self {
                header,
                payload,
                state,
            },
            ticket,
        )
    }

    pub fn header(&self) -> &ItemHeader {
        &self.header
    }

    pub fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    pub(crate) fn set_state(&self, state: ItemState) {
        self.state.send_replace(state);
    }
}

/// Returned to callers for every accepted request.
#[derive(Clone, Debug)]
pub struct QueueTicket {
    header: ItemHeader,
    state: watch::Receiver<ItemState>,
}

impl QueueTicket {
    pub fn id(&self) -> ItemId {
        self.header.id
    }

    pub fn kind(&self) -> ActionKind {
        self.header.kind
    }

    pub fn header(&self) -> &ItemHeader {
        &self.header
    }

    pub fn state(&self) -> ItemState {
        *self.state.borrow()
    }

    /// Resolves once the item reaches a terminal state. An item dropped
    /// before finishing counts as failed.
    pub async fn wait(&mut self) -> ItemState {
        loop {
            let current = *self.state.borrow_and_update();
            if current.is_terminal() {
                return current;
            }
            if self.state.changed().await.is_err() {
                let last = *self.state.borrow();
                return if last.is_terminal() {
                    last
                } else {
                    ItemState::Failed
                };
            }
        }
    }
}
