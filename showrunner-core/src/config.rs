use serde::{Deserialize, Serialize};
use showrunner_model::Quality;

/// Knobs for the show queue.
///
/// Every field carries a default so hosts can embed a partial payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowQueueConfig {
    /// Capacity of the broadcast channel carrying queue events.
    pub event_capacity: usize,
    /// Upper bound on how long an idle worker sleeps before re-checking
    /// the pending set (milliseconds).
    pub idle_poll_ms: u64,
    /// Fallbacks applied by Add when the request leaves a value unset.
    pub defaults: AddDefaults,
    /// Library sync integration switches.
    pub library_sync: LibrarySyncConfig,
}

impl Default for ShowQueueConfig {
    fn default() -> Self {
        Self {
            event_capacity: 256,
            idle_poll_ms: 500,
            defaults: AddDefaults::default(),
            library_sync: LibrarySyncConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AddDefaults {
    pub language: String,
    pub quality: Quality,
    pub subtitles: bool,
    pub flatten_folders: bool,
    pub anime: bool,
    pub scene: bool,
    pub archive_firstmatch: bool,
}

impl Default for AddDefaults {
    fn default() -> Self {
        Self {
            language: "en".into(),
            quality: Quality::default(),
            subtitles: false,
            flatten_folders: false,
            anime: false,
            scene: false,
            archive_firstmatch: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySyncConfig {
    /// Master switch; nothing reaches the sync service while false.
    pub enabled: bool,
    /// Mirror added shows into the remote library.
    pub sync_library: bool,
    /// Keep the remote watchlist in step with added shows.
    pub sync_watchlist: bool,
}
