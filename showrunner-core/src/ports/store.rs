use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use showrunner_model::{EpisodeMap, EpisodeNumber, Show, ShowKey};
use tokio::sync::Mutex;

use crate::error::{QueueError, Result};

/// Persistence for show and episode records.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn persist(&self, show: &Show) -> Result<()>;

    async fn load_episodes(&self, key: &ShowKey) -> Result<EpisodeMap>;

    /// Upserts the given episodes, leaving others untouched.
    async fn save_episodes(&self, key: &ShowKey, episodes: EpisodeMap) -> Result<()>;

    async fn delete_episode(&self, key: &ShowKey, number: EpisodeNumber) -> Result<()>;

    /// Writes any buffered episode state for the show.
    async fn flush_episodes(&self, key: &ShowKey) -> Result<()>;

    /// Deletes the show and its episodes; `full` also removes files on disk.
    async fn delete(&self, show: &Show, full: bool) -> Result<()>;
}

#[derive(Debug, Default)]
struct StoreState {
    shows: HashMap<ShowKey, Show>,
    episodes: HashMap<ShowKey, EpisodeMap>,
    flushes: HashMap<ShowKey, usize>,
    deleted: Vec<(ShowKey, bool)>,
    reject_persist: bool,
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryEntityStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn show(&self, key: &ShowKey) -> Option<Show> {
        self.state.lock().await.shows.get(key).cloned()
    }

    pub async fn flush_count(&self, key: &ShowKey) -> usize {
        self.state
            .lock()
            .await
            .flushes
            .get(key)
            .copied()
            .unwrap_or_default()
    }

    pub async fn episodes(&self, key: &ShowKey) -> EpisodeMap {
        let guard = self.state.lock().await;
        guard.episodes.get(key).cloned().unwrap_or_default()
    }

    /// Makes every following `persist` fail, simulating a broken backend.
    pub async fn reject_persist(&self, reject: bool) {
        self.state.lock().await.reject_persist = reject;
    }

    /// Shows deleted so far with their `full` flag, in deletion order.
    pub async fn deleted(&self) -> Vec<(ShowKey, bool)> {
        self.state.lock().await.deleted.clone()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn persist(&self, show: &Show) -> Result<()> {
        let mut guard = self.state.lock().await;
        if guard.reject_persist {
            return Err(QueueError::Store(format!(
                "persist rejected for {}",
                show.key
            )));
        }
        guard.shows.insert(show.key, show.clone());
        Ok(())
    }

    async fn load_episodes(&self, key: &ShowKey) -> Result<EpisodeMap> {
        let guard = self.state.lock().await;
        Ok(guard.episodes.get(key).cloned().unwrap_or_default())
    }

    async fn save_episodes(&self, key: &ShowKey, episodes: EpisodeMap) -> Result<()> {
        let mut guard = self.state.lock().await;
        guard.episodes.entry(*key).or_default().merge(episodes);
        Ok(())
    }

    async fn delete_episode(&self, key: &ShowKey, number: EpisodeNumber) -> Result<()> {
        let mut guard = self.state.lock().await;
        if let Some(episodes) = guard.episodes.get_mut(key) {
            episodes.remove(number);
        }
        Ok(())
    }

    async fn flush_episodes(&self, key: &ShowKey) -> Result<()> {
        let mut guard = self.state.lock().await;
        *guard.flushes.entry(*key).or_default() += 1;
        Ok(())
    }

    async fn delete(&self, show: &Show, full: bool) -> Result<()> {
        let mut guard = self.state.lock().await;
        guard.shows.remove(&show.key);
        guard.episodes.remove(&show.key);
        guard.deleted.push((show.key, full));
        Ok(())
    }
}
