use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use showrunner_model::{EpisodeMap, Indexer, SeriesRecord, ShowKey};
use tokio::sync::Mutex;

use crate::error::ProviderError;

/// Remote indexer capability used to resolve and refresh shows.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn lookup(
        &self,
        indexer: Indexer,
        indexer_id: u64,
        language: &str,
        use_cache: bool,
    ) -> Result<SeriesRecord, ProviderError>;

    async fn list_episodes(
        &self,
        indexer: Indexer,
        indexer_id: u64,
    ) -> Result<EpisodeMap, ProviderError>;
}

/// Provider answering from canned responses; unknown shows are `NotFound`.
#[derive(Clone, Debug, Default)]
pub struct StaticMetadataProvider {
    series: Arc<Mutex<HashMap<ShowKey, Result<SeriesRecord, ProviderError>>>>,
    episodes: Arc<Mutex<HashMap<ShowKey, Result<EpisodeMap, ProviderError>>>>,
}

impl StaticMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_series(&self, record: SeriesRecord) {
        self.series.lock().await.insert(record.key(), Ok(record));
    }

    pub async fn fail_series(&self, key: ShowKey, error: ProviderError) {
        self.series.lock().await.insert(key, Err(error));
    }

    pub async fn insert_episodes(&self, key: ShowKey, episodes: EpisodeMap) {
        self.episodes.lock().await.insert(key, Ok(episodes));
    }

    pub async fn fail_episodes(&self, key: ShowKey, error: ProviderError) {
        self.episodes.lock().await.insert(key, Err(error));
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn lookup(
        &self,
        indexer: Indexer,
        indexer_id: u64,
        _language: &str,
        _use_cache: bool,
    ) -> Result<SeriesRecord, ProviderError> {
        let key = ShowKey::new(indexer, indexer_id);
        let guard = self.series.lock().await;
        guard
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::NotFound(key.to_string())))
    }

    async fn list_episodes(
        &self,
        indexer: Indexer,
        indexer_id: u64,
    ) -> Result<EpisodeMap, ProviderError> {
        let key = ShowKey::new(indexer, indexer_id);
        let guard = self.episodes.lock().await;
        guard.get(&key).cloned().unwrap_or_else(|| Ok(EpisodeMap::new()))
    }
}
