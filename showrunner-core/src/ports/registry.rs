use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use showrunner_model::{Show, ShowKey};
use tokio::sync::RwLock;

use crate::error::Result;

/// The process-wide list of known shows.
#[async_trait]
pub trait ShowRegistry: Send + Sync {
    async fn get(&self, key: &ShowKey) -> Result<Option<Show>>;

    async fn contains(&self, key: &ShowKey) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Inserts the show, replacing any previous entry with the same key.
    async fn insert(&self, show: Show) -> Result<()>;

    async fn remove(&self, key: &ShowKey) -> Result<Option<Show>>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryShowRegistry {
    shows: Arc<RwLock<HashMap<ShowKey, Show>>>,
}

impl InMemoryShowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.shows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shows.read().await.is_empty()
    }
}

#[async_trait]
impl ShowRegistry for InMemoryShowRegistry {
    async fn get(&self, key: &ShowKey) -> Result<Option<Show>> {
        Ok(self.shows.read().await.get(key).cloned())
    }

    async fn insert(&self, show: Show) -> Result<()> {
        self.shows.write().await.insert(show.key, show);
        Ok(())
    }

    async fn remove(&self, key: &ShowKey) -> Result<Option<Show>> {
        Ok(self.shows.write().await.remove(key))
    }
}
