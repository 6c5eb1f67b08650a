use std::sync::Arc;

use async_trait::async_trait;
use showrunner_model::{Show, ShowKey};
use tokio::sync::Mutex;
use tracing::error;

use crate::error::Result;

/// External scene/absolute numbering mappings.
#[async_trait]
pub trait SceneNumbering: Send + Sync {
    async fn refresh(&self, key: &ShowKey, force: bool) -> Result<()>;

    async fn has_mapping(&self, key: &ShowKey) -> Result<bool>;
}

/// Hook into the backlog search job; only the trigger lives here.
#[async_trait]
pub trait BacklogSearcher: Send + Sync {
    async fn search_backlog(&self, show: &Show) -> Result<()>;
}

/// Remote library/watchlist sync service. Every failure is logged by the
/// caller and never propagated.
#[async_trait]
pub trait LibrarySync: Send + Sync {
    /// Picks up episodes the sync service wants for a newly added show.
    async fn manage_new_show(&self, show: &Show) -> Result<()>;

    async fn add_to_library(&self, show: &Show) -> Result<()>;

    async fn remove_from_library(&self, show: &Show) -> Result<()>;

    async fn update_watchlist(&self, show: &Show) -> Result<()>;

    /// Drops a show that could not be added; only a title and key are known.
    async fn remove_from_watchlist(&self, title: &str, key: &ShowKey) -> Result<()>;
}

/// User-visible notification channel for soft failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn error(&self, title: &str, message: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSceneNumbering;

#[async_trait]
impl SceneNumbering for NoopSceneNumbering {
    async fn refresh(&self, _key: &ShowKey, _force: bool) -> Result<()> {
        Ok(())
    }

    async fn has_mapping(&self, _key: &ShowKey) -> Result<bool> {
        Ok(false)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopBacklogSearcher;

#[async_trait]
impl BacklogSearcher for NoopBacklogSearcher {
    async fn search_backlog(&self, _show: &Show) -> Result<()> {
        Ok(())
    }
}

/// Notifier that only writes to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn error(&self, title: &str, message: &str) {
        error!(target: "show_queue::notify", %title, %message, "user notification");
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Notifier that keeps every notification for later inspection.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn error(&self, title: &str, message: &str) {
        self.sent.lock().await.push(Notification {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
