use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{QueueError, Result};

use super::show_queue::ShowQueue;

/// Owns the single worker task draining a [`ShowQueue`].
///
/// The running item is never interrupted: shutdown takes effect between
/// items.
pub struct ShowQueueRuntime {
    queue: Arc<ShowQueue>,
    shutdown_token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for ShowQueueRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let running = self
            .worker
            .try_lock()
            .map(|guard| guard.is_some())
            .unwrap_or(true);
        f.debug_struct("ShowQueueRuntime")
            .field("queue", &self.queue)
            .field("running", &running)
            .field("cancelled", &self.shutdown_token.is_cancelled())
            .finish()
    }
}

impl ShowQueueRuntime {
    pub fn new(queue: Arc<ShowQueue>) -> Self {
        Self {
            queue,
            shutdown_token: CancellationToken::new(),
            worker: Mutex::new(None),
        }
    }

    pub fn queue(&self) -> Arc<ShowQueue> {
        Arc::clone(&self.queue)
    }

    /// Spawns the worker. Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<()> {
        let mut guard = self.worker.lock().await;
        if guard.is_some() {
            return Err(QueueError::Internal(
                "show queue worker already started".into(),
            ));
        }
        if self.shutdown_token.is_cancelled() {
            return Err(QueueError::Internal(
                "show queue runtime was shut down".into(),
            ));
        }

        let queue = Arc::clone(&self.queue);
        let shutdown = self.shutdown_token.clone();
        let idle = Duration::from_millis(queue.config().idle_poll_ms.max(1));
        *guard = Some(tokio::spawn(worker_loop(queue, shutdown, idle)));
        info!(target: "show_queue", "show queue worker started");
        Ok(())
    }

    /// Stops the worker after the current item, if any, completes.
    pub async fn shutdown(&self) -> Result<()> {
        info!(target: "show_queue", "initiating shutdown of show queue worker");
        self.shutdown_token.cancel();

        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(target: "show_queue", error = %err, "show queue worker ended abnormally");
                return Err(QueueError::Internal(format!(
                    "show queue worker panicked: {err}"
                )));
            }
        }
        info!(target: "show_queue", "show queue worker stopped");
        Ok(())
    }
}

async fn worker_loop(queue: Arc<ShowQueue>, shutdown: CancellationToken, idle: Duration) {
    loop {
        while !shutdown.is_cancelled() {
            let Some(dispatched) = queue.run_next().await else {
                break;
            };
            debug!(
                target: "show_queue",
                item = %dispatched.item.id,
                action = %dispatched.item.kind,
                state = ?dispatched.state,
                "queue item done"
            );
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(target: "show_queue", "show queue worker shutting down");
                break;
            }
            _ = queue.wait_for_work() => {}
            _ = tokio::time::sleep(idle) => {}
        }
    }
}
