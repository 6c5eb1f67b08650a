//! Contracts for the collaborators the queue drives, plus lightweight
//! in-process implementations.

mod collaborators;
mod media;
mod metadata;
mod registry;
mod store;

use std::fmt;
use std::sync::Arc;

pub use collaborators::*;
pub use media::*;
pub use metadata::*;
pub use registry::*;
pub use store::*;

/// Everything a running queue item may call on.
#[derive(Clone)]
pub struct QueueServices {
    pub metadata: Arc<dyn MetadataProvider>,
    pub store: Arc<dyn EntityStore>,
    pub registry: Arc<dyn ShowRegistry>,
    pub media: Arc<dyn ShowMedia>,
    pub notifier: Arc<dyn Notifier>,
    pub scene: Arc<dyn SceneNumbering>,
    pub backlog: Arc<dyn BacklogSearcher>,
    pub library_sync: Option<Arc<dyn LibrarySync>>,
}

impl QueueServices {
    pub fn new(
        metadata: Arc<dyn MetadataProvider>,
        store: Arc<dyn EntityStore>,
        registry: Arc<dyn ShowRegistry>,
    ) -> Self {
        Self {
            metadata,
            store,
            registry,
            media: Arc::new(NoopShowMedia),
            notifier: Arc::new(LogNotifier),
            scene: Arc::new(NoopSceneNumbering),
            backlog: Arc::new(NoopBacklogSearcher),
            library_sync: None,
        }
    }

    pub fn with_media(mut self, media: Arc<dyn ShowMedia>) -> Self {
        self.media = media;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_scene_numbering(mut self, scene: Arc<dyn SceneNumbering>) -> Self {
        self.scene = scene;
        self
    }

    pub fn with_backlog(mut self, backlog: Arc<dyn BacklogSearcher>) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn with_library_sync(mut self, sync: Arc<dyn LibrarySync>) -> Self {
        self.library_sync = Some(sync);
        self
    }
}

impl fmt::Debug for QueueServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueServices")
            .field("metadata", &"MetadataProvider")
            .field("store", &"EntityStore")
            .field("registry", &"ShowRegistry")
            .field("media", &"ShowMedia")
            .field("notifier", &"Notifier")
            .field("scene", &"SceneNumbering")
            .field("backlog", &"BacklogSearcher")
            .field("library_sync", &self.library_sync.is_some())
            .finish()
    }
}
