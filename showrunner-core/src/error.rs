use thiserror::Error;

/// Failures reported by a [`MetadataProvider`](crate::ports::MetadataProvider).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("show {0} not found")]
    NotFound(String),

    #[error("unable to contact indexer: {0}")]
    Unreachable(String),

    #[error("incomplete data: {0}")]
    IncompleteData(String),
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Can't update show: {0}")]
    CantUpdate(String),

    #[error("Can't refresh show: {0}")]
    CantRefresh(String),

    #[error("Can't remove show: {0}")]
    CantRemove(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Metadata provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Library sync error: {0}")]
    Sync(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueueError {
    /// True for the errors returned synchronously by `request_*` calls.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            QueueError::CantUpdate(_)
                | QueueError::CantRefresh(_)
                | QueueError::CantRemove(_)
                | QueueError::Conflict(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
