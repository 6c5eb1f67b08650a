use std::fmt;

/// Remote metadata sources a show can be tracked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Indexer {
    Tvdb,
    Tvmaze,
    Tmdb,
}

impl Indexer {
    /// Human readable name used in logs and user notifications.
    pub fn name(&self) -> &'static str {
        match self {
            Indexer::Tvdb => "theTVDB",
            Indexer::Tvmaze => "TVmaze",
            Indexer::Tmdb => "TMDb",
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            Indexer::Tvdb => "tvdb",
            Indexer::Tvmaze => "tvmaze",
            Indexer::Tmdb => "tmdb",
        }
    }
}

impl fmt::Display for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a tracked show: the indexer plus its native id.
///
/// Two queue items carrying equal keys are about the same show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShowKey {
    pub indexer: Indexer,
    pub indexer_id: u64,
}

impl ShowKey {
    pub fn new(indexer: Indexer, indexer_id: u64) -> Self {
        Self {
            indexer,
            indexer_id,
        }
    }
}

impl fmt::Display for ShowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.indexer.slug(), self.indexer_id)
    }
}
