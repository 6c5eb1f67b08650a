use crate::ids::{Indexer, ShowKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeasonSummary {
    pub number: u32,
    pub episode_count: usize,
}

/// Top-level series record as returned by a metadata provider.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesRecord {
    pub indexer: Indexer,
    pub indexer_id: u64,
    /// Missing when the provider has no translation for the requested
    /// language.
    pub name: Option<String>,
    pub language: String,
    pub overview: Option<String>,
    pub network: Option<String>,
    pub genres: Vec<String>,
    pub seasons: Vec<SeasonSummary>,
}

impl SeriesRecord {
    pub fn new(indexer: Indexer, indexer_id: u64, name: impl Into<String>) -> Self {
        Self {
            indexer,
            indexer_id,
            name: Some(name.into()),
            language: "en".into(),
            overview: None,
            network: None,
            genres: Vec::new(),
            seasons: Vec::new(),
        }
    }

    pub fn with_season(mut self, number: u32, episode_count: usize) -> Self {
        self.seasons.push(SeasonSummary {
            number,
            episode_count,
        });
        self
    }

    pub fn key(&self) -> ShowKey {
        ShowKey::new(self.indexer, self.indexer_id)
    }

    /// Name suitable for display, ignoring blank values.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn has_episodes(&self) -> bool {
        self.seasons.iter().any(|season| season.episode_count > 0)
    }
}
