use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Season/episode coordinate of a single episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpisodeNumber {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeNumber {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{:02}", self.season, self.episode)
    }
}

/// Wanted-state of an episode, also used as a show's default for new
/// episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EpisodeStatus {
    Unaired,
    #[default]
    Skipped,
    Wanted,
    Ignored,
    Archived,
    Downloaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpisodeRecord {
    pub number: EpisodeNumber,
    pub name: Option<String>,
    pub status: EpisodeStatus,
    /// File backing the episode, when one has been found on disk.
    pub location: Option<PathBuf>,
    /// Other episodes stored in the same file (multi-part episodes).
    #[cfg_attr(feature = "serde", serde(default))]
    pub related: Vec<EpisodeNumber>,
}

impl EpisodeRecord {
    pub fn new(season: u32, episode: u32) -> Self {
        Self {
            number: EpisodeNumber::new(season, episode),
            name: None,
            status: EpisodeStatus::default(),
            location: None,
            related: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_related(mut self, related: Vec<EpisodeNumber>) -> Self {
        self.related = related;
        self
    }
}

/// Episodes of one show keyed by season, then episode number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpisodeMap {
    seasons: BTreeMap<u32, BTreeMap<u32, EpisodeRecord>>,
}

impl EpisodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: EpisodeRecord) -> Option<EpisodeRecord> {
        self.seasons
            .entry(record.number.season)
            .or_default()
            .insert(record.number.episode, record)
    }

    pub fn remove(&mut self, number: EpisodeNumber) -> Option<EpisodeRecord> {
        let season = self.seasons.get_mut(&number.season)?;
        let removed = season.remove(&number.episode);
        if season.is_empty() {
            self.seasons.remove(&number.season);
        }
        removed
    }

    pub fn get(&self, number: EpisodeNumber) -> Option<&EpisodeRecord> {
        self.seasons
            .get(&number.season)
            .and_then(|season| season.get(&number.episode))
    }

    pub fn contains(&self, number: EpisodeNumber) -> bool {
        self.get(number).is_some()
    }

    pub fn len(&self) -> usize {
        self.seasons.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.values().all(BTreeMap::is_empty)
    }

    /// Episodes in season/episode order.
    pub fn iter(&self) -> impl Iterator<Item = &EpisodeRecord> {
        self.seasons.values().flat_map(BTreeMap::values)
    }

    /// Episodes present here but absent from `other`.
    pub fn missing_from(&self, other: &EpisodeMap) -> Vec<EpisodeNumber> {
        self.iter()
            .map(|record| record.number)
            .filter(|number| !other.contains(*number))
            .collect()
    }

    /// Inserts or replaces every episode of `other`.
    pub fn merge(&mut self, other: EpisodeMap) {
        for (_, season) in other.seasons {
            for (_, record) in season {
                self.insert(record);
            }
        }
    }
}

impl FromIterator<EpisodeRecord> for EpisodeMap {
    fn from_iter<T: IntoIterator<Item = EpisodeRecord>>(iter: T) -> Self {
        let mut map = EpisodeMap::new();
        for record in iter {
            map.insert(record);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_from_lists_local_only_episodes() {
        let local: EpisodeMap = [EpisodeRecord::new(1, 1), EpisodeRecord::new(1, 2)]
            .into_iter()
            .collect();
        let remote: EpisodeMap = [EpisodeRecord::new(1, 1)].into_iter().collect();

        assert_eq!(local.missing_from(&remote), vec![EpisodeNumber::new(1, 2)]);
        assert!(remote.missing_from(&local).is_empty());
    }

    #[test]
    fn removing_last_episode_drops_the_season() {
        let mut map: EpisodeMap = [EpisodeRecord::new(2, 5)].into_iter().collect();
        assert!(map.remove(EpisodeNumber::new(2, 5)).is_some());
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn episode_number_formats_as_season_x_episode() {
        assert_eq!(EpisodeNumber::new(3, 7).to_string(), "3x07");
    }
}
