//! Show, episode and indexer models shared by the show queue and the
//! collaborators it drives.
#![allow(missing_docs)]

pub mod episode;
pub mod ids;
pub mod series;
pub mod show;

pub use episode::{EpisodeMap, EpisodeNumber, EpisodeRecord, EpisodeStatus};
pub use ids::{Indexer, ShowKey};
pub use series::{SeasonSummary, SeriesRecord};
pub use show::{Quality, ReleaseGroups, Show, ShowFlags};
