use std::path::PathBuf;

use chrono::NaiveDate;

use crate::episode::EpisodeStatus;
use crate::ids::ShowKey;
use crate::series::SeriesRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Quality {
    Any,
    #[default]
    Sd,
    Hd720p,
    Hd1080p,
    Uhd,
}

/// Per-show switches controlling search and post-processing behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShowFlags {
    pub subtitles: bool,
    pub subtitles_sr_metadata: bool,
    pub flatten_folders: bool,
    pub anime: bool,
    pub scene: bool,
    pub archive_firstmatch: bool,
    pub paused: bool,
}

/// Release-group keyword filters, only meaningful for anime.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReleaseGroups {
    pub blacklist: Vec<String>,
    pub whitelist: Vec<String>,
}

/// A tracked show.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Show {
    pub key: ShowKey,
    pub name: String,
    pub language: String,
    pub location: PathBuf,
    pub network: Option<String>,
    pub genres: Vec<String>,
    pub quality: Quality,
    pub flags: ShowFlags,
    pub default_ep_status: EpisodeStatus,
    pub release_groups: Option<ReleaseGroups>,
    pub last_refresh: Option<NaiveDate>,
}

impl Show {
    /// Builds a show from a provider record. `name` is passed separately
    /// because records may lack a usable one.
    pub fn from_record(
        record: &SeriesRecord,
        name: impl Into<String>,
        language: impl Into<String>,
        location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            key: record.key(),
            name: name.into(),
            language: language.into(),
            location: location.into(),
            network: record.network.clone(),
            genres: record.genres.clone(),
            quality: Quality::default(),
            flags: ShowFlags::default(),
            default_ep_status: EpisodeStatus::default(),
            release_groups: None,
            last_refresh: None,
        }
    }

    /// Refreshes the provider-owned fields from a newer record.
    pub fn apply_record(&mut self, record: &SeriesRecord) {
        if let Some(name) = record.display_name() {
            self.name = name.to_string();
        }
        self.network = record.network.clone();
        self.genres = record.genres.clone();
    }
}
