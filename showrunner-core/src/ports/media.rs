use std::path::Path;

use async_trait::async_trait;
use showrunner_model::{EpisodeRecord, Show};

use crate::error::Result;

/// On-disk side of a show: its directory, metadata files, artwork cache,
/// episode files and subtitles.
#[async_trait]
pub trait ShowMedia: Send + Sync {
    async fn directory_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    /// Re-scans the show directory for new, moved or deleted files.
    async fn refresh_dir(&self, show: &Show) -> Result<()>;

    /// Links episode files found in the show directory to episodes.
    async fn scan_episodes_from_dir(&self, show: &Show) -> Result<()>;

    async fn write_metadata(&self, show: &Show) -> Result<()>;

    /// Rewrites metadata files from freshly pulled remote data.
    async fn update_metadata(&self, show: &Show) -> Result<()>;

    /// Fills the image cache; `force` re-downloads cached artwork.
    async fn populate_cache(&self, show: &Show, force: bool) -> Result<()>;

    async fn rename_episode(&self, show: &Show, episode: &EpisodeRecord) -> Result<()>;

    async fn download_subtitles(&self, show: &Show) -> Result<()>;
}

/// Media adapter that touches nothing but still answers directory checks
/// from the real filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopShowMedia;

#[async_trait]
impl ShowMedia for NoopShowMedia {
    async fn refresh_dir(&self, _show: &Show) -> Result<()> {
        Ok(())
    }

    async fn scan_episodes_from_dir(&self, _show: &Show) -> Result<()> {
        Ok(())
    }

    async fn write_metadata(&self, _show: &Show) -> Result<()> {
        Ok(())
    }

    async fn update_metadata(&self, _show: &Show) -> Result<()> {
        Ok(())
    }

    async fn populate_cache(&self, _show: &Show, _force: bool) -> Result<()> {
        Ok(())
    }

    async fn rename_episode(&self, _show: &Show, _episode: &EpisodeRecord) -> Result<()> {
        Ok(())
    }

    async fn download_subtitles(&self, _show: &Show) -> Result<()> {
        Ok(())
    }
}
