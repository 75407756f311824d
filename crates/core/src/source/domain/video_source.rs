use std::path::Path;

use crate::shared::media_info::MediaInfo;

/// Resolves and fetches remote videos.
///
/// Implementations wrap a downloader (site extraction, formats, network);
/// the pipeline only sees the resolved [`MediaInfo`] and the downloaded file.
pub trait VideoSource {
    /// Looks up metadata for `url` without downloading the media.
    fn resolve_metadata(&self, url: &str) -> Result<MediaInfo, Box<dyn std::error::Error>>;

    /// Downloads the media behind `url` to exactly `destination`.
    fn download(&self, url: &str, destination: &Path) -> Result<(), Box<dyn std::error::Error>>;
}
