use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::shared::media_info::MediaInfo;

/// Result of [`VideoCache::clear`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearOutcome {
    Removed,
    NotPresent,
}

/// Flat directory of downloaded videos keyed by media id.
///
/// Entries are written once and never validated; a present file is a hit.
#[derive(Clone, Debug)]
pub struct VideoCache {
    root: PathBuf,
}

impl VideoCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<id>.<ext>`
    pub fn entry_path(&self, media: &MediaInfo) -> PathBuf {
        self.root.join(media.file_name())
    }

    pub fn contains(&self, media: &MediaInfo) -> bool {
        self.entry_path(media).is_file()
    }

    /// Creates the cache root if needed.
    pub fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Removes the whole cache directory.
    ///
    /// A missing directory is reported as [`ClearOutcome::NotPresent`];
    /// every other failure is returned.
    pub fn clear(&self) -> io::Result<ClearOutcome> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(ClearOutcome::Removed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ClearOutcome::NotPresent),
            Err(e) => Err(e),
        }
    }
}
