use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application folder under the platform cache root.
const APP_DIR_NAME: &str = "FaceCollector";

/// Read buffer for streaming downloads.
const CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create model directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine model directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Returns the local path of model `name`, downloading it from `url` into
/// the platform model directory on first use.
pub fn resolve(
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, progress)
}

/// Like [`resolve`], with an explicit model directory.
pub fn resolve_in(
    dir: &Path,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let path = dir.join(name);
    if path.is_file() {
        log::debug!("Using cached model {}", path.display());
        return Ok(path);
    }

    fs::create_dir_all(dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading face model from {url}");
    download(url, &path, progress)?;
    Ok(path)
}

/// Platform-specific model directory.
///
/// - macOS: `~/Library/Application Support/FaceCollector/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceCollector/models/` or `~/.cache/FaceCollector/models/`
/// - Windows: `%LOCALAPPDATA%/FaceCollector/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams `url` into `<dest>.part`, renaming over `dest` only once the
/// body is complete. The partial file is removed on failure.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let part_path = dest.with_extension("part");
    let result = stream_to(url, &part_path, progress).and_then(|()| {
        fs::rename(&part_path, dest).map_err(|e| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source: e,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&part_path);
    }
    result
}

fn stream_to(
    url: &str,
    part_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |e: std::io::Error| ModelResolveError::Write {
        path: part_path.to_path_buf(),
        source: e,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(part_path).map_err(write_err)?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut downloaded: u64 = 0;
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)
}
