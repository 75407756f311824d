use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::Rng;
use thiserror::Error;

use crate::cache::video_cache::{ClearOutcome, VideoCache};
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::collector_config::CollectorConfig;
use crate::shared::constants::{FRAME_EXTENSIONS, SCRATCH_DIR_PREFIX};
use crate::shared::media_info::MediaInfo;
use crate::source::domain::video_source::VideoSource;
use crate::video::domain::frame_sampler::FrameSampler;
use crate::video::domain::image_reader::ImageReader;
use crate::video::domain::image_writer::ImageWriter;

type BoxError = Box<dyn std::error::Error>;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("failed to clear cache {path}: {source}")]
    ClearCache {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not resolve {url}: {source}")]
    Resolve {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create scratch directory: {0}")]
    ScratchDir(#[source] io::Error),
    #[error("frame sampling failed for {video}: {source}")]
    Sample {
        video: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("failed to list frames in {dir}: {source}")]
    ListFrames {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read frame {path}: {source}")]
    ReadFrame {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("face detection failed on frame {frame}: {source}")]
    Detect {
        frame: usize,
        #[source]
        source: BoxError,
    },
    #[error("failed to write {path}: {source}")]
    WriteCrop {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// Outcome of a collection run. Empty when no URL was given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub output_dir: Option<PathBuf>,
    pub frames_processed: usize,
    pub faces_saved: usize,
    pub cache_hit: bool,
}

/// Name of the crop for face `face` (0-based) in frame `frame` (1-based).
pub fn crop_file_name(frame: usize, face: usize) -> String {
    format!("face_{frame}_{face}.jpg")
}

/// Face collection pipeline: resolve → cache/download → sample → detect → crop → write.
pub struct CollectFacesUseCase {
    config: CollectorConfig,
    cache: VideoCache,
    source: Box<dyn VideoSource>,
    sampler: Box<dyn FrameSampler>,
    reader: Box<dyn ImageReader>,
    detector: Box<dyn FaceDetector>,
    writer: Box<dyn ImageWriter>,
    logger: Box<dyn PipelineLogger>,
    start_offset: Option<f64>,
}

impl CollectFacesUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CollectorConfig,
        source: Box<dyn VideoSource>,
        sampler: Box<dyn FrameSampler>,
        reader: Box<dyn ImageReader>,
        detector: Box<dyn FaceDetector>,
        writer: Box<dyn ImageWriter>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        let cache = VideoCache::new(config.cache_dir.clone());
        Self {
            config,
            cache,
            source,
            sampler,
            reader,
            detector,
            writer,
            logger,
            start_offset: None,
        }
    }

    /// Samples from a fixed offset instead of a random one in `[0, 1)`.
    pub fn with_start_offset(mut self, seconds: f64) -> Self {
        self.start_offset = Some(seconds);
        self
    }

    pub fn run(&mut self, url: Option<&str>, clear_cache: bool) -> Result<RunReport, CollectError> {
        if clear_cache {
            self.clear_cache()?;
        }

        let Some(url) = url else {
            self.logger.info("No URL given, nothing to collect");
            return Ok(RunReport::default());
        };

        let media = self
            .source
            .resolve_metadata(url)
            .map_err(|source| CollectError::Resolve {
                url: url.to_string(),
                source,
            })?;
        let resolved = match &media.title {
            Some(title) => format!("Resolved {url} to {} ({title})", media.id),
            None => format!("Resolved {url} to {}", media.id),
        };
        self.logger.info(&resolved);

        let (video_path, cache_hit) = self.ensure_cached(url, &media)?;

        // Removed on drop, including on early return.
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_DIR_PREFIX)
            .tempdir()
            .map_err(CollectError::ScratchDir)?;

        let offset = self
            .start_offset
            .unwrap_or_else(|| rand::rng().random_range(0.0..1.0));
        self.logger.debug(&format!(
            "Sampling {:.3}/s starting at {offset:.3}s into {}",
            self.config.sample_rate,
            scratch.path().display()
        ));

        let t = Instant::now();
        let sampled = self
            .sampler
            .sample(&video_path, offset, self.config.sample_rate, scratch.path())
            .map_err(|source| CollectError::Sample {
                video: video_path.clone(),
                source,
            })?;
        self.logger.timing("sample", elapsed_ms(t));

        let frames = list_frames(scratch.path()).map_err(|source| CollectError::ListFrames {
            dir: scratch.path().to_path_buf(),
            source,
        })?;
        if frames.len() != sampled {
            self.logger.warn(&format!(
                "Sampler reported {sampled} frames but {} were found",
                frames.len()
            ));
        }
        self.logger.info(&format!("Found {} frames", frames.len()));

        let output_dir = self.create_output_dir()?;

        let mut faces_saved = 0;
        for (i, path) in frames.iter().enumerate() {
            let index = i + 1;
            faces_saved += self.process_frame(path, index, &output_dir)?;
            self.logger.progress(index, frames.len());
        }

        self.logger.info(&format!(
            "Saved {faces_saved} faces from {} frames to {}",
            frames.len(),
            output_dir.display()
        ));
        self.logger.summary();

        Ok(RunReport {
            output_dir: Some(output_dir),
            frames_processed: frames.len(),
            faces_saved,
            cache_hit,
        })
    }

    fn clear_cache(&mut self) -> Result<(), CollectError> {
        let outcome = self.cache.clear().map_err(|source| CollectError::ClearCache {
            path: self.cache.root().to_path_buf(),
            source,
        })?;
        let root = self.cache.root().display();
        match outcome {
            ClearOutcome::Removed => self.logger.info(&format!("Cleared cache {root}")),
            ClearOutcome::NotPresent => {
                self.logger.info(&format!("Cache {root} does not exist, nothing to clear"))
            }
        }
        Ok(())
    }

    /// Returns the cache entry for `media`, downloading it on a miss.
    fn ensure_cached(
        &mut self,
        url: &str,
        media: &MediaInfo,
    ) -> Result<(PathBuf, bool), CollectError> {
        let path = self.cache.entry_path(media);
        if self.cache.contains(media) {
            self.logger
                .info(&format!("Loaded {} from cache", path.display()));
            return Ok((path, true));
        }

        self.cache
            .ensure_root()
            .map_err(|source| CollectError::CacheDir {
                path: self.cache.root().to_path_buf(),
                source,
            })?;

        self.logger
            .info(&format!("Downloading {url} to {}", path.display()));
        let t = Instant::now();
        self.source
            .download(url, &path)
            .map_err(|source| CollectError::Download {
                url: url.to_string(),
                source,
            })?;
        self.logger.timing("download", elapsed_ms(t));
        Ok((path, false))
    }

    /// `<output_root>/<unix millis>`
    fn create_output_dir(&self) -> Result<PathBuf, CollectError> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = self.config.output_root.join(millis.to_string());
        fs::create_dir_all(&path).map_err(|source| CollectError::OutputDir {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Detects and writes every face in one frame. Returns the number saved.
    fn process_frame(
        &mut self,
        path: &Path,
        index: usize,
        output_dir: &Path,
    ) -> Result<usize, CollectError> {
        let frame = self
            .reader
            .read(path, index)
            .map_err(|source| CollectError::ReadFrame {
                path: path.to_path_buf(),
                source,
            })?;

        let t = Instant::now();
        let faces = self
            .detector
            .detect(&frame)
            .map_err(|source| CollectError::Detect {
                frame: index,
                source,
            })?;
        self.logger.timing("detect", elapsed_ms(t));
        self.logger.metric("faces", faces.len() as f64);
        self.logger
            .debug(&format!("Frame {index}: {} face(s)", faces.len()));

        let mut saved = 0;
        for (j, face) in faces.iter().enumerate() {
            let region = face.padded(self.config.padding_ratio);
            let Some(crop) = frame.crop(&region) else {
                self.logger.warn(&format!(
                    "Skipping face {j} in frame {index}: {region:?} is outside the {}x{} frame",
                    frame.width(),
                    frame.height()
                ));
                continue;
            };

            let out = output_dir.join(crop_file_name(index, j));
            self.writer
                .write(&out, &crop)
                .map_err(|source| CollectError::WriteCrop {
                    path: out.clone(),
                    source,
                })?;
            self.logger.trace(&format!("Saved {}", out.display()));
            saved += 1;
        }
        Ok(saved)
    }
}

/// Still images directly inside `dir`, ordered by the number in their name.
fn list_frames(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_frame_extension(&path) {
            frames.push(path);
        }
    }
    frames.sort_by_cached_key(|p| (frame_sequence(p), p.file_name().map(|n| n.to_os_string())));
    Ok(frames)
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FRAME_EXTENSIONS.iter().any(|f| e.eq_ignore_ascii_case(f)))
}

/// Digits of the file stem as a number; names without digits sort last.
fn frame_sequence(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.chars().filter(char::is_ascii_digit).collect::<String>())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(u64::MAX)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
