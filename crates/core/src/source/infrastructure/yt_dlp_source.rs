use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use thiserror::Error;

use crate::shared::media_info::MediaInfo;
use crate::source::domain::video_source::VideoSource;

const YT_DLP_PROGRAM: &str = "yt-dlp";

/// Lines of stderr kept when a yt-dlp invocation fails.
const STDERR_TAIL_LINES: usize = 5;

#[derive(Error, Debug)]
pub enum VideoSourceError {
    #[error("yt-dlp executable not found in PATH")]
    YtDlpNotFound(#[source] which::Error),
    #[error("failed to run yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("yt-dlp exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
    #[error("yt-dlp returned unreadable metadata: {0}")]
    InvalidMetadata(#[source] serde_json::Error),
    #[error("media id {0:?} cannot be used as a file name")]
    UnsafeMediaId(String),
    #[error("yt-dlp finished but {0} was not created")]
    MissingOutput(PathBuf),
}

/// [`VideoSource`] backed by the `yt-dlp` command-line downloader.
pub struct YtDlpSource {
    program: PathBuf,
}

impl YtDlpSource {
    /// Uses `yt-dlp` from `PATH`.
    pub fn new() -> Self {
        Self::with_program(YT_DLP_PROGRAM)
    }

    /// Uses a specific yt-dlp executable (name looked up in `PATH`, or a path).
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, VideoSourceError> {
        let program = which::which(&self.program).map_err(VideoSourceError::YtDlpNotFound)?;
        log::trace!("Running {} {}", program.display(), args.join(" "));

        let output = Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(VideoSourceError::Spawn)?;

        if !output.status.success() {
            return Err(VideoSourceError::CommandFailed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }
        Ok(output)
    }
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for YtDlpSource {
    fn resolve_metadata(&self, url: &str) -> Result<MediaInfo, Box<dyn std::error::Error>> {
        let output = self.run(&[
            "--dump-single-json",
            "--skip-download",
            "--no-playlist",
            "--no-warnings",
            url,
        ])?;
        Ok(parse_media_info(&output.stdout)?)
    }

    fn download(&self, url: &str, destination: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let template = output_template(destination);
        self.run(&[
            "--no-playlist",
            "--no-progress",
            "--restrict-filenames",
            "-o",
            &template,
            url,
        ])?;

        if !destination.exists() {
            return Err(VideoSourceError::MissingOutput(destination.to_path_buf()).into());
        }
        Ok(())
    }
}

/// Parses `--dump-single-json` output and checks the id is a plain file stem.
pub fn parse_media_info(stdout: &[u8]) -> Result<MediaInfo, VideoSourceError> {
    let info: MediaInfo =
        serde_json::from_slice(stdout).map_err(VideoSourceError::InvalidMetadata)?;
    if !is_safe_file_stem(&info.id) || !is_safe_file_stem(&info.ext) {
        return Err(VideoSourceError::UnsafeMediaId(info.id));
    }
    Ok(info)
}

fn is_safe_file_stem(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\', '\0'])
}

/// yt-dlp treats `-o` as a template; literal `%` must be doubled.
fn output_template(destination: &Path) -> String {
    destination.to_string_lossy().replace('%', "%%")
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "no error output".to_string();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
