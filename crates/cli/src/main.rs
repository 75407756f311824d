use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::LevelFilter;

use face_collector_core::detection::domain::face_detector::FaceDetector;
use face_collector_core::detection::infrastructure::lazy_face_detector::LazyFaceDetector;
use face_collector_core::detection::infrastructure::model_resolver;
use face_collector_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use face_collector_core::pipeline::collect_faces_use_case::CollectFacesUseCase;
use face_collector_core::pipeline::pipeline_logger::LogPipelineLogger;
use face_collector_core::shared::collector_config::CollectorConfig;
use face_collector_core::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};
use face_collector_core::source::infrastructure::yt_dlp_source::YtDlpSource;
use face_collector_core::video::infrastructure::ffmpeg_frame_sampler::FfmpegFrameSampler;
use face_collector_core::video::infrastructure::image_file_reader::ImageFileReader;
use face_collector_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Collect cropped face images from an online video.
#[derive(Parser)]
#[command(name = "face-collector", version)]
struct Cli {
    /// Video page URL (anything yt-dlp understands).
    url: Option<String>,

    /// Delete the downloaded-video cache before doing anything else.
    #[arg(long)]
    clear_cache: bool,

    /// Log everything (trace level).
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// `RUST_LOG` still applies on top of [`log_level`].
fn init_logging(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(log_level(verbose))
        .parse_default_env()
        .init();
}

fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CollectorConfig::from_env();
    config.validate()?;
    let confidence = config.confidence;

    let detector = LazyFaceDetector::new(Box::new(move || build_detector(confidence)));

    let mut use_case = CollectFacesUseCase::new(
        config,
        Box::new(YtDlpSource::new()),
        Box::new(FfmpegFrameSampler::new()),
        Box::new(ImageFileReader::new()),
        Box::new(detector),
        Box::new(ImageFileWriter::new()),
        Box::new(LogPipelineLogger::default()),
    );

    let report = use_case.run(cli.url.as_deref(), cli.clear_cache)?;
    if let Some(dir) = report.output_dir {
        log::info!(
            "Done: {} faces from {} frames in {}",
            report.faces_saved,
            report.frames_processed,
            dir.display()
        );
    }
    Ok(())
}

fn build_detector(confidence: f64) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let downloading = Arc::new(AtomicBool::new(false));
    let flag = downloading.clone();
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        Some(Box::new(move |downloaded, total| {
            flag.store(true, Ordering::Relaxed);
            download_progress(downloaded, total);
        })),
    )?;
    if downloading.load(Ordering::Relaxed) {
        eprintln!();
    }

    Ok(Box::new(OnnxYoloDetector::new(&model_path, confidence)?))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default(false, LevelFilter::Info)]
    #[case::verbose(true, LevelFilter::Trace)]
    fn test_log_level(#[case] verbose: bool, #[case] expected: LevelFilter) {
        assert_eq!(log_level(verbose), expected);
    }

    #[test]
    fn test_verbose_flag_selects_trace() {
        let cli = Cli::try_parse_from(["face-collector", "--verbose"]).unwrap();
        assert_eq!(log_level(cli.verbose), LevelFilter::Trace);
    }

    #[test]
    fn test_url_is_optional() {
        let cli = Cli::try_parse_from(["face-collector"]).unwrap();
        assert!(cli.url.is_none());
        assert!(!cli.clear_cache);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parses_url_and_flags() {
        let cli = Cli::try_parse_from([
            "face-collector",
            "https://www.youtube.com/watch?v=BaW_jenozKc",
            "--clear-cache",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(
            cli.url.as_deref(),
            Some("https://www.youtube.com/watch?v=BaW_jenozKc")
        );
        assert!(cli.clear_cache);
        assert!(cli.verbose);
    }

    #[test]
    fn test_rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["face-collector", "--confidence", "0.3"]).is_err());
    }

    #[test]
    fn test_rejects_second_positional() {
        assert!(Cli::try_parse_from(["face-collector", "a", "b"]).is_err());
    }
}
