use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::video::domain::frame_sampler::FrameSampler;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::infrastructure::image_file_writer::ImageFileWriter;

/// Tolerance when comparing frame timestamps against sampling instants.
const TIMESTAMP_EPSILON: f64 = 1e-6;

/// Name of the `n`-th sampled still (1-based).
pub fn frame_file_name(n: usize) -> String {
    format!("frame_{n:05}.jpg")
}

/// Samples stills from a video via ffmpeg-next (libavformat + libavcodec).
///
/// Every decoded frame is timed relative to the first one; the first frame
/// at or after each instant `offset + k / rate` is converted to RGB24 and
/// written through the configured [`ImageWriter`].
pub struct FfmpegFrameSampler {
    writer: Box<dyn ImageWriter>,
}

impl FfmpegFrameSampler {
    pub fn new() -> Self {
        Self::with_writer(Box::new(ImageFileWriter::new()))
    }

    pub fn with_writer(writer: Box<dyn ImageWriter>) -> Self {
        Self { writer }
    }
}

impl Default for FfmpegFrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSampler for FfmpegFrameSampler {
    fn sample(
        &mut self,
        video_path: &Path,
        start_offset: f64,
        rate: f64,
        output_dir: &Path,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut schedule = SampleSchedule::new(start_offset, rate)?;

        ffmpeg_next::init()?;
        let mut ictx = ffmpeg_next::format::input(video_path)?;

        let (video_stream_index, time_base, parameters) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("No video stream found")?;
            (stream.index(), f64::from(stream.time_base()), stream.parameters())
        };

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(parameters)?;
        let mut decoder = codec_ctx.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Sampling {} ({width}x{height}) at {rate}/s from {start_offset:.3}s",
            video_path.display()
        );

        let mut sink = StillSink {
            writer: self.writer.as_ref(),
            scaler,
            width,
            height,
            time_base,
            output_dir: output_dir.to_path_buf(),
            decoded_count: 0,
            written: 0,
        };

        for (stream, packet) in ictx.packets() {
            if stream.index() != video_stream_index {
                continue;
            }
            if let Err(e) = decoder.send_packet(&packet) {
                log::warn!("Skipping undecodable packet: {e}");
                continue;
            }
            sink.drain(&mut decoder, &mut schedule)?;
        }

        decoder.send_eof()?;
        sink.drain(&mut decoder, &mut schedule)?;

        log::debug!(
            "Decoded {} frames, wrote {} stills",
            sink.decoded_count,
            sink.written
        );
        Ok(sink.written)
    }
}

/// Receives decoded frames and writes the ones the schedule selects.
struct StillSink<'a> {
    writer: &'a dyn ImageWriter,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    time_base: f64,
    output_dir: PathBuf,
    decoded_count: usize,
    written: usize,
}

impl StillSink<'_> {
    fn drain(
        &mut self,
        decoder: &mut ffmpeg_next::decoder::Video,
        schedule: &mut SampleSchedule,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let seconds = match decoded.timestamp().or_else(|| decoded.pts()) {
                Some(ts) => ts as f64 * self.time_base,
                None => schedule.last_time().unwrap_or(0.0),
            };
            self.decoded_count += 1;
            if !schedule.accept(seconds) {
                continue;
            }

            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            self.scaler.run(&decoded, &mut rgb_frame)?;
            let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);

            let n = self.written + 1;
            let frame = Frame::new(pixels, self.width, self.height, 3, n);
            let path = self.output_dir.join(frame_file_name(n));
            self.writer.write(&path, &frame)?;
            log::trace!("Sampled {seconds:.3}s -> {}", path.display());
            self.written = n;
        }
        Ok(())
    }
}

fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

/// Decides which decoded frames become stills.
///
/// Times are measured from the first frame seen. A frame is taken when it
/// reaches the next grid instant `offset + k / rate`; grid instants skipped
/// over by a gap in the stream are not back-filled.
#[derive(Debug)]
struct SampleSchedule {
    offset: f64,
    interval: f64,
    step: u64,
    origin: Option<f64>,
    last: Option<f64>,
}

impl SampleSchedule {
    fn new(offset: f64, rate: f64) -> Result<Self, String> {
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(format!("Sample rate must be positive, got {rate}"));
        }
        if !(offset >= 0.0 && offset.is_finite()) {
            return Err(format!("Start offset must be non-negative, got {offset}"));
        }
        Ok(Self {
            offset,
            interval: 1.0 / rate,
            step: 0,
            origin: None,
            last: None,
        })
    }

    fn target(&self) -> f64 {
        self.offset + self.step as f64 * self.interval
    }

    fn last_time(&self) -> Option<f64> {
        self.last
    }

    fn accept(&mut self, timestamp: f64) -> bool {
        self.last = Some(timestamp);
        let origin = *self.origin.get_or_insert(timestamp);
        let t = timestamp - origin;
        if t + TIMESTAMP_EPSILON < self.target() {
            return false;
        }
        // Next target is the first grid instant strictly after `t`.
        let passed = ((t + TIMESTAMP_EPSILON - self.offset) / self.interval).floor() as u64;
        self.step = (passed + 1).max(self.step + 1);
        true
    }
}
