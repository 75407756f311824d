use std::path::Path;

/// Extracts stills from a video at a fixed rate.
pub trait FrameSampler {
    /// Writes one JPEG per sampled instant into `output_dir`, starting
    /// `start_offset` seconds into the video and taking `rate` stills per
    /// second. Files are numbered from 1 in sampling order.
    ///
    /// Returns the number of stills written.
    fn sample(
        &mut self,
        video_path: &Path,
        start_offset: f64,
        rate: f64,
        output_dir: &Path,
    ) -> Result<usize, Box<dyn std::error::Error>>;
}
