use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// JPEG quality used for sampled stills and face crops.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Writes frames to disk using the `image` crate.
///
/// `.jpg`/`.jpeg` paths are encoded at a fixed quality; any other extension
/// goes through `image`'s format detection.
pub struct ImageFileWriter {
    jpeg_quality: u8,
}

impl ImageFileWriter {
    pub fn new() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        if is_jpeg(path) {
            let file = BufWriter::new(File::create(path)?);
            let mut encoder = JpegEncoder::new_with_quality(file, self.jpeg_quality);
            encoder.encode_image(&img)?;
        } else {
            img.save(path)?;
        }
        Ok(())
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, r: u8, g: u8, b: u8) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&[r, g, b]);
        }
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_write_jpeg_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face_1_0.jpg");
        let frame = make_frame(100, 80, 50, 100, 200);
        ImageFileWriter::new().write(&path, &frame).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 100);
        assert_eq!(img.height(), 80);
        assert_eq!(
            image::ImageFormat::from_path(&path).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let frame = make_frame(50, 50, 50, 100, 200);
        ImageFileWriter::new().write(&path, &frame).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("crop.jpg");
        ImageFileWriter::new()
            .write(&path, &make_frame(8, 8, 0, 0, 0))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_is_jpeg_case_insensitive() {
        assert!(is_jpeg(Path::new("x.JPG")));
        assert!(is_jpeg(Path::new("x.jpeg")));
        assert!(!is_jpeg(Path::new("x.png")));
        assert!(!is_jpeg(Path::new("x")));
    }
}
