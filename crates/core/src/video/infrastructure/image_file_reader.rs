use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_reader::ImageReader;

/// Decodes still images with the `image` crate, converting to RGB8.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        let (width, height) = img.dimensions();
        Ok(Frame::new(img.into_raw(), width, height, 3, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([50, 100, 200]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_read_returns_rgb_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "still.png", 100, 80);
        let frame = ImageFileReader::new().read(&path, 3).unwrap();
        assert_eq!(frame.width(), 100);
        assert_eq!(frame.height(), 80);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 3);
        assert_eq!(&frame.data()[..3], &[50, 100, 200]);
    }

    #[test]
    fn test_read_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "frame_00001.jpg", 64, 48);
        let frame = ImageFileReader::new().read(&path, 1).unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));
    }

    #[test]
    fn test_read_nonexistent_is_error() {
        let result = ImageFileReader::new().read(Path::new("/nonexistent/frame.jpg"), 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(ImageFileReader::new().read(&path, 1).is_err());
    }
}
