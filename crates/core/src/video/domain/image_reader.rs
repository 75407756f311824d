use std::path::Path;

use crate::shared::frame::Frame;

/// Decodes a still image file into a [`Frame`].
pub trait ImageReader {
    fn read(&self, path: &Path, index: usize) -> Result<Frame, Box<dyn std::error::Error>>;
}
