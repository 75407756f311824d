use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Returns one box per face, in the detector's own order. Implementations
/// may hold inference state, hence `&mut self`.
pub trait FaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}
