use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Builds the wrapped detector on demand.
pub type DetectorFactory =
    Box<dyn FnOnce() -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>>>;

/// Decorator that defers building a detector until the first frame arrives.
///
/// Runs that never detect (cache clearing, no URL, videos yielding no
/// stills) skip model download and session setup entirely. A failed build
/// is reported once; later calls report that nothing is available.
pub struct LazyFaceDetector {
    factory: Option<DetectorFactory>,
    inner: Option<Box<dyn FaceDetector>>,
}

impl LazyFaceDetector {
    pub fn new(factory: DetectorFactory) -> Self {
        Self {
            factory: Some(factory),
            inner: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.is_some()
    }
}

impl FaceDetector for LazyFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        if self.inner.is_none() {
            let factory = self
                .factory
                .take()
                .ok_or("face detector failed to initialize earlier")?;
            self.inner = Some(factory()?);
        }
        match self.inner.as_mut() {
            Some(detector) => detector.detect(frame),
            None => Err("face detector unavailable".into()),
        }
    }
}
