use ndarray::{s, ArrayView3};

use crate::shared::face_box::CropRegion;

/// A decoded still: contiguous RGB bytes in row-major order.
///
/// `index` is the 1-based position of the still within its run, or 0 for
/// frames that are not part of a sequence (e.g. crops).
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies out the pixels covered by `region`.
    ///
    /// Ranges past the right or bottom edge are truncated to the frame, the
    /// way slicing an image array past its end behaves. Returns `None` when
    /// nothing of the region lies inside the frame.
    pub fn crop(&self, region: &CropRegion) -> Option<Frame> {
        let top = region.top.min(self.height) as usize;
        let left = region.left.min(self.width) as usize;
        let bottom = region.bottom.min(self.height) as usize;
        let right = region.right.min(self.width) as usize;
        if bottom <= top || right <= left {
            return None;
        }

        let view = self.as_ndarray();
        let data: Vec<u8> = view
            .slice(s![top..bottom, left..right, ..])
            .iter()
            .copied()
            .collect();

        Some(Frame::new(
            data,
            (right - left) as u32,
            (bottom - top) as u32,
            self.channels,
            0,
        ))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
