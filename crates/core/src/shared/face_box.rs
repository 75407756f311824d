/// Default padding margin as a fraction of the box's larger side.
pub const DEFAULT_PADDING_RATIO: f64 = 0.2;

/// A detected face in frame pixel coordinates.
///
/// Edges follow the `(top, right, bottom, left)` convention; `right` and
/// `bottom` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// Rows `[top, bottom)` and columns `[left, right)` to cut out of a frame.
///
/// Only the low side is guaranteed to lie inside the frame; `right` and
/// `bottom` may overshoot and are truncated when the crop is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceBox {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Symmetric margin: `floor(ratio * max(width, height))`.
    pub fn margin(&self, ratio: f64) -> i32 {
        let larger = self.width().max(self.height());
        ((ratio * larger as f64).floor() as i32).max(0)
    }

    /// Grows the box by [`FaceBox::margin`] on every side, clamping only the
    /// top and left edges at zero.
    pub fn padded(&self, ratio: f64) -> CropRegion {
        let extra = self.margin(ratio);
        CropRegion {
            top: (self.top - extra).max(0) as u32,
            right: (self.right + extra).max(0) as u32,
            bottom: (self.bottom + extra).max(0) as u32,
            left: (self.left - extra).max(0) as u32,
        }
    }
}

impl CropRegion {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_dimensions() {
        let b = FaceBox::new(100, 200, 180, 120);
        assert_eq!(b.width(), 80);
        assert_eq!(b.height(), 80);
    }

    #[test]
    fn test_padded_reference_box() {
        let b = FaceBox::new(100, 200, 180, 120);
        assert_eq!(b.margin(DEFAULT_PADDING_RATIO), 16);
        let r = b.padded(DEFAULT_PADDING_RATIO);
        assert_eq!((r.top, r.bottom), (84, 196));
        assert_eq!((r.left, r.right), (104, 216));
        assert_eq!(r.width(), 112);
        assert_eq!(r.height(), 112);
    }

    #[test]
    fn test_padded_clamps_low_side_only() {
        // 50x50 box hugging the top-left corner: extra = 10
        let b = FaceBox::new(4, 52, 54, 2);
        let r = b.padded(DEFAULT_PADDING_RATIO);
        assert_eq!(r.top, 0);
        assert_eq!(r.left, 0);
        assert_eq!(r.bottom, 64);
        assert_eq!(r.right, 62);
    }

    #[rstest]
    #[case::wide(FaceBox::new(0, 100, 40, 0), 20)]
    #[case::tall(FaceBox::new(0, 30, 90, 0), 18)]
    #[case::rounds_down(FaceBox::new(0, 14, 14, 0), 2)]
    #[case::tiny(FaceBox::new(10, 14, 14, 10), 0)]
    #[case::degenerate(FaceBox::new(10, 5, 5, 10), 0)]
    fn test_margin_uses_larger_side(#[case] b: FaceBox, #[case] expected: i32) {
        assert_eq!(b.margin(DEFAULT_PADDING_RATIO), expected);
    }

    #[test]
    fn test_zero_ratio_returns_box_unchanged() {
        let b = FaceBox::new(10, 60, 70, 20);
        let r = b.padded(0.0);
        assert_eq!(r, CropRegion { top: 10, right: 60, bottom: 70, left: 20 });
    }
}
