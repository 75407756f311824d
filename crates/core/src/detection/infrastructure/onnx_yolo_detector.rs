/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Letterboxes each frame to the model input, filters raw rows by
/// confidence, suppresses overlaps with greedy NMS, and maps the survivors
/// back to frame pixels as [`FaceBox`]es.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Values per row before any keypoints: cx, cy, w, h, conf.
const BOX_VALUES: usize = 5;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // [N, C, H, W]; square input, so H is enough
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!(
            "Loaded face model {} (input {input_size}px, confidence {confidence})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let rows = decode_rows(data, &shape, self.confidence)?;
        let mut raw_dets: Vec<RawDetection> = rows
            .into_iter()
            .map(|row| row.unletterbox(scale, pad_x, pad_y))
            .collect();

        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);
        Ok(kept
            .iter()
            .filter_map(|d| d.to_face_box(frame.width(), frame.height()))
            .collect())
    }
}

/// Execution providers for the current platform; an empty list means CPU.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // 114/255 gray padding, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// One output row in letterbox coordinates.
#[derive(Clone, Debug, PartialEq)]
struct Row {
    cx: f64,
    cy: f64,
    w: f64,
    h: f64,
    confidence: f64,
}

impl Row {
    fn unletterbox(&self, scale: f64, pad_x: u32, pad_y: u32) -> RawDetection {
        let px = pad_x as f64;
        let py = pad_y as f64;
        RawDetection {
            x1: ((self.cx - self.w / 2.0) - px) / scale,
            y1: ((self.cy - self.h / 2.0) - py) / scale,
            x2: ((self.cx + self.w / 2.0) - px) / scale,
            y2: ((self.cy + self.h / 2.0) - py) / scale,
            confidence: self.confidence,
        }
    }
}

/// Reads rows above `confidence` from a `[1, features, detections]` or
/// `[1, detections, features]` output tensor.
fn decode_rows(data: &[f32], shape: &[usize], confidence: f64) -> Result<Vec<Row>, String> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}"));
    }
    // Features are always the smaller axis.
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < BOX_VALUES {
        return Ok(Vec::new());
    }
    if data.len() < num_dets * num_feats {
        return Err(format!(
            "YOLO output has {} values, expected {}",
            data.len(),
            num_dets * num_feats
        ));
    }

    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    Ok((0..num_dets)
        .filter(|&i| value(i, 4) >= confidence)
        .map(|i| Row {
            cx: value(i, 0),
            cy: value(i, 1),
            w: value(i, 2),
            h: value(i, 3),
            confidence: value(i, 4),
        })
        .collect())
}

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

impl RawDetection {
    fn area(&self) -> f64 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &RawDetection) -> f64 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = w * h;
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Clamps to the frame and rounds to whole pixels. `None` if nothing
    /// of the box remains inside the frame.
    fn to_face_box(&self, frame_w: u32, frame_h: u32) -> Option<FaceBox> {
        let fw = frame_w as f64;
        let fh = frame_h as f64;
        let left = self.x1.clamp(0.0, fw).round() as i32;
        let top = self.y1.clamp(0.0, fh).round() as i32;
        let right = self.x2.clamp(0.0, fw).round() as i32;
        let bottom = self.y2.clamp(0.0, fh).round() as i32;
        if right <= left || bottom <= top {
            return None;
        }
        Some(FaceBox::new(top, right, bottom, left))
    }
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            if dets[i].iou(&dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    // ── Letterbox ────────────────────────────────────────────────────

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // scale = min(640/200, 640/100) = 3.2 → 640x320, pad_y = 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(scale, 3.2, epsilon = 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_tall_frame_pads_horizontally() {
        let frame = Frame::new(vec![128u8; 100 * 400 * 3], 100, 400, 3, 0);
        let (_, scale, pad_x, pad_y) = letterbox(&frame, 640);
        assert_relative_eq!(scale, 1.6, epsilon = 0.01);
        assert_eq!(pad_x, 240);
        assert_eq!(pad_y, 0);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640);

        let y = pad_y as usize + 1;
        let x = pad_x as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, x]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    // ── Output decoding ──────────────────────────────────────────────

    #[test]
    fn test_decode_rows_detection_major() {
        // [1, 2 detections, 5 features]
        let data = [
            100.0, 100.0, 40.0, 60.0, 0.9, //
            300.0, 300.0, 20.0, 20.0, 0.1,
        ];
        let rows = decode_rows(&data, &[1, 2, 5], 0.5).unwrap();
        assert_eq!(rows.len(), 1);
        assert_relative_eq!(rows[0].cx, 100.0);
        assert_relative_eq!(rows[0].h, 60.0);
    }

    #[test]
    fn test_decode_rows_feature_major() {
        // [1, 5 features, 6 detections]; only detection 2 passes
        let mut data = vec![0.0f32; 5 * 6];
        data[2] = 50.0; // cx
        data[6 + 2] = 60.0; // cy
        data[12 + 2] = 10.0; // w
        data[18 + 2] = 12.0; // h
        data[24 + 2] = 0.8; // conf
        let rows = decode_rows(&data, &[1, 5, 6], 0.5).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            Row {
                cx: 50.0,
                cy: 60.0,
                w: 10.0,
                h: 12.0,
                confidence: 0.8f32 as f64,
            }
        );
    }

    #[test]
    fn test_decode_rows_rejects_bad_rank() {
        assert!(decode_rows(&[0.0; 4], &[4], 0.5).is_err());
    }

    #[test]
    fn test_decode_rows_rejects_short_buffer() {
        assert!(decode_rows(&[0.0; 4], &[1, 2, 5], 0.5).is_err());
    }

    #[test]
    fn test_unletterbox_maps_back_to_frame() {
        let row = Row {
            cx: 320.0,
            cy: 320.0,
            w: 64.0,
            h: 32.0,
            confidence: 0.9,
        };
        let d = row.unletterbox(3.2, 0, 160);
        assert_relative_eq!(d.x1, 90.0);
        assert_relative_eq!(d.x2, 110.0);
        assert_relative_eq!(d.y1, 45.0);
        assert_relative_eq!(d.y2, 55.0);
    }

    #[test]
    fn test_to_face_box_clamps_and_orders_edges() {
        let b = det(-5.0, 10.4, 50.6, 500.0, 0.9).to_face_box(100, 200).unwrap();
        assert_eq!(b, FaceBox::new(10, 51, 200, 0));
    }

    #[test]
    fn test_to_face_box_outside_frame_is_none() {
        assert!(det(150.0, 10.0, 180.0, 40.0, 0.9).to_face_box(100, 100).is_none());
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = det(0.0, 0.0, 10.0, 10.0, 0.9);
        assert_relative_eq!(a.iou(&a), 1.0);
        assert_relative_eq!(a.iou(&det(20.0, 20.0, 30.0, 30.0, 0.9)), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        // intersection 50, union 150
        let a = det(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = det(5.0, 0.0, 15.0, 10.0, 0.9);
        assert_relative_eq!(a.iou(&b), 1.0 / 3.0, epsilon = 1e-9);
    }

    // ── NMS ──────────────────────────────────────────────────────────

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            det(0.0, 0.0, 100.0, 100.0, 0.9),
            det(5.0, 5.0, 105.0, 105.0, 0.8),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping_in_confidence_order() {
        let mut dets = vec![
            det(200.0, 200.0, 250.0, 250.0, 0.6),
            det(0.0, 0.0, 50.0, 50.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].confidence, 0.9);
        assert_relative_eq!(kept[1].confidence, 0.6);
    }

    #[test]
    fn test_nms_empty_input() {
        let mut dets: Vec<RawDetection> = Vec::new();
        assert!(nms(&mut dets, 0.3).is_empty());
    }
}
