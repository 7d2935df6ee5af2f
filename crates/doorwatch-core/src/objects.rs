//! YOLOv8 object detector via ONNX Runtime.
//!
//! Runs the COCO-trained YOLOv8 model with letterbox preprocessing and
//! class-aware NMS post-processing. Output layout is the standard
//! `[1, 84, N]` export: 4 box values plus 80 class scores, feature-major.

use crate::imageops::{resize_rgb, Letterbox};
use crate::labels::{self, PERSON_CLASS_ID};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants (no magic numbers) ---
const YOLO_INPUT_SIZE: usize = 640;
const YOLO_BOX_FEATURES: usize = 4;
const YOLO_NUM_CLASSES: usize = 80;
const YOLO_FEATURES: usize = YOLO_BOX_FEATURES + YOLO_NUM_CLASSES;
const YOLO_CONFIDENCE_THRESHOLD: f32 = 0.25;
const YOLO_NMS_THRESHOLD: f32 = 0.45;
/// Ultralytics letterbox padding gray, pre-normalization.
const YOLO_PAD_VALUE: f32 = 114.0;

#[derive(Error, Debug)]
pub enum ObjectDetectorError {
    #[error("model file not found: {0} — export yolov8n.onnx and place in models/")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// A detected object: bounding box in source-frame pixels plus COCO class.
#[derive(Debug, Clone)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub class_id: usize,
    pub confidence: f32,
}

impl Detection {
    /// COCO class name for this detection.
    pub fn label(&self) -> &'static str {
        labels::class_name(self.class_id)
    }

    pub fn is_person(&self) -> bool {
        self.class_id == PERSON_CLASS_ID
    }
}

/// YOLOv8-based object detector.
pub struct ObjectDetector {
    session: Session,
}

impl ObjectDetector {
    /// Load the YOLOv8 ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, ObjectDetectorError> {
        if !Path::new(model_path).exists() {
            return Err(ObjectDetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name().to_string()).collect::<Vec<_>>(),
            "loaded YOLOv8 model"
        );

        Ok(Self { session })
    }

    /// Detect objects in a packed RGB frame, returning detections sorted by
    /// confidence.
    pub fn detect(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, ObjectDetectorError> {
        let (input, letterbox) = preprocess(rgb, width as usize, height as usize);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ObjectDetectorError::InferenceFailed(format!("predictions: {e}")))?;

        if data.is_empty() || data.len() % YOLO_FEATURES != 0 {
            return Err(ObjectDetectorError::InferenceFailed(format!(
                "unexpected output length {} (not a multiple of {YOLO_FEATURES})",
                data.len()
            )));
        }
        let candidates = data.len() / YOLO_FEATURES;

        let decoded = decode_predictions(
            data,
            candidates,
            YOLO_CONFIDENCE_THRESHOLD,
            &letterbox,
            width as f32,
            height as f32,
        );

        let mut result = nms(decoded, YOLO_NMS_THRESHOLD);
        result.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(result)
    }
}

/// Letterbox an RGB frame into the 640×640 NCHW input, normalized to [0, 1].
fn preprocess(rgb: &[u8], width: usize, height: usize) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::plan(width, height, YOLO_INPUT_SIZE);
    let resized = resize_rgb(rgb, width, height, letterbox.new_w, letterbox.new_h);

    let pad_x = letterbox.pad_x.floor() as usize;
    let pad_y = letterbox.pad_y.floor() as usize;
    let pad_norm = YOLO_PAD_VALUE / 255.0;

    let mut tensor = Array4::<f32>::from_elem((1, 3, YOLO_INPUT_SIZE, YOLO_INPUT_SIZE), pad_norm);

    for y in 0..letterbox.new_h {
        for x in 0..letterbox.new_w {
            let base = (y * letterbox.new_w + x) * 3;
            for c in 0..3 {
                tensor[[0, c, y + pad_y, x + pad_x]] = resized[base + c] as f32 / 255.0;
            }
        }
    }

    (tensor, letterbox)
}

/// Decode the feature-major `[84, N]` prediction block into detections.
///
/// Per candidate: `[cx, cy, w, h]` in model-input pixels followed by 80
/// class scores. Keeps the best class per candidate when it clears the
/// confidence threshold, mapped back to source-frame pixels.
fn decode_predictions(
    data: &[f32],
    candidates: usize,
    threshold: f32,
    letterbox: &Letterbox,
    frame_w: f32,
    frame_h: f32,
) -> Vec<Detection> {
    let mut detections = Vec::new();

    for i in 0..candidates {
        let mut best_class = 0usize;
        let mut best_score = 0.0f32;
        for c in 0..YOLO_NUM_CLASSES {
            let score = data[(YOLO_BOX_FEATURES + c) * candidates + i];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < threshold {
            continue;
        }

        let cx = data[i];
        let cy = data[candidates + i];
        let w = data[2 * candidates + i];
        let h = data[3 * candidates + i];

        let x1 = letterbox.unmap_x(cx - w / 2.0).clamp(0.0, frame_w);
        let y1 = letterbox.unmap_y(cy - h / 2.0).clamp(0.0, frame_h);
        let x2 = letterbox.unmap_x(cx + w / 2.0).clamp(0.0, frame_w);
        let y2 = letterbox.unmap_y(cy + h / 2.0).clamp(0.0, frame_h);

        detections.push(Detection {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            class_id: best_class,
            confidence: best_score,
        });
    }

    detections
}

/// Class-aware Non-Maximum Suppression: only detections of the same class
/// suppress each other.
fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].class_id != detections[j].class_id {
                continue;
            }
            if iou(&detections[i], &detections[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Compute Intersection-over-Union between two detections.
fn iou(a: &Detection, b: &Detection) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter_w = (x2 - x1).max(0.0);
    let inter_h = (y2 - y1).max(0.0);
    let inter_area = inter_w * inter_h;

    let area_a = a.width * a.height;
    let area_b = b.width * b.height;
    let union_area = area_a + area_b - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_detection(x: f32, y: f32, w: f32, h: f32, class_id: usize, conf: f32) -> Detection {
        Detection {
            x,
            y,
            width: w,
            height: h,
            class_id,
            confidence: conf,
        }
    }

    /// Build a feature-major [84, N] block with the given candidates:
    /// (cx, cy, w, h, class_id, score).
    fn synthetic_block(candidates: &[(f32, f32, f32, f32, usize, f32)]) -> Vec<f32> {
        let n = candidates.len();
        let mut data = vec![0.0f32; YOLO_FEATURES * n];
        for (i, &(cx, cy, w, h, class_id, score)) in candidates.iter().enumerate() {
            data[i] = cx;
            data[n + i] = cy;
            data[2 * n + i] = w;
            data[3 * n + i] = h;
            data[(YOLO_BOX_FEATURES + class_id) * n + i] = score;
        }
        data
    }

    #[test]
    fn test_decode_person() {
        // No padding: 640x640 source, identity letterbox.
        let lb = Letterbox::plan(640, 640, 640);
        let data = synthetic_block(&[(320.0, 320.0, 100.0, 200.0, 0, 0.9)]);

        let dets = decode_predictions(&data, 1, 0.25, &lb, 640.0, 640.0);
        assert_eq!(dets.len(), 1);
        assert!(dets[0].is_person());
        assert_eq!(dets[0].label(), "person");
        assert!((dets[0].x - 270.0).abs() < 1e-3);
        assert!((dets[0].y - 220.0).abs() < 1e-3);
        assert!((dets[0].width - 100.0).abs() < 1e-3);
        assert!((dets[0].height - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_below_threshold() {
        let lb = Letterbox::plan(640, 640, 640);
        let data = synthetic_block(&[(320.0, 320.0, 100.0, 100.0, 0, 0.1)]);
        assert!(decode_predictions(&data, 1, 0.25, &lb, 640.0, 640.0).is_empty());
    }

    #[test]
    fn test_decode_picks_best_class() {
        let lb = Letterbox::plan(640, 640, 640);
        let n = 1;
        let mut data = synthetic_block(&[(320.0, 320.0, 100.0, 100.0, 24, 0.6)]);
        // Second, weaker score on another class must lose.
        data[(YOLO_BOX_FEATURES + 26) * n] = 0.4;

        let dets = decode_predictions(&data, 1, 0.25, &lb, 640.0, 640.0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label(), "backpack");
    }

    #[test]
    fn test_decode_unmaps_letterbox_padding() {
        // 320x240 source: scale 2.0, pad_y 80. A box centered in the model
        // input maps back to the source center.
        let lb = Letterbox::plan(320, 240, 640);
        let data = synthetic_block(&[(320.0, 320.0, 64.0, 64.0, 0, 0.9)]);

        let dets = decode_predictions(&data, 1, 0.25, &lb, 320.0, 240.0);
        assert_eq!(dets.len(), 1);
        let cx = dets[0].x + dets[0].width / 2.0;
        let cy = dets[0].y + dets[0].height / 2.0;
        assert!((cx - 160.0).abs() < 0.5);
        assert!((cy - 120.0).abs() < 0.5);
    }

    #[test]
    fn test_nms_suppresses_same_class() {
        let detections = vec![
            make_detection(0.0, 0.0, 100.0, 100.0, 0, 0.9),
            make_detection(5.0, 5.0, 100.0, 100.0, 0, 0.8),
            make_detection(200.0, 200.0, 50.0, 50.0, 0, 0.7),
        ];
        let result = nms(detections, 0.45);
        assert_eq!(result.len(), 2);
        assert!((result[0].confidence - 0.9).abs() < 1e-6);
        assert!((result[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        // A person carrying a backpack: boxes overlap heavily but both stay.
        let detections = vec![
            make_detection(0.0, 0.0, 100.0, 100.0, 0, 0.9),
            make_detection(5.0, 5.0, 100.0, 100.0, 24, 0.8),
        ];
        let result = nms(detections, 0.45);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.45).is_empty());
    }

    #[test]
    fn test_iou_identical() {
        let a = make_detection(0.0, 0.0, 100.0, 100.0, 0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = make_detection(0.0, 0.0, 10.0, 10.0, 0, 1.0);
        let b = make_detection(20.0, 20.0, 10.0, 10.0, 0, 1.0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_shape_and_padding() {
        // 320x240 frame: letterbox pads top/bottom with the gray value.
        let rgb = vec![0u8; 320 * 240 * 3];
        let (tensor, lb) = preprocess(&rgb, 320, 240);

        assert_eq!(tensor.shape(), &[1, 3, YOLO_INPUT_SIZE, YOLO_INPUT_SIZE]);
        assert_eq!(lb.new_h, 480);

        let pad_norm = YOLO_PAD_VALUE / 255.0;
        // Inside the top padding band.
        assert!((tensor[[0, 0, 10, 320]] - pad_norm).abs() < 1e-6);
        // Inside the content region (black frame → 0.0).
        assert!(tensor[[0, 0, 320, 320]].abs() < 1e-6);
    }
}
