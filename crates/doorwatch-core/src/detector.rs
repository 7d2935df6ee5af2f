//! SCRFD face detector via ONNX Runtime.
//!
//! Anchor-free face detection over three stride levels with 5-point
//! landmarks, used to locate faces for the recognition pipeline. Operates on
//! the luma plane of the captured frame.

use crate::imageops::{resize_luma, Letterbox};
use crate::types::BoundingBox;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants (no magic numbers) ---
const SCRFD_INPUT_SIZE: usize = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;
/// Output tensor layout of the det_10g export:
/// [0-2] = scores, [3-5] = bboxes, [6-8] = landmarks, each per stride 8/16/32.
const SCRFD_OUTPUTS: usize = 9;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download det_10g.onnx from insightface and place in models/")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let num_outputs = session.outputs().len();
        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = num_outputs,
            "loaded SCRFD model"
        );

        if num_outputs < SCRFD_OUTPUTS {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires {SCRFD_OUTPUTS} outputs (3 strides × score/bbox/kps), got {num_outputs}"
            )));
        }

        Ok(Self { session })
    }

    /// Detect faces in a grayscale frame, returning bounding boxes with
    /// landmarks, sorted by confidence.
    pub fn detect(
        &mut self,
        luma: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        let (input, letterbox) = preprocess(luma, width as usize, height as usize);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut all_detections = Vec::new();

        for (stride_pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (_, scores) = outputs[stride_pos]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, bboxes) = outputs[3 + stride_pos]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}")))?;
            let (_, kps) = outputs[6 + stride_pos]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("kps stride {stride}: {e}")))?;

            all_detections.extend(decode_stride(
                scores,
                bboxes,
                kps,
                stride,
                &letterbox,
                SCRFD_CONFIDENCE_THRESHOLD,
            ));
        }

        let mut result = nms(all_detections, SCRFD_NMS_THRESHOLD);
        result.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(result)
    }
}

/// Letterbox a luma frame into the 640×640 NCHW input with the SCRFD
/// normalization, replicating the single channel to all three.
fn preprocess(luma: &[u8], width: usize, height: usize) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::plan(width, height, SCRFD_INPUT_SIZE);
    let resized = resize_luma(luma, width, height, letterbox.new_w, letterbox.new_h);

    let pad_x = letterbox.pad_x.floor() as usize;
    let pad_y = letterbox.pad_y.floor() as usize;

    // Pad with SCRFD_MEAN so the padding normalizes to 0.0.
    let mut tensor = Array4::<f32>::zeros((1, 3, SCRFD_INPUT_SIZE, SCRFD_INPUT_SIZE));

    for y in 0..SCRFD_INPUT_SIZE {
        for x in 0..SCRFD_INPUT_SIZE {
            let pixel = if y >= pad_y
                && y < pad_y + letterbox.new_h
                && x >= pad_x
                && x < pad_x + letterbox.new_w
            {
                resized[(y - pad_y) * letterbox.new_w + (x - pad_x)] as f32
            } else {
                SCRFD_MEAN
            };

            let normalized = (pixel - SCRFD_MEAN) / SCRFD_STD;
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }

    (tensor, letterbox)
}

/// Decode detections for a single stride level.
///
/// Anchors sit at `stride`-spaced grid centers with two anchors per cell;
/// box and landmark offsets are expressed in stride units from the anchor.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    kps: &[f32],
    stride: usize,
    letterbox: &Letterbox,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid_w = SCRFD_INPUT_SIZE / stride;
    let grid_h = SCRFD_INPUT_SIZE / stride;
    let num_anchors = grid_h * grid_w * SCRFD_ANCHORS_PER_CELL;

    let mut detections = Vec::new();

    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }

        let anchor_idx = idx / SCRFD_ANCHORS_PER_CELL;
        let anchor_cx = (anchor_idx % grid_w) as f32 * stride as f32;
        let anchor_cy = (anchor_idx / grid_w) as f32 * stride as f32;

        let bbox_off = idx * 4;
        if bbox_off + 3 >= bboxes.len() {
            continue;
        }
        let x1 = letterbox.unmap_x(anchor_cx - bboxes[bbox_off] * stride as f32);
        let y1 = letterbox.unmap_y(anchor_cy - bboxes[bbox_off + 1] * stride as f32);
        let x2 = letterbox.unmap_x(anchor_cx + bboxes[bbox_off + 2] * stride as f32);
        let y2 = letterbox.unmap_y(anchor_cy + bboxes[bbox_off + 3] * stride as f32);

        let kps_off = idx * 10;
        let landmarks = if kps_off + 9 < kps.len() {
            let mut lms = [(0.0f32, 0.0f32); 5];
            for (i, lm) in lms.iter_mut().enumerate() {
                let lx = anchor_cx + kps[kps_off + i * 2] * stride as f32;
                let ly = anchor_cy + kps[kps_off + i * 2 + 1] * stride as f32;
                *lm = (letterbox.unmap_x(lx), letterbox.unmap_y(ly));
            }
            Some(lms)
        } else {
            None
        };

        detections.push(BoundingBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: score,
            landmarks,
        });
    }

    detections
}

/// Non-Maximum Suppression over face boxes.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
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
            if suppressed[j] {
                continue;
            }
            if iou(&detections[i], &detections[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
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

    fn make_bbox(x: f32, y: f32, w: f32, h: f32, conf: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width: w,
            height: h,
            confidence: conf,
            landmarks: None,
        }
    }

    #[test]
    fn test_iou_identical() {
        let a = make_bbox(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_partial() {
        let a = make_bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = make_bbox(5.0, 0.0, 10.0, 10.0, 1.0);
        // Overlap: 5x10 = 50, union: 100+100-50 = 150
        let expected = 50.0 / 150.0;
        assert!((iou(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let detections = vec![
            make_bbox(0.0, 0.0, 100.0, 100.0, 0.9),
            make_bbox(5.0, 5.0, 100.0, 100.0, 0.8),
            make_bbox(200.0, 200.0, 50.0, 50.0, 0.7),
        ];
        let result = nms(detections, 0.4);
        assert_eq!(result.len(), 2);
        assert!((result[0].confidence - 0.9).abs() < 1e-6);
        assert!((result[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_decode_stride_single_anchor() {
        // 640x640 source: identity letterbox. Put one confident anchor at
        // grid cell (1, 1) of stride 32, first anchor of the cell.
        let lb = Letterbox::plan(640, 640, 640);
        let grid = SCRFD_INPUT_SIZE / 32;
        let num_anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;

        let mut scores = vec![0.0f32; num_anchors];
        let mut bboxes = vec![0.0f32; num_anchors * 4];
        let kps = vec![0.0f32; num_anchors * 10];

        // anchor_idx = row * grid_w + col = 1 * 20 + 1 = 21; two anchors per cell.
        let idx = 21 * SCRFD_ANCHORS_PER_CELL;
        scores[idx] = 0.9;
        // Offsets of one stride unit in every direction → a 64x64 box
        // centered on the anchor at (32, 32).
        bboxes[idx * 4] = 1.0;
        bboxes[idx * 4 + 1] = 1.0;
        bboxes[idx * 4 + 2] = 1.0;
        bboxes[idx * 4 + 3] = 1.0;

        let dets = decode_stride(&scores, &bboxes, &kps, 32, &lb, SCRFD_CONFIDENCE_THRESHOLD);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.x - 0.0).abs() < 1e-3);
        assert!((d.y - 0.0).abs() < 1e-3);
        assert!((d.width - 64.0).abs() < 1e-3);
        assert!((d.height - 64.0).abs() < 1e-3);
        assert!(d.landmarks.is_some());
    }

    #[test]
    fn test_decode_stride_ignores_low_scores() {
        let lb = Letterbox::plan(640, 640, 640);
        let grid = SCRFD_INPUT_SIZE / 32;
        let num_anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;

        let scores = vec![0.2f32; num_anchors];
        let bboxes = vec![1.0f32; num_anchors * 4];
        let kps = vec![0.0f32; num_anchors * 10];

        let dets = decode_stride(&scores, &bboxes, &kps, 32, &lb, SCRFD_CONFIDENCE_THRESHOLD);
        assert!(dets.is_empty());
    }

    #[test]
    fn test_preprocess_padding_normalizes_to_zero() {
        // 320x240 source: top rows of the tensor are letterbox padding.
        let luma = vec![200u8; 320 * 240];
        let (tensor, lb) = preprocess(&luma, 320, 240);

        assert_eq!(tensor.shape(), &[1, 3, SCRFD_INPUT_SIZE, SCRFD_INPUT_SIZE]);
        assert!(tensor[[0, 0, 10, 320]].abs() < 1e-6);

        // Content region carries the normalized pixel on all 3 channels.
        let expected = (200.0 - SCRFD_MEAN) / SCRFD_STD;
        let y = lb.pad_y.floor() as usize + 10;
        assert!((tensor[[0, 0, y, 320]] - expected).abs() < 1e-6);
        assert!((tensor[[0, 1, y, 320]] - expected).abs() < 1e-6);
        assert!((tensor[[0, 2, y, 320]] - expected).abs() < 1e-6);
    }
}
