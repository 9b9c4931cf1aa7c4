//! Face detection: the `Detector` seam and an SCRFD implementation on ONNX Runtime.
//!
//! SCRFD is anchor-free over three strides with NMS post-processing. Only the
//! score and box heads are decoded; exports with or without the keypoint head
//! (9 or 6 outputs) both load.

use crate::frame::Frame;
use crate::types::BoundingBox;
use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const SCRFD_INPUT_SIZE: usize = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} (download det_10g.onnx from insightface)")]
    ModelNotFound(String),
    #[error("frame buffer does not match {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Anything that can find faces in a frame.
///
/// Implementations may keep state between frames, hence `&mut self`.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectorError>;
}

/// Metadata for coordinate de-mapping after letterbox resize.
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Output tensor indices for one stride: (score_idx, bbox_idx).
type StrideOutputIndices = (usize, usize);

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    confidence_threshold: f32,
    stride_indices: [StrideOutputIndices; 3],
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &Path, confidence_threshold: f32) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            confidence_threshold,
            "loaded SCRFD model"
        );

        if output_names.len() < 6 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model needs at least 6 outputs (3 strides × score/bbox), got {}",
                output_names.len()
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self {
            session,
            confidence_threshold,
            stride_indices,
        })
    }

    /// Scale a grayscale frame into the 640×640 letterboxed NCHW input tensor.
    fn preprocess(&self, frame: &Frame) -> Result<(Array4<f32>, LetterboxInfo), DetectorError> {
        let image = frame.to_image().ok_or(DetectorError::InvalidFrame {
            width: frame.width,
            height: frame.height,
        })?;
        if frame.width == 0 || frame.height == 0 {
            return Err(DetectorError::InvalidFrame {
                width: frame.width,
                height: frame.height,
            });
        }

        let size = SCRFD_INPUT_SIZE as f32;
        let scale = (size / frame.width as f32).min(size / frame.height as f32);
        let input = SCRFD_INPUT_SIZE as u32;
        let new_w = ((frame.width as f32 * scale).round() as u32).clamp(1, input);
        let new_h = ((frame.height as f32 * scale).round() as u32).clamp(1, input);
        let pad_x = (input - new_w) / 2;
        let pad_y = (input - new_h) / 2;

        let resized: GrayImage =
            image::imageops::resize(&image, new_w, new_h, FilterType::Triangle);

        // Padding normalizes to 0.0.
        let mut tensor = Array4::<f32>::zeros((1, 3, SCRFD_INPUT_SIZE, SCRFD_INPUT_SIZE));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let normalized = (pixel.0[0] as f32 - SCRFD_MEAN) / SCRFD_STD;
            let (tx, ty) = ((x + pad_x) as usize, (y + pad_y) as usize);
            // Grayscale replicated into all three channels.
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = normalized;
            }
        }

        Ok((
            tensor,
            LetterboxInfo {
                scale,
                pad_x: pad_x as f32,
                pad_y: pad_y as f32,
            },
        ))
    }
}

impl Detector for FaceDetector {
    /// Boxes are returned sorted by confidence, highest first.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectorError> {
        let (input, letterbox) = self.preprocess(frame)?;

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut all_detections = Vec::new();
        for (stride_pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx) = self.stride_indices[stride_pos];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    DetectorError::InferenceFailed(format!("scores stride {stride}: {e}"))
                })?;
            let (_, bboxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}"))
                })?;

            all_detections.extend(decode_stride(
                scores,
                bboxes,
                stride,
                &letterbox,
                self.confidence_threshold,
            ));
        }

        let mut result = nms(all_detections, SCRFD_NMS_THRESHOLD);
        result.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(std::cmp::Ordering::Equal));

        tracing::trace!(seq = frame.sequence, faces = result.len(), "SCRFD detect");
        Ok(result)
    }
}

fn score(b: &BoundingBox) -> f32 {
    b.confidence.unwrap_or(0.0)
}

/// Map output tensors to strides.
///
/// Named exports ("score_8", "bbox_16", ...) are matched by name. Anything
/// else falls back to the standard positional order: [0-2] scores, [3-5]
/// boxes (keypoints, if present, follow at [6-8] and are ignored).
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let named: Option<Vec<StrideOutputIndices>> = SCRFD_STRIDES
        .iter()
        .map(|&stride| Some((find("score", stride)?, find("bbox", stride)?)))
        .collect();

    match named {
        Some(found) => {
            tracing::info!("SCRFD: using name-based output tensor mapping");
            [found[0], found[1], found[2]]
        }
        None => {
            tracing::info!(?names, "SCRFD: output names not recognized, using positional mapping");
            [(0, 3), (1, 4), (2, 5)]
        }
    }
}

/// Decode detections for a single stride level.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    stride: usize,
    letterbox: &LetterboxInfo,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid = SCRFD_INPUT_SIZE / stride;
    let num_anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;
    let s = stride as f32;

    let mut detections = Vec::new();
    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }

        let off = idx * 4;
        let Some(d) = bboxes.get(off..off + 4) else {
            continue;
        };

        let cell = idx / SCRFD_ANCHORS_PER_CELL;
        let anchor_x = (cell % grid) as f32 * s;
        let anchor_y = (cell / grid) as f32 * s;

        // Distances to the four edges, in stride units; then undo the letterbox.
        let x1 = (anchor_x - d[0] * s - letterbox.pad_x) / letterbox.scale;
        let y1 = (anchor_y - d[1] * s - letterbox.pad_y) / letterbox.scale;
        let x2 = (anchor_x + d[2] * s - letterbox.pad_x) / letterbox.scale;
        let y2 = (anchor_y + d[3] * s - letterbox.pad_y) / letterbox.scale;

        detections.push(BoundingBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: Some(score),
        });
    }

    detections
}

/// Non-Maximum Suppression: remove overlapping detections.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep: Vec<BoundingBox> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| iou(k, &det) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

/// Intersection-over-Union between two bounding boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_w = ((a.x + a.width).min(b.x + b.width) - a.x.max(b.x)).max(0.0);
    let inter_h = ((a.y + a.height).min(b.y + b.height) - a.y.max(b.y)).max(0.0);
    let inter_area = inter_w * inter_h;
    let union_area = a.width * a.height + b.width * b.height - inter_area;

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
        BoundingBox { x, y, width: w, height: h, confidence: Some(conf) }
    }

    const IDENTITY: LetterboxInfo = LetterboxInfo { scale: 1.0, pad_x: 0.0, pad_y: 0.0 };

    #[test]
    fn test_iou_identical() {
        let a = make_bbox(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = make_bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = make_bbox(20.0, 20.0, 10.0, 10.0, 1.0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_partial() {
        let a = make_bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = make_bbox(5.0, 0.0, 10.0, 10.0, 1.0);
        // Overlap 50, union 150
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let detections = vec![
            make_bbox(5.0, 5.0, 100.0, 100.0, 0.8),
            make_bbox(0.0, 0.0, 100.0, 100.0, 0.9),
            make_bbox(200.0, 200.0, 50.0, 50.0, 0.7),
        ];
        let result = nms(detections, 0.4);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].confidence, Some(0.9));
        assert_eq!(result[1].confidence, Some(0.7));
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_decode_stride_single_anchor() {
        // Stride 32 -> 20x20 grid, 800 anchors. Light up anchor 2 (cell 1: x=32, y=0).
        let mut scores = vec![0.0f32; 800];
        scores[2] = 0.9;
        let mut bboxes = vec![0.0f32; 800 * 4];
        bboxes[8..12].copy_from_slice(&[0.5, 0.0, 1.0, 2.0]);

        let dets = decode_stride(&scores, &bboxes, 32, &IDENTITY, 0.5);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.x - 16.0).abs() < 1e-4);
        assert!((d.y - 0.0).abs() < 1e-4);
        assert!((d.width - 48.0).abs() < 1e-4);
        assert!((d.height - 64.0).abs() < 1e-4);
        assert_eq!(d.confidence, Some(0.9));
    }

    #[test]
    fn test_decode_stride_threshold_and_letterbox() {
        let mut scores = vec![0.0f32; 800];
        scores[0] = 0.4; // below threshold
        scores[1] = 0.6;
        let mut bboxes = vec![0.0f32; 800 * 4];
        bboxes[4..8].copy_from_slice(&[0.0, 0.0, 1.0, 1.0]);

        let letterbox = LetterboxInfo { scale: 2.0, pad_x: 0.0, pad_y: 80.0 };
        let dets = decode_stride(&scores, &bboxes, 32, &letterbox, 0.5);
        assert_eq!(dets.len(), 1);
        // Anchor (0,0), box 0..32 in input space -> 0..16 in frame, y shifted by -80/2.
        assert!((dets[0].x - 0.0).abs() < 1e-4);
        assert!((dets[0].y + 40.0).abs() < 1e-4);
        assert!((dets[0].width - 16.0).abs() < 1e-4);
    }

    #[test]
    fn test_discover_output_indices_named() {
        let names: Vec<String> = [
            "bbox_8", "kps_8", "score_8",
            "bbox_16", "kps_16", "score_16",
            "bbox_32", "kps_32", "score_32",
        ].iter().map(|s| s.to_string()).collect();

        let indices = discover_output_indices(&names);
        assert_eq!(indices, [(2, 0), (5, 3), (8, 6)]);
    }

    #[test]
    fn test_discover_output_indices_without_keypoints() {
        let names: Vec<String> = ["score_8", "score_16", "score_32", "bbox_8", "bbox_16", "bbox_32"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(discover_output_indices(&names), [(0, 3), (1, 4), (2, 5)]);
    }

    #[test]
    fn test_discover_output_indices_positional_fallback() {
        let names: Vec<String> = (0..9).map(|i: usize| i.to_string()).collect();
        assert_eq!(discover_output_indices(&names), [(0, 3), (1, 4), (2, 5)]);
    }
}
