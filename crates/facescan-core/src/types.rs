use serde::{Deserialize, Serialize};

/// Raw detector output in frame pixel coordinates.
///
/// Coordinates may be fractional, negative or extend past the frame edge;
/// [`Detection::from_bbox`] turns them into something safe to crop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Detector score, if the detector produces one.
    pub confidence: Option<f32>,
}

/// Integer face rectangle, guaranteed to lie inside the frame it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A validated detection: a non-empty in-frame region plus an optional
/// confidence in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub region: FaceRegion,
    pub confidence: Option<f32>,
}

impl Detection {
    /// Validate a raw bounding box against the frame it was detected in.
    ///
    /// The box is expanded outward to whole pixels and clamped to the frame.
    /// Boxes with non-finite coordinates or no area after clamping are
    /// rejected. A NaN confidence is dropped; finite ones are clamped to [0, 1].
    pub fn from_bbox(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> Option<Self> {
        if ![bbox.x, bbox.y, bbox.width, bbox.height]
            .iter()
            .all(|v| v.is_finite())
        {
            return None;
        }

        let x0 = bbox.x.floor().clamp(0.0, frame_width as f32) as u32;
        let y0 = bbox.y.floor().clamp(0.0, frame_height as f32) as u32;
        let x1 = (bbox.x + bbox.width).ceil().clamp(0.0, frame_width as f32) as u32;
        let y1 = (bbox.y + bbox.height).ceil().clamp(0.0, frame_height as f32) as u32;

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let confidence = bbox
            .confidence
            .filter(|c| !c.is_nan())
            .map(|c| c.clamp(0.0, 1.0));

        Some(Self {
            region: FaceRegion {
                x: x0,
                y: y0,
                width: x1 - x0,
                height: y1 - y0,
            },
            confidence,
        })
    }
}
