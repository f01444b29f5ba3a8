use serde::{Deserialize, Serialize};

use crate::{BoundingBox, Label};

/// A single detection: class label, confidence and optional geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label.
    pub label: Label,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Box of the detection, absent for classification-only outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    /// Create a detection without geometry.
    pub fn new(label: Label, confidence: f32) -> Self {
        Self {
            label,
            confidence,
            bbox: None,
        }
    }

    /// Attach a bounding box.
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// Reduce the raw detections of one frame to the most confident one.
///
/// A later detection only replaces the current pick when its confidence is
/// strictly greater, so the first of several equal detections wins.
/// Returns `None` for a frame without detections.
pub fn best_detection<I>(detections: I) -> Option<Detection>
where
    I: IntoIterator<Item = Detection>,
{
    detections.into_iter().fold(None, |best, detection| match best {
        Some(current) if detection.confidence <= current.confidence => Some(current),
        _ => Some(detection),
    })
}
