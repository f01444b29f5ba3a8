use serde::{Deserialize, Serialize};

/// Bounding box of a detection, in corner layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum x coordinate of the bounding box.
    pub xmin: f32,
    /// Minimum y coordinate of the bounding box.
    pub ymin: f32,
    /// Maximum x coordinate of the bounding box.
    pub xmax: f32,
    /// Maximum y coordinate of the bounding box.
    pub ymax: f32,
}

impl BoundingBox {
    /// Build a box from the YOLO centre layout `(x_center, y_center, width, height)`.
    pub fn from_center(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            xmin: x - w / 2.0,
            ymin: y - h / 2.0,
            xmax: x + w / 2.0,
            ymax: y + h / 2.0,
        }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Scale the box, e.g. from normalized to pixel coordinates.
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self {
            xmin: self.xmin * sx,
            ymin: self.ymin * sy,
            xmax: self.xmax * sx,
            ymax: self.ymax * sy,
        }
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.1}, {:.1}, {:.1}, {:.1}]",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}
