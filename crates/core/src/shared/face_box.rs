use serde::{Deserialize, Serialize};

/// A detected face bounding box in frame-pixel units.
///
/// Produced by a `FaceDetector` for one frame and discarded afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Geometric center of a face box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl FaceBox {
    pub fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    pub fn centroid(&self) -> Centroid {
        Centroid {
            x: self.origin_x + self.width / 2.0,
            y: self.origin_y + self.height / 2.0,
        }
    }

    /// True when the box cannot yield a meaningful centroid: collapsed or
    /// negative extent, or any non-finite coordinate.
    pub fn is_degenerate(&self) -> bool {
        let finite = self.origin_x.is_finite()
            && self.origin_y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite();
        !finite || self.width <= 0.0 || self.height <= 0.0
    }
}

impl Centroid {
    pub fn distance_to(&self, other: &Centroid) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
