use crate::shared::frame::Frame;
use crate::shared::region::{Region, RegionSource};

/// Raw output of a fast face detector, in the coordinates of the frame it
/// was given (which may be a tile crop).
#[derive(Clone, Debug, PartialEq)]
pub struct FaceBox {
    pub top_left: [f64; 2],
    pub bottom_right: [f64; 2],
    pub probability: Option<f64>,
}

impl FaceBox {
    /// Converts to a region shifted by `origin`. A detector that reports no
    /// probability is taken at its word.
    pub fn to_region(&self, origin: (f64, f64), source: RegionSource) -> Region {
        Region::from_corners(
            self.top_left,
            self.bottom_right,
            source,
            self.probability.unwrap_or(1.0),
        )
        .translate(origin.0, origin.1)
    }
}

/// Domain interface for a fast face detector tuned for small inputs.
///
/// Must accept both whole frames and arbitrary crops. Implementations may
/// keep scratch state, hence `&mut self`.
pub trait FastFaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}
