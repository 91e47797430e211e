use crate::shared::frame::Frame;

pub const PERSON_CLASS: &str = "person";

/// One labelled box from a general object detector. `bbox` is `[x, y, w, h]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedObject {
    pub class: String,
    pub score: f64,
    pub bbox: [f64; 4],
}

impl DetectedObject {
    pub fn is_person(&self) -> bool {
        self.class == PERSON_CLASS
    }
}

/// Domain interface for a general (multi-class) object detector.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedObject>, Box<dyn std::error::Error>>;
}
