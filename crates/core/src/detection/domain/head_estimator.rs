use crate::detection::domain::object_detector::{DetectedObject, ObjectDetector};
use crate::shared::frame::Frame;
use crate::shared::region::{Region, RegionSource};

/// Person boxes at or below this score are ignored.
pub const PERSON_MIN_SCORE: f64 = 0.35;

/// Head height as a fraction of the person box height.
const HEAD_HEIGHT_RATIO: f64 = 0.25;

/// Head width as a fraction of the person box width.
const HEAD_WIDTH_RATIO: f64 = 0.45;

/// Approximates head boxes from full-body person boxes.
///
/// A crude geometric fallback for faces the fast detector misses (profiles,
/// occlusion, low resolution): trades precision for recall.
pub struct HeadRegionEstimator {
    min_score: f64,
}

impl HeadRegionEstimator {
    pub fn new(min_score: f64) -> Self {
        Self { min_score }
    }

    pub fn estimate(&self, objects: &[DetectedObject]) -> Vec<Region> {
        objects
            .iter()
            .filter(|o| o.is_person() && o.score > self.min_score)
            .map(head_of)
            .collect()
    }

    /// Runs the object detector and estimates heads. A detector failure
    /// contributes no regions.
    pub fn detect(&self, detector: &mut dyn ObjectDetector, frame: &Frame) -> Vec<Region> {
        match detector.detect(frame) {
            Ok(objects) => {
                let heads = self.estimate(&objects);
                log::debug!(
                    "Head estimator: {} objects, {} head regions",
                    objects.len(),
                    heads.len()
                );
                heads
            }
            Err(e) => {
                log::warn!("Object detector failed: {e}");
                Vec::new()
            }
        }
    }
}

impl Default for HeadRegionEstimator {
    fn default() -> Self {
        Self::new(PERSON_MIN_SCORE)
    }
}

fn head_of(person: &DetectedObject) -> Region {
    let [x, y, w, h] = person.bbox;
    let head_w = w * HEAD_WIDTH_RATIO;
    let head_h = h * HEAD_HEIGHT_RATIO;
    Region::new(
        x + (w - head_w) / 2.0,
        y,
        head_w,
        head_h,
        RegionSource::Head,
        person.score,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn object(class: &str, score: f64, bbox: [f64; 4]) -> DetectedObject {
        DetectedObject {
            class: class.to_string(),
            score,
            bbox,
        }
    }

    struct StubObjectDetector {
        result: Option<Vec<DetectedObject>>,
    }

    impl ObjectDetector for StubObjectDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<DetectedObject>, Box<dyn std::error::Error>> {
            self.result.clone().ok_or_else(|| "no model".into())
        }
    }

    #[test]
    fn test_head_geometry() {
        let heads =
            HeadRegionEstimator::default().estimate(&[object("person", 0.9, [0.0, 0.0, 100.0, 200.0])]);
        assert_eq!(heads.len(), 1);
        assert_relative_eq!(heads[0].x, 27.5);
        assert_relative_eq!(heads[0].y, 0.0);
        assert_relative_eq!(heads[0].width, 45.0);
        assert_relative_eq!(heads[0].height, 50.0);
        assert_eq!(heads[0].source, RegionSource::Head);
        assert_relative_eq!(heads[0].score, 0.9);
    }

    #[test]
    fn test_head_anchored_to_offset_box() {
        let heads = HeadRegionEstimator::default()
            .estimate(&[object("person", 0.6, [300.0, 120.0, 80.0, 240.0])]);
        assert_relative_eq!(heads[0].x, 300.0 + 22.0);
        assert_relative_eq!(heads[0].y, 120.0);
        assert_relative_eq!(heads[0].width, 36.0);
        assert_relative_eq!(heads[0].height, 60.0);
    }

    #[rstest]
    #[case::not_a_person("car", 0.9)]
    #[case::at_threshold("person", 0.35)]
    #[case::below_threshold("person", 0.2)]
    fn test_filtered_out(#[case] class: &str, #[case] score: f64) {
        let heads = HeadRegionEstimator::default()
            .estimate(&[object(class, score, [0.0, 0.0, 100.0, 200.0])]);
        assert!(heads.is_empty());
    }

    #[test]
    fn test_detect_runs_detector() {
        let mut detector = StubObjectDetector {
            result: Some(vec![
                object("person", 0.8, [0.0, 0.0, 100.0, 200.0]),
                object("dog", 0.8, [200.0, 0.0, 50.0, 50.0]),
            ]),
        };
        let frame = Frame::new(vec![0u8; 12], 2, 2, 3);
        let heads = HeadRegionEstimator::default().detect(&mut detector, &frame);
        assert_eq!(heads.len(), 1);
    }

    #[test]
    fn test_detector_failure_yields_nothing() {
        let mut detector = StubObjectDetector { result: None };
        let frame = Frame::new(vec![0u8; 12], 2, 2, 3);
        assert!(HeadRegionEstimator::default()
            .detect(&mut detector, &frame)
            .is_empty());
    }
}
