//! Box math shared by the ONNX detection backends.

/// A decoded detection in `[x1, y1, x2, y2]` corner form.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredBox {
    pub corners: [f64; 4],
    pub score: f64,
    /// Class index for multi-class models; 0 for single-class ones.
    pub class_id: usize,
}

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Greedy non-maximum suppression.
///
/// Boxes are visited by descending score; a box is dropped when it overlaps
/// an already kept box of the same class by more than `iou_thresh`.
pub fn nms(mut boxes: Vec<ScoredBox>, iou_thresh: f64) -> Vec<ScoredBox> {
    boxes.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<ScoredBox> = Vec::new();
    for candidate in boxes {
        let suppressed = keep.iter().any(|k| {
            k.class_id == candidate.class_id && bbox_iou(&k.corners, &candidate.corners) > iou_thresh
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(corners: [f64; 4], score: f64, class_id: usize) -> ScoredBox {
        ScoredBox {
            corners,
            score,
            class_id,
        }
    }

    #[test]
    fn test_bbox_iou_no_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [20.0, 20.0, 30.0, 30.0];
        assert_eq!(bbox_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_bbox_iou_partial_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [5.0, 5.0, 15.0, 15.0];
        assert!((bbox_iou(&a, &b) - 25.0 / 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_nms_suppresses_overlap_keeps_best() {
        let kept = nms(
            vec![
                scored([5.0, 5.0, 105.0, 105.0], 0.7, 0),
                scored([0.0, 0.0, 100.0, 100.0], 0.9, 0),
            ],
            0.3,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_separate() {
        let kept = nms(
            vec![
                scored([0.0, 0.0, 50.0, 50.0], 0.9, 0),
                scored([200.0, 200.0, 250.0, 250.0], 0.8, 0),
            ],
            0.3,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_is_class_aware() {
        let kept = nms(
            vec![
                scored([0.0, 0.0, 100.0, 100.0], 0.9, 0),
                scored([0.0, 0.0, 100.0, 100.0], 0.8, 2),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(-10.0) < 0.001);
        assert!((sigmoid(10.0) - 1.0).abs() < 0.001);
    }
}
