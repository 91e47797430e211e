/// COCO object detector (YOLOv8/YOLO11 export) using ONNX Runtime via `ort`.
///
/// Only person boxes matter downstream, but every class is decoded so the
/// detector satisfies the general `ObjectDetector` contract.
use std::path::Path;

use crate::detection::domain::object_detector::{DetectedObject, ObjectDetector};
use crate::shared::frame::Frame;

use super::execution_provider::load_session;
use super::math::{nms, ScoredBox};

/// Fallback input resolution when the model's input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

/// Box values (cx, cy, w, h) preceding the class scores in each row.
const BOX_VALUES: usize = 4;

/// Gray used for letterbox padding (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

pub struct OnnxYoloObjectDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloObjectDetector {
    /// Load a YOLO ONNX model. The input resolution is read from the model's
    /// NCHW input shape, falling back to 640 when it is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::info!(
            "Loaded object detector from {} (input {}x{})",
            model_path.display(),
            input_size,
            input_size
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloObjectDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedObject>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let (input_tensor, geometry) = letterbox(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let boxes = decode_output(data, tensor.shape(), self.confidence, &geometry)?;
        Ok(nms(boxes, NMS_IOU_THRESH)
            .into_iter()
            .map(|b| to_object(&b, frame.width() as f64, frame.height() as f64))
            .collect())
    }
}

/// How a frame was fitted into the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` x `target_size` NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, pad_y as usize + y, pad_x as usize + x]] =
                    src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, Letterbox { scale, pad_x, pad_y })
}

/// Decodes a `[1, 4 + classes, N]` (or transposed `[1, N, 4 + classes]`)
/// output into boxes in frame coordinates. Each row keeps only its best
/// class.
fn decode_output(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    geometry: &Letterbox,
) -> Result<Vec<ScoredBox>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    // Feature-major when features < detections.
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats <= BOX_VALUES {
        return Err(format!("YOLO output has no class scores: {shape:?}").into());
    }
    if data.len() < num_dets * num_feats {
        return Err("YOLO output shorter than its shape".into());
    }

    let value = |det: usize, feat: usize| {
        if transposed {
            data[feat * num_dets + det]
        } else {
            data[det * num_feats + feat]
        }
    };

    let mut boxes = Vec::new();
    for det in 0..num_dets {
        let (class_id, score) = (BOX_VALUES..num_feats)
            .map(|f| (f - BOX_VALUES, value(det, f) as f64))
            .fold((0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < confidence {
            continue;
        }

        let cx = value(det, 0) as f64;
        let cy = value(det, 1) as f64;
        let w = value(det, 2) as f64;
        let h = value(det, 3) as f64;
        let (x1, y1) = geometry.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = geometry.unmap(cx + w / 2.0, cy + h / 2.0);

        boxes.push(ScoredBox {
            corners: [x1, y1, x2, y2],
            score,
            class_id,
        });
    }
    Ok(boxes)
}

fn to_object(b: &ScoredBox, frame_w: f64, frame_h: f64) -> DetectedObject {
    let x1 = b.corners[0].clamp(0.0, frame_w);
    let y1 = b.corners[1].clamp(0.0, frame_h);
    let x2 = b.corners[2].clamp(0.0, frame_w);
    let y2 = b.corners[3].clamp(0.0, frame_h);
    let class = COCO_CLASSES
        .get(b.class_id)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("class_{}", b.class_id));
    DetectedObject {
        class,
        score: b.score,
        bbox: [x1, y1, x2 - x1, y2 - y1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IDENTITY: Letterbox = Letterbox {
        scale: 1.0,
        pad_x: 0,
        pad_y: 0,
    };

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // scale = min(640/200, 640/100) = 3.2 -> 640x320, pad_y = 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3);
        let (tensor, geometry) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(geometry.scale, 3.2, epsilon = 1e-9);
        assert_eq!(geometry.pad_x, 0);
        assert_eq!(geometry.pad_y, 160);
    }

    #[test]
    fn test_letterbox_pads_with_gray() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3);
        let (tensor, geometry) = letterbox(&frame, 640);
        let y = geometry.pad_y as usize + 1;
        assert!((tensor[[0, 0, y, 1]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 0, 0, 0]] - PAD_VALUE).abs() < 1e-6);
    }

    #[test]
    fn test_unmap_inverts_letterbox() {
        let geometry = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 100,
        };
        let (x, y) = geometry.unmap(200.0, 300.0);
        assert_relative_eq!(x, 100.0);
        assert_relative_eq!(y, 100.0);
    }

    #[test]
    fn test_decode_row_major_picks_best_class() {
        // 8 detections x (4 box + 3 classes); only the first is confident.
        let num_feats = 7;
        let mut data = vec![0.1f32; 8 * num_feats];
        data[..num_feats].copy_from_slice(&[50.0, 60.0, 20.0, 40.0, 0.1, 0.2, 0.9]);
        let boxes = decode_output(&data, &[1, 8, num_feats], 0.25, &IDENTITY).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, 2);
        assert_relative_eq!(boxes[0].score, 0.9, epsilon = 1e-6);
        assert_relative_eq!(boxes[0].corners[0], 40.0);
        assert_relative_eq!(boxes[0].corners[1], 40.0);
        assert_relative_eq!(boxes[0].corners[2], 60.0);
        assert_relative_eq!(boxes[0].corners[3], 80.0);
    }

    #[test]
    fn test_decode_feature_major() {
        // 5 features x 8 detections; only detection 3 is confident.
        let num_dets = 8;
        let mut data = vec![0.0f32; 5 * num_dets];
        data[3] = 100.0;
        data[num_dets + 3] = 50.0;
        data[2 * num_dets + 3] = 10.0;
        data[3 * num_dets + 3] = 10.0;
        data[4 * num_dets + 3] = 0.8;
        let boxes = decode_output(&data, &[1, 5, num_dets], 0.25, &IDENTITY).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, 0);
        assert_relative_eq!(boxes[0].corners[0], 95.0);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode_output(&[0.0; 4], &[1, 4], 0.25, &IDENTITY).is_err());
        assert!(decode_output(&[0.0; 8], &[1, 2, 4], 0.25, &IDENTITY).is_err());
    }

    #[test]
    fn test_to_object_clamps_and_names() {
        let b = ScoredBox {
            corners: [-10.0, 5.0, 50.0, 300.0],
            score: 0.7,
            class_id: 0,
        };
        let object = to_object(&b, 100.0, 200.0);
        assert_eq!(object.class, "person");
        assert!(object.is_person());
        assert_eq!(object.bbox, [0.0, 5.0, 50.0, 195.0]);
    }

    #[test]
    fn test_unknown_class_index_gets_placeholder_name() {
        let b = ScoredBox {
            corners: [0.0, 0.0, 1.0, 1.0],
            score: 0.7,
            class_id: 95,
        };
        assert_eq!(to_object(&b, 10.0, 10.0).class, "class_95");
    }
}
