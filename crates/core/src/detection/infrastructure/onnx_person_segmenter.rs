/// Selfie/person segmentation model using ONNX Runtime via `ort`.
///
/// Accepts both NHWC (MediaPipe export) and NCHW models; the layout is read
/// from the model's input shape.
use std::path::Path;

use crate::detection::domain::person_segmenter::{
    PersonSegmenter, SegmentationConfig, SegmentationMask,
};
use crate::shared::frame::Frame;

use super::execution_provider::load_session;

/// Input resolution when the model's shape is dynamic.
const DEFAULT_INPUT_SIZE: (usize, usize) = (256, 256);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    Nhwc,
    Nchw,
}

pub struct OnnxPersonSegmenter {
    session: ort::session::Session,
    layout: Layout,
    /// `(width, height)` of the model input.
    input_size: (usize, usize),
}

impl OnnxPersonSegmenter {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let dims: Vec<i64> = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } => Some(shape.to_vec()),
                _ => None,
            })
            .unwrap_or_default();
        let (layout, input_size) = input_geometry(&dims);
        log::info!(
            "Loaded segmentation model from {} ({:?}, {}x{})",
            model_path.display(),
            layout,
            input_size.0,
            input_size.1
        );
        Ok(Self {
            session,
            layout,
            input_size,
        })
    }
}

impl PersonSegmenter for OnnxPersonSegmenter {
    fn segment(
        &mut self,
        frame: &Frame,
        config: &SegmentationConfig,
    ) -> Result<SegmentationMask, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(SegmentationMask {
                width: frame.width(),
                height: frame.height(),
                data: Vec::new(),
            });
        }

        let input = preprocess(frame, self.layout, self.input_size);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Segmentation model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let probs = tensor.as_slice().ok_or("Cannot get mask slice")?;

        let (mw, mh) = mask_size(tensor.shape()).ok_or_else(|| {
            format!("Unexpected segmentation output shape: {:?}", tensor.shape())
        })?;
        if probs.len() < mw * mh {
            return Err("Segmentation output shorter than its shape".into());
        }

        Ok(upsample_threshold(
            &probs[..mw * mh],
            (mw, mh),
            (frame.width(), frame.height()),
            config.threshold,
        ))
    }
}

/// Layout and `(width, height)` from an input shape; dynamic or unreadable
/// dimensions fall back to NHWC 256x256.
fn input_geometry(dims: &[i64]) -> (Layout, (usize, usize)) {
    if dims.len() != 4 {
        return (Layout::Nhwc, DEFAULT_INPUT_SIZE);
    }
    let (layout, h, w) = if dims[1] == 3 {
        (Layout::Nchw, dims[2], dims[3])
    } else {
        (Layout::Nhwc, dims[1], dims[2])
    };
    if h > 0 && w > 0 {
        (layout, (w as usize, h as usize))
    } else {
        (layout, DEFAULT_INPUT_SIZE)
    }
}

/// `(width, height)` of a single-channel mask shaped `[1, H, W, 1]`,
/// `[1, 1, H, W]`, `[1, H, W]` or `[H, W]`. Empty masks are rejected.
fn mask_size(shape: &[usize]) -> Option<(usize, usize)> {
    match shape {
        [1, h, w, 1] | [1, 1, h, w] | [1, h, w] | [h, w] if *h > 0 && *w > 0 => Some((*w, *h)),
        _ => None,
    }
}

/// Nearest-neighbour resize to the model input, normalized to [0,1].
fn preprocess(frame: &Frame, layout: Layout, (w, h): (usize, usize)) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let shape = match layout {
        Layout::Nhwc => (1, h, w, 3),
        Layout::Nchw => (1, 3, h, w),
    };

    let mut tensor = ndarray::Array4::<f32>::zeros(shape);
    for y in 0..h {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / h as f64) as usize).min(src_h - 1);
        for x in 0..w {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / w as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                let v = src[[src_y, src_x, c]] as f32 / 255.0;
                match layout {
                    Layout::Nhwc => tensor[[0, y, x, c]] = v,
                    Layout::Nchw => tensor[[0, c, y, x]] = v,
                }
            }
        }
    }
    tensor
}

/// Scales a probability map to the frame size (nearest neighbour) and marks
/// pixels at or above `threshold` as person.
fn upsample_threshold(
    probs: &[f32],
    (mw, mh): (usize, usize),
    (fw, fh): (u32, u32),
    threshold: f32,
) -> SegmentationMask {
    let (w, h) = (fw as usize, fh as usize);
    let mut data = vec![0u8; w * h];
    for y in 0..h {
        let my = (y * mh / h).min(mh - 1);
        for x in 0..w {
            let mx = (x * mw / w).min(mw - 1);
            if probs[my * mw + mx] >= threshold {
                data[y * w + x] = 1;
            }
        }
    }
    SegmentationMask {
        width: fw,
        height: fh,
        data,
    }
}
