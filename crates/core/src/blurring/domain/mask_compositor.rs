use thiserror::Error;

use crate::blurring::domain::alpha_mask::{AlphaMask, OPAQUE, TRANSPARENT};
use crate::shared::frame::Frame;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompositeError {
    #[error("overlay is {overlay_w}x{overlay_h} but canvas is {canvas_w}x{canvas_h}")]
    OverlaySize {
        canvas_w: u32,
        canvas_h: u32,
        overlay_w: u32,
        overlay_h: u32,
    },
    #[error("alpha mask is {mask_w}x{mask_h} but canvas is {canvas_w}x{canvas_h}")]
    MaskSize {
        canvas_w: u32,
        canvas_h: u32,
        mask_w: u32,
        mask_h: u32,
    },
}

/// Alpha-composites an overlay onto the canvas through a per-pixel mask.
///
/// Where alpha is 0 the canvas is left bit-identical; where it is 255 the
/// overlay replaces it exactly. Intermediate values blend linearly.
pub struct MaskCompositor;

impl MaskCompositor {
    pub fn composite(
        canvas: &mut Frame,
        overlay: &Frame,
        alpha: &AlphaMask,
    ) -> Result<(), CompositeError> {
        let (cw, ch) = (canvas.width(), canvas.height());
        if overlay.width() != cw || overlay.height() != ch || overlay.channels() != canvas.channels()
        {
            return Err(CompositeError::OverlaySize {
                canvas_w: cw,
                canvas_h: ch,
                overlay_w: overlay.width(),
                overlay_h: overlay.height(),
            });
        }
        if alpha.width() != cw || alpha.height() != ch {
            return Err(CompositeError::MaskSize {
                canvas_w: cw,
                canvas_h: ch,
                mask_w: alpha.width(),
                mask_h: alpha.height(),
            });
        }

        let channels = canvas.channels() as usize;
        let src = overlay.data();
        let dst = canvas.data_mut();
        for (px, &a) in alpha.data().iter().enumerate() {
            let start = px * channels;
            match a {
                TRANSPARENT => {}
                OPAQUE => dst[start..start + channels].copy_from_slice(&src[start..start + channels]),
                _ => {
                    let a = a as u32;
                    for i in start..start + channels {
                        let blended = a * src[i] as u32 + (255 - a) * dst[i] as u32;
                        dst[i] = ((blended + 127) / 255) as u8;
                    }
                }
            }
        }
        Ok(())
    }
}
