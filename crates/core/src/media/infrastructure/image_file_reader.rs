use std::path::Path;

use crate::media::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Decodes still images with the `image` crate. Alpha and grayscale inputs
/// are converted to RGB.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let decoded = image::open(path)
            .map_err(|e| format!("Failed to read image {}: {e}", path.display()))?;
        let frame = Frame::from_rgb_image(decoded.to_rgb8());
        log::debug!(
            "Read {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );
        Ok(frame)
    }
}
