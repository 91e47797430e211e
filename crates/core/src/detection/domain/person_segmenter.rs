use crate::shared::frame::Frame;

pub const DEFAULT_SEGMENTATION_THRESHOLD: f32 = 0.7;

/// Tuning passed through to the segmentation model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentationConfig {
    /// Minimum person probability for a pixel to count as person.
    pub threshold: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SEGMENTATION_THRESHOLD,
        }
    }
}

/// Binary per-pixel person mask: `1` = person, `0` = background.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationMask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl SegmentationMask {
    pub fn person_pixels(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

/// Domain interface for person segmentation. The returned mask has the
/// input frame's dimensions.
pub trait PersonSegmenter: Send {
    fn segment(
        &mut self,
        frame: &Frame,
        config: &SegmentationConfig,
    ) -> Result<SegmentationMask, Box<dyn std::error::Error>>;
}
