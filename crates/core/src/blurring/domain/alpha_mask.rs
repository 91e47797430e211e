use crate::detection::domain::person_segmenter::SegmentationMask;

pub const OPAQUE: u8 = 255;
pub const TRANSPARENT: u8 = 0;

/// Per-pixel opacity of an overlay layer, one byte per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl AlphaMask {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "alpha data length must equal width * height"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Person pixels become fully opaque, everything else fully transparent.
    pub fn from_segmentation(mask: &SegmentationMask) -> Self {
        let data = mask
            .data
            .iter()
            .map(|&v| if v != 0 { OPAQUE } else { TRANSPARENT })
            .collect();
        Self::new(data, mask.width, mask.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn coverage(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.data.iter().map(|&a| a as u64).sum();
        sum as f64 / (self.data.len() as f64 * OPAQUE as f64)
    }
}
