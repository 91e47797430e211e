use crate::blurring::domain::frame_blurrer::FrameBlurrer;

use super::cpu_region_blurrer::CpuRegionBlurrer;

/// Creates the blurrer used by the redaction stages for a given radius.
pub fn create_blurrer(radius: u32) -> Box<dyn FrameBlurrer> {
    log::info!(
        "Using CPU backend for region blur (radius={}, kernel_size={})",
        radius,
        radius * 6 + 1
    );
    Box::new(CpuRegionBlurrer::with_radius(radius))
}
