use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for localized blur compositing.
///
/// `blur` reads the *current* frame content, so regions processed later in
/// the same call (or in a later stage) blur what earlier ones already
/// blurred. Empty regions are skipped, never an error.
pub trait FrameBlurrer: Send {
    fn blur(&self, frame: &mut Frame, regions: &[Region])
        -> Result<(), Box<dyn std::error::Error>>;

    /// A fully blurred copy of `frame`, used as the overlay for mask compositing.
    fn blurred_copy(&self, frame: &Frame) -> Result<Frame, Box<dyn std::error::Error>>;
}
