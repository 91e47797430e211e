use std::cell::RefCell;

use crate::blurring::domain::frame_blurrer::FrameBlurrer;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::gaussian::{self, GaussianKernel, PixelRect};

/// CPU blurrer that redraws each region with a Gaussian blur of the
/// surrounding canvas.
///
/// Each region is blurred from a patch that extends half a kernel beyond it,
/// so pixels just outside the region feed the result the way a clipped
/// canvas draw would. Only the region's own pixels are written back.
pub struct CpuRegionBlurrer {
    kernel: GaussianKernel,
    patch_buf: RefCell<Vec<u8>>,
    blur_temp: RefCell<Vec<f32>>,
}

impl CpuRegionBlurrer {
    pub fn with_radius(radius: u32) -> Self {
        Self {
            kernel: GaussianKernel::for_radius(radius),
            patch_buf: RefCell::new(Vec::new()),
            blur_temp: RefCell::new(Vec::new()),
        }
    }
}

impl FrameBlurrer for CpuRegionBlurrer {
    fn blur(
        &self,
        frame: &mut Frame,
        regions: &[Region],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.kernel.is_identity() {
            return Ok(());
        }
        let (fw, fh) = (frame.width() as usize, frame.height() as usize);
        let channels = frame.channels() as usize;
        let margin = self.kernel.half_width();
        let data = frame.data_mut();

        let mut patch = self.patch_buf.borrow_mut();
        let mut temp = self.blur_temp.borrow_mut();
        for region in regions {
            let Some((x, y, w, h)) = region.pixel_bounds(fw as u32, fh as u32) else {
                continue;
            };
            let inner = PixelRect { x, y, w, h };
            let outer = inner.grow_within(margin, fw, fh);

            gaussian::extract(data, fw, channels, outer, &mut patch);
            self.kernel
                .apply(&mut patch, outer.w, outer.h, channels, &mut temp);
            gaussian::write_inner(data, fw, channels, &patch, outer, inner);
        }
        Ok(())
    }

    fn blurred_copy(&self, frame: &Frame) -> Result<Frame, Box<dyn std::error::Error>> {
        let mut copy = frame.clone();
        let (w, h) = (copy.width() as usize, copy.height() as usize);
        let channels = copy.channels() as usize;
        self.kernel.apply(
            copy.data_mut(),
            w,
            h,
            channels,
            &mut self.blur_temp.borrow_mut(),
        );
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region::RegionSource;
    use rstest::rstest;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 7 + y * 13) % 256) as u8;
                data.extend_from_slice(&[v, v / 2, 255 - v]);
            }
        }
        Frame::new(data, width, height, 3)
    }

    fn region(x: f64, y: f64, w: f64, h: f64) -> Region {
        Region::new(x, y, w, h, RegionSource::Full, 1.0)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        let d = frame.data();
        [d[i], d[i + 1], d[i + 2]]
    }

    #[rstest]
    #[case::zero_width(region(10.0, 10.0, 0.0, 20.0))]
    #[case::zero_height(region(10.0, 10.0, 20.0, 0.0))]
    #[case::outside(region(500.0, 500.0, 20.0, 20.0))]
    fn test_empty_region_is_noop(#[case] r: Region) {
        let mut frame = gradient_frame(64, 48);
        let original = frame.clone();
        CpuRegionBlurrer::with_radius(4).blur(&mut frame, &[r]).unwrap();
        assert_eq!(frame, original);
    }

    #[test]
    fn test_radius_zero_leaves_frame() {
        let mut frame = gradient_frame(32, 32);
        let original = frame.clone();
        CpuRegionBlurrer::with_radius(0)
            .blur(&mut frame, &[region(0.0, 0.0, 32.0, 32.0)])
            .unwrap();
        assert_eq!(frame, original);
    }

    #[test]
    fn test_pixels_outside_region_unchanged() {
        let mut frame = gradient_frame(64, 48);
        let original = frame.clone();
        CpuRegionBlurrer::with_radius(3)
            .blur(&mut frame, &[region(20.0, 10.0, 16.0, 12.0)])
            .unwrap();

        let mut changed = false;
        for y in 0..48 {
            for x in 0..64 {
                let inside = (20..36).contains(&x) && (10..22).contains(&y);
                if inside {
                    changed |= pixel(&frame, x, y) != pixel(&original, x, y);
                } else {
                    assert_eq!(pixel(&frame, x, y), pixel(&original, x, y), "({x}, {y})");
                }
            }
        }
        assert!(changed);
    }

    #[test]
    fn test_fractional_region_snaps_outward() {
        let mut frame = gradient_frame(40, 40);
        let original = frame.clone();
        CpuRegionBlurrer::with_radius(2)
            .blur(&mut frame, &[region(10.5, 10.5, 5.0, 5.0)])
            .unwrap();
        assert_eq!(pixel(&frame, 9, 12), pixel(&original, 9, 12));
        assert_eq!(pixel(&frame, 16, 12), pixel(&original, 16, 12));
    }

    #[test]
    fn test_neighbours_outside_region_bleed_in() {
        // Left half black, right half white; region hugs the boundary from
        // the black side, so blurred pixels pick up white from outside.
        let (w, h) = (40u32, 20u32);
        let mut data = vec![0u8; (w * h * 3) as usize];
        for y in 0..h {
            for x in 20..w {
                let i = ((y * w + x) * 3) as usize;
                data[i..i + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        let mut frame = Frame::new(data, w, h, 3);
        CpuRegionBlurrer::with_radius(2)
            .blur(&mut frame, &[region(15.0, 5.0, 5.0, 10.0)])
            .unwrap();
        assert!(pixel(&frame, 19, 10)[0] > 0);
    }

    #[test]
    fn test_blur_compounds_across_calls() {
        let blurrer = CpuRegionBlurrer::with_radius(2);
        let r = [region(8.0, 8.0, 16.0, 16.0)];
        let mut once = gradient_frame(32, 32);
        blurrer.blur(&mut once, &r).unwrap();
        let mut twice = once.clone();
        blurrer.blur(&mut twice, &r).unwrap();
        assert_ne!(once, twice);
    }

    #[test]
    fn test_blurred_copy_leaves_source() {
        let frame = gradient_frame(32, 24);
        let original = frame.clone();
        let copy = CpuRegionBlurrer::with_radius(3).blurred_copy(&frame).unwrap();
        assert_eq!(frame, original);
        assert_eq!(copy.width(), 32);
        assert_eq!(copy.height(), 24);
        assert_ne!(copy, original);
    }
}
