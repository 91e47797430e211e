/// Pixel rectangle within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl PixelRect {
    /// Grows by `margin` on every side, clipped to a `width` x `height` frame.
    pub fn grow_within(&self, margin: usize, width: usize, height: usize) -> PixelRect {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        let x2 = (self.x + self.w + margin).min(width);
        let y2 = (self.y + self.h + margin).min(height);
        PixelRect {
            x,
            y,
            w: x2 - x,
            h: y2 - y,
        }
    }
}

/// Kernels wider than this many taps are applied on a downscaled patch.
const DOWNSCALE_TAPS: usize = 50;

/// Precomputed separable Gaussian, sized from a blur radius.
///
/// Sigma equals the radius, so `blur(Npx)` here matches the usual
/// canvas-filter meaning. Large kernels blur a downscaled copy and upscale
/// it back, which is visually equivalent and far cheaper.
pub struct GaussianKernel {
    weights: Vec<f32>,
    scale: usize,
    small_weights: Vec<f32>,
}

impl GaussianKernel {
    pub fn for_radius(radius: u32) -> Self {
        let size = radius as usize * 6 + 1;
        let scale = (size / DOWNSCALE_TAPS).max(1);
        let small_size = (size / scale) | 1;
        Self {
            weights: kernel_1d(size),
            scale,
            small_weights: kernel_1d(small_size),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Pixels on either side of the centre tap that influence a result.
    pub fn half_width(&self) -> usize {
        self.weights.len() / 2
    }

    pub fn is_identity(&self) -> bool {
        self.weights.len() <= 1
    }

    /// Blurs an interleaved `width` x `height` patch in place.
    pub fn apply(
        &self,
        patch: &mut [u8],
        width: usize,
        height: usize,
        channels: usize,
        temp: &mut Vec<f32>,
    ) {
        if self.is_identity() || width == 0 || height == 0 {
            return;
        }
        if self.scale <= 1 || width < self.scale * 2 || height < self.scale * 2 {
            separable_blur(patch, width, height, channels, &self.weights, temp);
            return;
        }
        let (mut small, sw, sh) = downscale(patch, width, height, channels, self.scale);
        separable_blur(&mut small, sw, sh, channels, &self.small_weights, temp);
        let restored = upscale(&small, sw, sh, channels, width, height);
        patch.copy_from_slice(&restored);
    }
}

/// Normalized 1D Gaussian of odd `size`, sigma = `size / 6`.
fn kernel_1d(size: usize) -> Vec<f32> {
    debug_assert!(size >= 1 && size % 2 == 1);
    let sigma = size as f64 / 6.0;
    let half = (size / 2) as f64;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - half;
            (-d * d / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|&v| (v / sum) as f32).collect()
}

/// Two-pass separable convolution with edge-clamped sampling; `temp` is
/// reused scratch space.
fn separable_blur(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
    temp: &mut Vec<f32>,
) {
    let half = (kernel.len() / 2) as isize;
    temp.resize(width * height * channels, 0.0);

    for y in 0..height {
        let row = y * width;
        for x in 0..width {
            for c in 0..channels {
                let mut acc = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = (x as isize + k as isize - half).clamp(0, width as isize - 1) as usize;
                    acc += data[(row + sx) * channels + c] as f32 * w;
                }
                temp[(row + x) * channels + c] = acc;
            }
        }
    }

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut acc = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sy =
                        (y as isize + k as isize - half).clamp(0, height as isize - 1) as usize;
                    acc += temp[(sy * width + x) * channels + c] * w;
                }
                data[(y * width + x) * channels + c] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Copies a rectangle out of frame data into `patch`.
pub fn extract(data: &[u8], frame_width: usize, channels: usize, rect: PixelRect, patch: &mut Vec<u8>) {
    let row_len = rect.w * channels;
    patch.resize(rect.h * row_len, 0);
    for row in 0..rect.h {
        let src = ((rect.y + row) * frame_width + rect.x) * channels;
        patch[row * row_len..(row + 1) * row_len].copy_from_slice(&data[src..src + row_len]);
    }
}

/// Writes the `inner` part of a patch taken at `outer` back into frame data.
/// Pixels of the patch outside `inner` are discarded.
pub fn write_inner(
    data: &mut [u8],
    frame_width: usize,
    channels: usize,
    patch: &[u8],
    outer: PixelRect,
    inner: PixelRect,
) {
    let row_len = inner.w * channels;
    let off_x = inner.x - outer.x;
    let off_y = inner.y - outer.y;
    for row in 0..inner.h {
        let src = ((off_y + row) * outer.w + off_x) * channels;
        let dst = ((inner.y + row) * frame_width + inner.x) * channels;
        data[dst..dst + row_len].copy_from_slice(&patch[src..src + row_len]);
    }
}

/// Area-average downscale by an integer factor.
fn downscale(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    scale: usize,
) -> (Vec<u8>, usize, usize) {
    let new_w = width / scale;
    let new_h = height / scale;
    let mut out = vec![0u8; new_w * new_h * channels];

    for y in 0..new_h {
        for x in 0..new_w {
            for c in 0..channels {
                let mut sum = 0u32;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let sy = y * scale + dy;
                        let sx = x * scale + dx;
                        sum += data[(sy * width + sx) * channels + c] as u32;
                    }
                }
                out[(y * new_w + x) * channels + c] = (sum / (scale * scale) as u32) as u8;
            }
        }
    }

    (out, new_w, new_h)
}

/// Bilinear upscale to the target size.
fn upscale(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    target_w: usize,
    target_h: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; target_w * target_h * channels];
    let sx_ratio = (width as f32 - 1.0) / (target_w as f32 - 1.0).max(1.0);
    let sy_ratio = (height as f32 - 1.0) / (target_h as f32 - 1.0).max(1.0);

    for y in 0..target_h {
        let fy_src = y as f32 * sy_ratio;
        let y0 = (fy_src.floor() as usize).min(height - 1);
        let y1 = (y0 + 1).min(height - 1);
        let fy = fy_src - y0 as f32;
        for x in 0..target_w {
            let fx_src = x as f32 * sx_ratio;
            let x0 = (fx_src.floor() as usize).min(width - 1);
            let x1 = (x0 + 1).min(width - 1);
            let fx = fx_src - x0 as f32;

            for c in 0..channels {
                let at = |yy: usize, xx: usize| data[(yy * width + xx) * channels + c] as f32;
                let top = at(y0, x0) * (1.0 - fx) + at(y0, x1) * fx;
                let bottom = at(y1, x0) * (1.0 - fx) + at(y1, x1) * fx;
                let val = top * (1.0 - fy) + bottom * fy;
                out[(y * target_w + x) * channels + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}
