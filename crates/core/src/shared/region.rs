use std::fmt;

pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// Padding added on each side of face, text and plate regions before blurring.
pub const REGION_PADDING: f64 = 0.2;

/// Which detector produced a region. Diagnostics only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionSource {
    /// Fast face detector run on the whole image.
    Full,
    /// Fast face detector run on one tile.
    Tile,
    /// Head approximated from a person box.
    Head,
    /// Sensitive text (email, phone).
    Text,
    /// Plate-like token.
    Plate,
}

impl fmt::Display for RegionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegionSource::Full => "full",
            RegionSource::Tile => "tile",
            RegionSource::Head => "head",
            RegionSource::Text => "text",
            RegionSource::Plate => "plate",
        };
        f.write_str(name)
    }
}

/// Axis-aligned redaction candidate in image pixel coordinates.
///
/// Coordinates stay fractional until the compositor snaps them to the
/// pixel grid, so geometric heuristics don't accumulate rounding error.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub source: RegionSource,
    pub score: f64,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64, source: RegionSource, score: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            source,
            score,
        }
    }

    /// Builds a region from corner points, normalizing reversed corners.
    pub fn from_corners(
        top_left: [f64; 2],
        bottom_right: [f64; 2],
        source: RegionSource,
        score: f64,
    ) -> Self {
        let x1 = top_left[0].min(bottom_right[0]);
        let y1 = top_left[1].min(bottom_right[1]);
        let x2 = top_left[0].max(bottom_right[0]);
        let y2 = top_left[1].max(bottom_right[1]);
        Self::new(x1, y1, x2 - x1, y2 - y1, source, score)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// True when the region covers no pixels.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn iou(&self, other: &Region) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter <= 0.0 {
            return 0.0;
        }

        inter / (self.area() + other.area() - inter)
    }

    /// Minimal box covering both regions. Keeps this region's source and
    /// the higher of the two scores.
    pub fn union(&self, other: &Region) -> Region {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Region {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            source: self.source,
            score: self.score.max(other.score),
        }
    }

    /// Grows every side by `fraction` of the size along that axis.
    pub fn expand(&self, fraction: f64) -> Region {
        let pad_x = self.width * fraction;
        let pad_y = self.height * fraction;
        Region {
            x: self.x - pad_x,
            y: self.y - pad_y,
            width: self.width + pad_x * 2.0,
            height: self.height + pad_y * 2.0,
            ..self.clone()
        }
    }

    /// Intersects with the `width` x `height` image rectangle.
    ///
    /// A region entirely outside the image collapses to zero area.
    pub fn clamp(&self, width: u32, height: u32) -> Region {
        let x1 = self.x.clamp(0.0, width as f64);
        let y1 = self.y.clamp(0.0, height as f64);
        let x2 = self.right().clamp(0.0, width as f64);
        let y2 = self.bottom().clamp(0.0, height as f64);
        Region {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0.0),
            height: (y2 - y1).max(0.0),
            ..self.clone()
        }
    }

    /// Shifts the region by a tile origin.
    pub fn translate(&self, dx: f64, dy: f64) -> Region {
        Region {
            x: self.x + dx,
            y: self.y + dy,
            ..self.clone()
        }
    }

    /// Smallest whole-pixel rectangle `(x, y, w, h)` covering the region,
    /// clipped to the image. `None` when nothing remains.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
        if self.is_empty() {
            return None;
        }
        let clamped = self.clamp(width, height);
        let x1 = clamped.x.floor() as usize;
        let y1 = clamped.y.floor() as usize;
        let x2 = (clamped.right().ceil() as usize).min(width as usize);
        let y2 = (clamped.bottom().ceil() as usize).min(height as usize);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1, y1, x2 - x1, y2 - y1))
    }
}
