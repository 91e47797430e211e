use crate::detection::domain::face_detector::FastFaceDetector;
use crate::shared::frame::Frame;
use crate::shared::region::{Region, RegionSource};

/// Images whose longer side exceeds this get a tiled pass.
pub const TILING_THRESHOLD: u32 = 400;

pub const MAX_TILE_SIZE: u32 = 640;

/// Fraction of a tile shared with its neighbour. With 0.5, anything smaller
/// than the step lies wholly inside at least one tile.
pub const TILE_OVERLAP: f64 = 0.5;

/// Crops narrower or shorter than this are not scanned.
pub const MIN_TILE_SIDE: u32 = 100;

/// One crop rectangle in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Runs a small-input face detector over the whole image and over
/// overlapping tiles, returning raw (not yet deduplicated) candidates in
/// image coordinates.
pub struct TiledScanner {
    tiling_threshold: u32,
    max_tile_size: u32,
    overlap: f64,
    min_tile_side: u32,
}

impl TiledScanner {
    pub fn new(tiling_threshold: u32, max_tile_size: u32, overlap: f64, min_tile_side: u32) -> Self {
        Self {
            tiling_threshold,
            max_tile_size,
            overlap,
            min_tile_side,
        }
    }

    /// Tiles scanned for a `width` x `height` image; empty when the image is
    /// small enough for the whole-image pass alone.
    pub fn tile_grid(&self, width: u32, height: u32) -> Vec<TileRect> {
        if width.max(height) <= self.tiling_threshold {
            return Vec::new();
        }

        let tile = width.min(height).min(self.max_tile_size);
        let step = ((tile as f64 * (1.0 - self.overlap)).floor() as u32).max(1);

        let mut tiles = Vec::new();
        for y in (0..height).step_by(step as usize) {
            for x in (0..width).step_by(step as usize) {
                let w = tile.min(width - x);
                let h = tile.min(height - y);
                if w < self.min_tile_side || h < self.min_tile_side {
                    continue;
                }
                tiles.push(TileRect {
                    x,
                    y,
                    width: w,
                    height: h,
                });
            }
        }
        tiles
    }

    pub fn scan(&self, detector: &mut dyn FastFaceDetector, frame: &Frame) -> Vec<Region> {
        let mut regions = Vec::new();

        match detector.detect(frame) {
            Ok(faces) => {
                regions.extend(
                    faces
                        .iter()
                        .map(|f| f.to_region((0.0, 0.0), RegionSource::Full)),
                );
            }
            Err(e) => log::warn!("Face detector failed on full image: {e}"),
        }

        let tiles = self.tile_grid(frame.width(), frame.height());
        for tile in &tiles {
            let crop = frame.crop(tile.x, tile.y, tile.width, tile.height);
            match detector.detect(&crop) {
                Ok(faces) => {
                    let origin = (tile.x as f64, tile.y as f64);
                    regions.extend(
                        faces
                            .iter()
                            .map(|f| f.to_region(origin, RegionSource::Tile)),
                    );
                }
                Err(e) => log::warn!(
                    "Face detector failed on tile at ({}, {}): {e}",
                    tile.x,
                    tile.y
                ),
            }
        }

        log::debug!(
            "Tiled scan: {} tiles, {} raw face candidates",
            tiles.len(),
            regions.len()
        );
        regions
    }
}

impl Default for TiledScanner {
    fn default() -> Self {
        Self::new(TILING_THRESHOLD, MAX_TILE_SIZE, TILE_OVERLAP, MIN_TILE_SIDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::FaceBox;
    use crate::detection::domain::region_deduplicator::RegionDeduplicator;
    use approx::assert_relative_eq;

    const MARKER: [u8; 3] = [255, 0, 0];

    /// Finds the red marker blob, mimicking a small-input model: it sees
    /// nothing in inputs larger than `max_input`, and misses blobs cut by
    /// the crop border.
    struct MarkerDetector {
        max_input: u32,
        calls: usize,
    }

    impl MarkerDetector {
        fn new(max_input: u32) -> Self {
            Self {
                max_input,
                calls: 0,
            }
        }
    }

    impl FastFaceDetector for MarkerDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            self.calls += 1;
            if frame.width().max(frame.height()) > self.max_input {
                return Ok(vec![]);
            }
            let (w, h) = (frame.width() as usize, frame.height() as usize);
            let data = frame.data();
            let mut bounds: Option<(usize, usize, usize, usize)> = None;
            for y in 0..h {
                for x in 0..w {
                    let i = (y * w + x) * 3;
                    if data[i..i + 3] == MARKER {
                        let b = bounds.get_or_insert((x, y, x, y));
                        b.0 = b.0.min(x);
                        b.1 = b.1.min(y);
                        b.2 = b.2.max(x);
                        b.3 = b.3.max(y);
                    }
                }
            }
            Ok(match bounds {
                Some((x1, y1, x2, y2)) if x1 > 0 && y1 > 0 && x2 < w - 1 && y2 < h - 1 => {
                    vec![FaceBox {
                        top_left: [x1 as f64, y1 as f64],
                        bottom_right: [(x2 + 1) as f64, (y2 + 1) as f64],
                        probability: Some(0.9),
                    }]
                }
                _ => vec![],
            })
        }
    }

    struct FailingDetector;

    impl FastFaceDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            Err("model crashed".into())
        }
    }

    fn frame_with_marker(w: u32, h: u32, mx: u32, my: u32, size: u32) -> Frame {
        let mut data = vec![40u8; (w * h * 3) as usize];
        for y in my..my + size {
            for x in mx..mx + size {
                let i = ((y * w + x) * 3) as usize;
                data[i..i + 3].copy_from_slice(&MARKER);
            }
        }
        Frame::new(data, w, h, 3)
    }

    #[test]
    fn test_small_image_has_no_tiles() {
        let scanner = TiledScanner::default();
        assert!(scanner.tile_grid(400, 300).is_empty());
    }

    #[test]
    fn test_small_image_single_full_pass() {
        let frame = frame_with_marker(300, 200, 50, 60, 20);
        let mut detector = MarkerDetector::new(1000);
        let regions = TiledScanner::default().scan(&mut detector, &frame);
        assert_eq!(detector.calls, 1);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].source, RegionSource::Full);
        assert_relative_eq!(regions[0].x, 50.0);
        assert_relative_eq!(regions[0].y, 60.0);
    }

    #[test]
    fn test_tile_grid_layout() {
        // tile = min(1000, 600, 640) = 600, step = 300
        let tiles = TiledScanner::default().tile_grid(1000, 600);
        let origins: Vec<(u32, u32)> = tiles.iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(
            origins,
            vec![
                (0, 0),
                (300, 0),
                (600, 0),
                (900, 0),
                (0, 300),
                (300, 300),
                (600, 300),
                (900, 300)
            ]
        );
        assert_eq!(tiles[2].width, 400);
        assert_eq!(tiles[3].width, 100);
        assert_eq!(tiles[4].height, 300);
    }

    #[test]
    fn test_tile_grid_caps_tile_size() {
        let tiles = TiledScanner::default().tile_grid(2000, 1500);
        assert!(tiles.iter().all(|t| t.width <= 640 && t.height <= 640));
        assert_eq!(tiles[1].x, 320);
    }

    #[test]
    fn test_tile_grid_skips_slivers() {
        // tile = 500, step = 250: x = 750 leaves a 50px sliver
        let tiles = TiledScanner::default().tile_grid(800, 500);
        assert!(tiles.iter().all(|t| t.x != 750));
        assert!(tiles.iter().all(|t| t.width >= MIN_TILE_SIDE && t.height >= MIN_TILE_SIDE));
    }

    #[test]
    fn test_tiles_cover_image() {
        let (w, h) = (1000u32, 600u32);
        let tiles = TiledScanner::default().tile_grid(w, h);
        for &(px, py) in &[(0, 0), (999, 599), (599, 299), (450, 550), (950, 10)] {
            assert!(tiles
                .iter()
                .any(|t| px >= t.x && px < t.x + t.width && py >= t.y && py < t.y + t.height));
        }
    }

    #[test]
    fn test_detection_remapped_to_image_coordinates() {
        // Only tiles (max 600px) can see the marker.
        let frame = frame_with_marker(1000, 600, 640, 420, 20);
        let mut detector = MarkerDetector::new(640);
        let regions = TiledScanner::default().scan(&mut detector, &frame);

        assert!(!regions.is_empty());
        for r in &regions {
            assert_eq!(r.source, RegionSource::Tile);
            assert_relative_eq!(r.x, 640.0);
            assert_relative_eq!(r.y, 420.0);
            assert_relative_eq!(r.width, 20.0);
        }
    }

    #[test]
    fn test_boundary_detection_reported_once_after_dedup() {
        // Marker straddles the right edge of tile (0,0) at x=600; only the
        // tile starting at x=300 holds it whole.
        let frame = frame_with_marker(1000, 600, 590, 100, 30);
        let mut detector = MarkerDetector::new(640);
        let raw = TiledScanner::default().scan(&mut detector, &frame);
        let fused = RegionDeduplicator::default().deduplicate(&raw);

        assert_eq!(fused.len(), 1);
        assert_relative_eq!(fused[0].x, 590.0);
        assert_relative_eq!(fused[0].y, 100.0);
        assert_relative_eq!(fused[0].width, 30.0);
    }

    #[test]
    fn test_face_in_overlap_seen_twice_fused_once() {
        let frame = frame_with_marker(1000, 600, 350, 100, 30);
        let mut detector = MarkerDetector::new(640);
        let raw = TiledScanner::default().scan(&mut detector, &frame);
        assert!(raw.len() >= 2);
        assert_eq!(RegionDeduplicator::default().deduplicate(&raw).len(), 1);
    }

    #[test]
    fn test_failing_detector_yields_nothing() {
        let frame = Frame::new(vec![0u8; 800 * 500 * 3], 800, 500, 3);
        let regions = TiledScanner::default().scan(&mut FailingDetector, &frame);
        assert!(regions.is_empty());
    }
}
