use crate::shared::region::{Region, DEFAULT_IOU_THRESHOLD};

/// Fuses overlapping candidates from several detectors into disjoint regions.
///
/// Greedy and order-sensitive: candidates are visited by descending score,
/// so the most confident detection anchors each cluster. An absorbed
/// candidate grows the kept region to their union instead of being dropped,
/// which keeps faces split across tiles fully covered. A grown region that
/// now overlaps another kept region absorbs it too, so no two outputs
/// overlap beyond the threshold. Equal scores keep their input order
/// (stable sort).
pub struct RegionDeduplicator {
    iou_threshold: f64,
}

impl RegionDeduplicator {
    pub fn new(iou_threshold: f64) -> Self {
        Self { iou_threshold }
    }

    pub fn deduplicate(&self, candidates: &[Region]) -> Vec<Region> {
        if candidates.len() <= 1 {
            return candidates.to_vec();
        }

        let mut ordered: Vec<&Region> = candidates.iter().collect();
        ordered.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut kept: Vec<Region> = Vec::with_capacity(candidates.len());
        for candidate in ordered {
            match kept
                .iter()
                .position(|k| k.iou(candidate) > self.iou_threshold)
            {
                Some(anchor) => {
                    kept[anchor] = kept[anchor].union(candidate);
                    self.absorb_overlaps(&mut kept, anchor);
                }
                None => kept.push(candidate.clone()),
            }
        }
        kept
    }

    /// Merges kept regions that a grown region now overlaps beyond the
    /// threshold, until no pair involving it does. The earlier-kept region
    /// of each merged pair stays the anchor.
    fn absorb_overlaps(&self, kept: &mut Vec<Region>, mut grown: usize) {
        while let Some(other) = (0..kept.len())
            .find(|&i| i != grown && kept[i].iou(&kept[grown]) > self.iou_threshold)
        {
            let (anchor, absorbed) = (grown.min(other), grown.max(other));
            let merged = kept[anchor].union(&kept[absorbed]);
            kept[anchor] = merged;
            kept.remove(absorbed);
            grown = anchor;
        }
    }
}

impl Default for RegionDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_IOU_THRESHOLD)
    }
}
