use std::thread::ScopedJoinHandle;
use std::time::Instant;

use crate::blurring::domain::alpha_mask::AlphaMask;
use crate::blurring::domain::frame_blurrer::FrameBlurrer;
use crate::blurring::domain::mask_compositor::MaskCompositor;
use crate::blurring::infrastructure::blurrer_factory::create_blurrer;
use crate::detection::domain::face_detector::FastFaceDetector;
use crate::detection::domain::head_estimator::HeadRegionEstimator;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::person_segmenter::{PersonSegmenter, SegmentationConfig};
use crate::detection::domain::region_deduplicator::RegionDeduplicator;
use crate::detection::domain::tiled_scanner::TiledScanner;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::DEFAULT_OCR_LANG;
use crate::shared::frame::Frame;
use crate::shared::options::RedactionOptions;
use crate::shared::region::{Region, REGION_PADDING};
use crate::text::domain::text_classifier::TextClassifier;
use crate::text::domain::text_recognizer::TextRecognizer;

/// Redacts one image by running the enabled stages in a fixed order:
/// body, then faces, then text and plates.
///
/// Every detector reads the untouched source; every stage blurs into the
/// same canvas, so a later stage blurs on top of what earlier ones did.
/// Collaborators are optional: a missing one skips the stages that need it.
pub struct RedactionPipeline {
    face_detector: Option<Box<dyn FastFaceDetector>>,
    object_detector: Option<Box<dyn ObjectDetector>>,
    segmenter: Option<Box<dyn PersonSegmenter>>,
    recognizer: Option<Box<dyn TextRecognizer>>,
    scanner: TiledScanner,
    head_estimator: HeadRegionEstimator,
    deduplicator: RegionDeduplicator,
    classifier: TextClassifier,
    segmentation: SegmentationConfig,
    ocr_lang: String,
}

impl RedactionPipeline {
    pub fn new(classifier: TextClassifier) -> Self {
        Self {
            face_detector: None,
            object_detector: None,
            segmenter: None,
            recognizer: None,
            scanner: TiledScanner::default(),
            head_estimator: HeadRegionEstimator::default(),
            deduplicator: RegionDeduplicator::default(),
            classifier,
            segmentation: SegmentationConfig::default(),
            ocr_lang: DEFAULT_OCR_LANG.to_string(),
        }
    }

    pub fn with_face_detector(mut self, detector: Box<dyn FastFaceDetector>) -> Self {
        self.face_detector = Some(detector);
        self
    }

    pub fn with_object_detector(mut self, detector: Box<dyn ObjectDetector>) -> Self {
        self.object_detector = Some(detector);
        self
    }

    pub fn with_segmenter(mut self, segmenter: Box<dyn PersonSegmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn with_recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_deduplicator(mut self, deduplicator: RegionDeduplicator) -> Self {
        self.deduplicator = deduplicator;
        self
    }

    pub fn with_segmentation_config(mut self, config: SegmentationConfig) -> Self {
        self.segmentation = config;
        self
    }

    pub fn with_ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.ocr_lang = lang.into();
        self
    }

    /// Returns the redacted canvas. Never fails: a detector error only
    /// removes that detector's regions.
    pub fn process(
        &mut self,
        source: &Frame,
        options: &RedactionOptions,
        logger: &mut dyn PipelineLogger,
    ) -> Frame {
        let mut canvas = source.clone();
        if !options.any_stage_enabled() {
            logger.info("No redaction stages enabled");
            return canvas;
        }
        let blurrer = create_blurrer(options.strength);

        if options.blur_body {
            let t = Instant::now();
            self.redact_bodies(source, &mut canvas, blurrer.as_ref(), logger);
            logger.timing("body", elapsed_ms(t));
        }
        if options.blur_faces {
            let t = Instant::now();
            self.redact_faces(source, &mut canvas, blurrer.as_ref(), logger);
            logger.timing("faces", elapsed_ms(t));
        }
        if options.blur_text || options.blur_plates {
            let t = Instant::now();
            self.redact_text(source, &mut canvas, options, blurrer.as_ref(), logger);
            logger.timing("text", elapsed_ms(t));
        }

        canvas
    }

    /// Fused face regions for `source`, before padding.
    ///
    /// The tiled scanner and the head estimator run on two scoped threads
    /// and are both joined before deduplication. A worker that panics
    /// counts as finding nothing.
    pub fn face_regions(&mut self, source: &Frame) -> Vec<Region> {
        if self.face_detector.is_none() && self.object_detector.is_none() {
            log::info!("No face or object detector configured, skipping face detection");
            return Vec::new();
        }
        if self.face_detector.is_none() {
            log::info!("No face detector configured, using head estimates only");
        }
        if self.object_detector.is_none() {
            log::info!("No object detector configured, skipping head estimates");
        }

        let scanner = &self.scanner;
        let head_estimator = &self.head_estimator;
        let face_detector = self.face_detector.as_deref_mut();
        let object_detector = self.object_detector.as_deref_mut();

        let (tiled, heads) = std::thread::scope(|s| {
            let tiled = face_detector.map(|d| s.spawn(move || scanner.scan(d, source)));
            let heads = object_detector.map(|d| s.spawn(move || head_estimator.detect(d, source)));
            (
                join_worker("Tiled face scan", tiled),
                join_worker("Head estimation", heads),
            )
        });

        let mut candidates = tiled;
        candidates.extend(heads);
        let fused = self.deduplicator.deduplicate(&candidates);
        log::debug!(
            "Face stage: {} candidates fused into {} regions",
            candidates.len(),
            fused.len()
        );
        fused
    }

    fn redact_faces(
        &mut self,
        source: &Frame,
        canvas: &mut Frame,
        blurrer: &dyn FrameBlurrer,
        logger: &mut dyn PipelineLogger,
    ) {
        let fused = self.face_regions(source);
        logger.metric("face_regions", fused.len() as f64);
        blur_padded(canvas, &fused, blurrer, "face");
    }

    fn redact_bodies(
        &mut self,
        source: &Frame,
        canvas: &mut Frame,
        blurrer: &dyn FrameBlurrer,
        logger: &mut dyn PipelineLogger,
    ) {
        let Some(segmenter) = self.segmenter.as_deref_mut() else {
            log::info!("No person segmenter configured, skipping body stage");
            return;
        };
        let mask = match segmenter.segment(source, &self.segmentation) {
            Ok(mask) => mask,
            Err(e) => {
                log::warn!("Person segmenter failed: {e}");
                return;
            }
        };
        let person_pixels = mask.person_pixels();
        logger.metric("body_pixels", person_pixels as f64);
        if person_pixels == 0 {
            return;
        }

        let overlay = match blurrer.blurred_copy(source) {
            Ok(overlay) => overlay,
            Err(e) => {
                log::warn!("Blurring body overlay failed: {e}");
                return;
            }
        };
        let alpha = AlphaMask::from_segmentation(&mask);
        log::debug!("Body mask covers {:.1}% of the image", alpha.coverage() * 100.0);
        if let Err(e) = MaskCompositor::composite(canvas, &overlay, &alpha) {
            log::warn!("Body compositing failed: {e}");
        }
    }

    fn redact_text(
        &mut self,
        source: &Frame,
        canvas: &mut Frame,
        options: &RedactionOptions,
        blurrer: &dyn FrameBlurrer,
        logger: &mut dyn PipelineLogger,
    ) {
        let Some(recognizer) = self.recognizer.as_deref_mut() else {
            log::info!("No text recognizer configured, skipping text and plate stage");
            return;
        };
        let tokens = match recognizer.recognize(source, &self.ocr_lang) {
            Ok(tokens) => tokens,
            Err(e) => {
                log::warn!("Text recognizer failed: {e}");
                return;
            }
        };
        let regions = self.classifier.regions(&tokens, options);
        logger.metric("text_tokens", tokens.len() as f64);
        logger.metric("text_regions", regions.len() as f64);
        blur_padded(canvas, &regions, blurrer, "text");
    }
}

fn join_worker(name: &str, handle: Option<ScopedJoinHandle<'_, Vec<Region>>>) -> Vec<Region> {
    match handle.map(|h| h.join()) {
        None => Vec::new(),
        Some(Ok(regions)) => regions,
        Some(Err(_)) => {
            log::warn!("{name} panicked, continuing without its regions");
            Vec::new()
        }
    }
}

/// Pads regions by `REGION_PADDING`, clamps them to the canvas and blurs.
fn blur_padded(canvas: &mut Frame, regions: &[Region], blurrer: &dyn FrameBlurrer, kind: &str) {
    let (w, h) = (canvas.width(), canvas.height());
    let padded: Vec<Region> = regions
        .iter()
        .map(|r| r.expand(REGION_PADDING).clamp(w, h))
        .filter(|r| !r.is_empty())
        .collect();
    if padded.is_empty() {
        return;
    }
    if let Err(e) = blurrer.blur(canvas, &padded) {
        log::warn!("Blurring {kind} regions failed: {e}");
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
