use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use redactor_core::detection::domain::face_detector::FastFaceDetector;
use redactor_core::detection::domain::object_detector::ObjectDetector;
use redactor_core::detection::domain::person_segmenter::{
    PersonSegmenter, SegmentationConfig, DEFAULT_SEGMENTATION_THRESHOLD,
};
use redactor_core::detection::domain::region_deduplicator::RegionDeduplicator;
use redactor_core::detection::infrastructure::onnx_blazeface_detector::{
    self, OnnxBlazefaceDetector,
};
use redactor_core::detection::infrastructure::onnx_person_segmenter::OnnxPersonSegmenter;
use redactor_core::detection::infrastructure::onnx_yolo_object_detector::{
    self, OnnxYoloObjectDetector,
};
use redactor_core::media::infrastructure::image_file_reader::ImageFileReader;
use redactor_core::media::infrastructure::image_file_writer::ImageFileWriter;
use redactor_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use redactor_core::pipeline::redact_image_use_case::RedactImageUseCase;
use redactor_core::pipeline::redaction_pipeline::RedactionPipeline;
use redactor_core::shared::constants::{
    BLAZEFACE_MODEL_NAME, DEFAULT_OCR_LANG, IMAGE_EXTENSIONS, OBJECT_MODEL_NAME,
    SEGMENTATION_MODEL_NAME,
};
use redactor_core::shared::model_resolver::{self, ModelSource};
use redactor_core::shared::options::RedactionOptions;
use redactor_core::shared::region::DEFAULT_IOU_THRESHOLD;
use redactor_core::text::domain::text_classifier::TextClassifier;
use redactor_core::text::infrastructure::tesseract_recognizer::TesseractRecognizer;

/// Blur faces, bodies, licence plates and private text in images.
#[derive(Parser)]
#[command(name = "redactor")]
struct Cli {
    /// Input image file.
    input: PathBuf,

    /// Output image file.
    output: PathBuf,

    /// JSON options file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not blur faces.
    #[arg(long)]
    no_faces: bool,

    /// Blur whole bodies using person segmentation.
    #[arg(long)]
    body: bool,

    /// Blur licence plates.
    #[arg(long)]
    plates: bool,

    /// Blur e-mail addresses and phone numbers.
    #[arg(long)]
    text: bool,

    /// Blur radius in pixels.
    #[arg(long)]
    strength: Option<u32>,

    /// IoU above which face candidates are fused (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD)]
    iou_threshold: f64,

    /// Person probability above which a pixel counts as body (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_SEGMENTATION_THRESHOLD)]
    segmentation_threshold: f32,

    /// OCR language passed to tesseract.
    #[arg(long, default_value = DEFAULT_OCR_LANG)]
    ocr_lang: String,

    /// Face detection model (ONNX).
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Object detection model used for head estimation (ONNX).
    #[arg(long)]
    object_model: Option<PathBuf>,

    /// Person segmentation model (ONNX).
    #[arg(long)]
    segmentation_model: Option<PathBuf>,

    /// Directory searched for models not found in the cache.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Base URL models are downloaded from when missing locally.
    #[arg(long)]
    model_base_url: Option<String>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let options = build_options(&cli)?;
    validate(&cli)?;

    let pipeline = build_pipeline(&cli, &options)?;
    let mut use_case = RedactImageUseCase::new(
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        pipeline,
    );

    let mut logger = LogPipelineLogger::new();
    use_case.execute(&cli.input, &cli.output, &options, &mut logger)?;
    logger.summary();
    log::info!("Output written to {}", cli.output.display());
    Ok(())
}

fn build_options(cli: &Cli) -> Result<RedactionOptions, Box<dyn std::error::Error>> {
    let mut options = match &cli.config {
        Some(path) => RedactionOptions::load(path)?,
        None => RedactionOptions::default(),
    };
    if cli.no_faces {
        options.blur_faces = false;
    }
    if cli.body {
        options.blur_body = true;
    }
    if cli.plates {
        options.blur_plates = true;
    }
    if cli.text {
        options.blur_text = true;
    }
    if let Some(strength) = cli.strength {
        options.strength = strength;
    }
    options.validate()?;
    Ok(options)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_image(&cli.input) {
        return Err(format!(
            "Unsupported input format: {} (expected one of {})",
            cli.input.display(),
            IMAGE_EXTENSIONS.join(", ")
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.iou_threshold) {
        return Err(format!(
            "IoU threshold must be between 0.0 and 1.0, got {}",
            cli.iou_threshold
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.segmentation_threshold) {
        return Err(format!(
            "Segmentation threshold must be between 0.0 and 1.0, got {}",
            cli.segmentation_threshold
        )
        .into());
    }
    Ok(())
}

/// Loads only the collaborators the enabled stages need. A model that
/// cannot be resolved or loaded leaves its stage without that detector.
fn build_pipeline(
    cli: &Cli,
    options: &RedactionOptions,
) -> Result<RedactionPipeline, Box<dyn std::error::Error>> {
    let mut pipeline = RedactionPipeline::new(TextClassifier::new()?)
        .with_deduplicator(RegionDeduplicator::new(cli.iou_threshold))
        .with_segmentation_config(SegmentationConfig {
            threshold: cli.segmentation_threshold,
        })
        .with_ocr_lang(cli.ocr_lang.as_str());

    if options.blur_faces {
        if let Some(detector) = load_face_detector(cli) {
            pipeline = pipeline.with_face_detector(detector);
        }
        if let Some(detector) = load_object_detector(cli) {
            pipeline = pipeline.with_object_detector(detector);
        }
    }
    if options.blur_body {
        if let Some(segmenter) = load_segmenter(cli) {
            pipeline = pipeline.with_segmenter(segmenter);
        }
    }
    if options.blur_text || options.blur_plates {
        pipeline = pipeline.with_recognizer(Box::new(TesseractRecognizer::default()));
    }
    Ok(pipeline)
}

fn load_face_detector(cli: &Cli) -> Option<Box<dyn FastFaceDetector>> {
    let path = resolve_model(cli, BLAZEFACE_MODEL_NAME, cli.face_model.as_deref())?;
    match OnnxBlazefaceDetector::new(&path, onnx_blazeface_detector::DEFAULT_CONFIDENCE) {
        Ok(detector) => Some(Box::new(detector)),
        Err(e) => {
            log::warn!("Could not load face model {}: {e}", path.display());
            None
        }
    }
}

fn load_object_detector(cli: &Cli) -> Option<Box<dyn ObjectDetector>> {
    let path = resolve_model(cli, OBJECT_MODEL_NAME, cli.object_model.as_deref())?;
    match OnnxYoloObjectDetector::new(&path, onnx_yolo_object_detector::DEFAULT_CONFIDENCE) {
        Ok(detector) => Some(Box::new(detector)),
        Err(e) => {
            log::warn!("Could not load object model {}: {e}", path.display());
            None
        }
    }
}

fn load_segmenter(cli: &Cli) -> Option<Box<dyn PersonSegmenter>> {
    let path = resolve_model(
        cli,
        SEGMENTATION_MODEL_NAME,
        cli.segmentation_model.as_deref(),
    )?;
    match OnnxPersonSegmenter::new(&path) {
        Ok(segmenter) => Some(Box::new(segmenter)),
        Err(e) => {
            log::warn!("Could not load segmentation model {}: {e}", path.display());
            None
        }
    }
}

fn resolve_model(cli: &Cli, name: &str, explicit: Option<&Path>) -> Option<PathBuf> {
    log::info!("Resolving model: {name}");
    let source = ModelSource {
        explicit,
        bundled_dir: cli.models_dir.as_deref(),
        base_url: cli.model_base_url.as_deref(),
    };
    let label = name.to_string();
    let progress: model_resolver::ProgressFn =
        Box::new(move |downloaded, total| download_progress(&label, downloaded, total));
    match model_resolver::resolve(name, &source, Some(progress)) {
        Ok(path) => Some(path),
        Err(e) => {
            log::warn!("Model {name} unavailable, continuing without it: {e}");
            None
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}
