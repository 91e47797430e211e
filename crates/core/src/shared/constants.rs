pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const OBJECT_MODEL_NAME: &str = "yolo11n_coco.onnx";
pub const SEGMENTATION_MODEL_NAME: &str = "selfie_segmentation.onnx";

/// Language passed to the OCR engine when none is configured.
pub const DEFAULT_OCR_LANG: &str = "eng";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
