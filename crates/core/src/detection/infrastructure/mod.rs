pub mod execution_provider;
pub mod math;
pub mod onnx_blazeface_detector;
pub mod onnx_person_segmenter;
pub mod onnx_yolo_object_detector;
