pub mod face_detector;
pub mod head_estimator;
pub mod object_detector;
pub mod person_segmenter;
pub mod region_deduplicator;
pub mod tiled_scanner;
