pub mod text_classifier;
pub mod text_recognizer;
