pub mod tesseract_recognizer;
