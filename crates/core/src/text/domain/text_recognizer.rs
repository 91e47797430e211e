use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// One word from an OCR engine with its box in image coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedToken {
    pub text: String,
    pub bbox: Region,
}

/// Domain interface for word-level text recognition.
pub trait TextRecognizer: Send {
    fn recognize(
        &mut self,
        frame: &Frame,
        lang: &str,
    ) -> Result<Vec<RecognizedToken>, Box<dyn std::error::Error>>;
}
