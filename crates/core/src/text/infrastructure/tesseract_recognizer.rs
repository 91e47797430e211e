use std::process::Command;

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::region::{Region, RegionSource};
use crate::text::domain::text_recognizer::{RecognizedToken, TextRecognizer};

pub const DEFAULT_TESSERACT_BINARY: &str = "tesseract";

/// TSV level of word rows; lower levels are page, block, paragraph, line.
const WORD_LEVEL: u32 = 5;

/// Columns: level page_num block_num par_num line_num word_num left top
/// width height conf text.
const TSV_COLUMNS: usize = 12;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{binary} exited with {status}: {stderr}")]
    Exit {
        binary: String,
        status: String,
        stderr: String,
    },
    #[error("failed to stage image for OCR: {0}")]
    Stage(#[source] std::io::Error),
    #[error("failed to encode image for OCR: {0}")]
    Encode(#[source] image::ImageError),
    #[error("only RGB frames can be recognized")]
    UnsupportedFrame,
    #[error("malformed TSV row {line}: {reason}")]
    Tsv { line: usize, reason: String },
}

/// OCR adapter around the `tesseract` command-line tool.
pub struct TesseractRecognizer {
    binary: String,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, frame: &Frame, lang: &str) -> Result<Vec<RecognizedToken>, RecognizerError> {
        let image = frame.to_rgb_image().ok_or(RecognizerError::UnsupportedFrame)?;
        let staged = tempfile::Builder::new()
            .prefix("redactor-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(RecognizerError::Stage)?;
        image
            .save_with_format(staged.path(), image::ImageFormat::Png)
            .map_err(RecognizerError::Encode)?;

        let output = Command::new(&self.binary)
            .arg(staged.path())
            .arg("stdout")
            .args(["-l", lang, "tsv"])
            .output()
            .map_err(|e| RecognizerError::Spawn {
                binary: self.binary.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(RecognizerError::Exit {
                binary: self.binary.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_TESSERACT_BINARY)
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(
        &mut self,
        frame: &Frame,
        lang: &str,
    ) -> Result<Vec<RecognizedToken>, Box<dyn std::error::Error>> {
        let tokens = self.run(frame, lang)?;
        log::debug!("Tesseract recognized {} words", tokens.len());
        Ok(tokens)
    }
}

/// Parses tesseract TSV output into word tokens.
///
/// The header row, non-word rows and words with empty text are skipped.
/// Confidence is mapped from `0..=100` to `0..=1`; tesseract's `-1` becomes 0.
pub fn parse_tsv(tsv: &str) -> Result<Vec<RecognizedToken>, RecognizerError> {
    let mut tokens = Vec::new();
    for (index, line) in tsv.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() || line.starts_with("level") {
            continue;
        }
        let fields: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
        if fields.len() < TSV_COLUMNS - 1 {
            return Err(RecognizerError::Tsv {
                line: line_no,
                reason: format!("expected {TSV_COLUMNS} columns, got {}", fields.len()),
            });
        }

        let level: u32 = parse_field(fields[0], line_no, "level")?;
        let text = fields.get(11).map(|t| t.trim()).unwrap_or_default();
        if level != WORD_LEVEL || text.is_empty() {
            continue;
        }

        let left: f64 = parse_field(fields[6], line_no, "left")?;
        let top: f64 = parse_field(fields[7], line_no, "top")?;
        let width: f64 = parse_field(fields[8], line_no, "width")?;
        let height: f64 = parse_field(fields[9], line_no, "height")?;
        let conf: f64 = parse_field(fields[10], line_no, "conf")?;

        tokens.push(RecognizedToken {
            text: text.to_string(),
            bbox: Region::from_corners(
                [left, top],
                [left + width, top + height],
                RegionSource::Text,
                (conf / 100.0).clamp(0.0, 1.0),
            ),
        });
    }
    Ok(tokens)
}

fn parse_field<T: std::str::FromStr>(
    raw: &str,
    line: usize,
    name: &str,
) -> Result<T, RecognizerError> {
    raw.trim().parse().map_err(|_| RecognizerError::Tsv {
        line,
        reason: format!("bad {name} value {raw:?}"),
    })
}
