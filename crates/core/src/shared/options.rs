use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_STRENGTH: u32 = 20;

/// Blur radii outside this range still work but look either too weak or
/// waste time on a kernel much larger than any face.
pub const RECOMMENDED_STRENGTH: RangeInclusive<u32> = 5..=50;

/// Hard cap on the blur radius; the kernel grows as `6 * radius + 1`.
pub const MAX_STRENGTH: u32 = 250;

#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("failed to read options from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid options file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("blur strength must be at most {max}, got {0}", max = MAX_STRENGTH)]
    InvalidStrength(u32),
}

/// Which redaction stages run, and how strongly they blur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionOptions {
    pub blur_faces: bool,
    pub blur_body: bool,
    pub blur_plates: bool,
    pub blur_text: bool,
    /// Blur radius in pixels.
    pub strength: u32,
}

impl Default for RedactionOptions {
    fn default() -> Self {
        Self {
            blur_faces: true,
            blur_body: false,
            blur_plates: false,
            blur_text: false,
            strength: DEFAULT_STRENGTH,
        }
    }
}

impl RedactionOptions {
    /// Loads options from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let json = fs::read_to_string(path).map_err(|e| OptionsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let options: Self = serde_json::from_str(&json).map_err(|e| OptionsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.strength > MAX_STRENGTH {
            return Err(OptionsError::InvalidStrength(self.strength));
        }
        if !RECOMMENDED_STRENGTH.contains(&self.strength) {
            log::warn!(
                "Blur strength {} is outside the recommended range {}-{}",
                self.strength,
                RECOMMENDED_STRENGTH.start(),
                RECOMMENDED_STRENGTH.end()
            );
        }
        Ok(())
    }

    pub fn any_stage_enabled(&self) -> bool {
        self.blur_faces || self.blur_body || self.blur_plates || self.blur_text
    }
}
