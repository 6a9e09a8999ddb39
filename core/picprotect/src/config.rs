use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compositor::DEFAULT_BLOCK_SIZE;
use crate::error::PicProtectError;
use crate::OutputFormat;

/// Runtime settings, stored as JSON.
///
/// Every field has a default, so a partial file (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Side of a pixelation cell, in source pixels.
    pub block_size: u32,
    /// Export format and quality.
    pub output: OutputSettings,
    /// Detector model and tuning.
    pub detector: DetectorSettings,
}

/// How the displayed image is written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Encoding used on export.
    pub format: OutputFormat,
    /// Encoder quality from 0.0 to 1.0. Only JPEG uses it.
    pub quality: f32,
}

/// Tuning for the built-in SeetaFace detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Path to `seeta_fd_frontal_v1.0.bin`. Detection is unavailable without it.
    pub model_path: Option<PathBuf>,
    /// Smallest face side, in pixels, the detector looks for.
    pub min_face_size: u32,
    /// Minimum score for a window to count as a face.
    pub score_thresh: f64,
    /// Shrink factor between image pyramid levels.
    pub pyramid_scale_factor: f32,
    /// Sliding window stride in pixels, used on both axes.
    pub slide_window_step: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            output: OutputSettings::default(),
            detector: DetectorSettings::default(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality: 0.9,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            min_face_size: 20,
            score_thresh: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PicProtectError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let settings = Self::from_json(&text)
            .map_err(|e| PicProtectError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse and validate settings from JSON text.
    pub fn from_json(text: &str) -> Result<Self, PicProtectError> {
        let settings: Settings =
            serde_json::from_str(text).map_err(|e| PicProtectError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, PicProtectError> {
        serde_json::to_string_pretty(self).map_err(|e| PicProtectError::Config(e.to_string()))
    }

    /// Reject values the pipeline can't run with.
    pub fn validate(&self) -> Result<(), PicProtectError> {
        if self.block_size == 0 {
            return Err(PicProtectError::InvalidBlockSize);
        }
        if !(0.0..=1.0).contains(&self.output.quality) {
            return Err(PicProtectError::InvalidQuality(self.output.quality));
        }
        if self.detector.slide_window_step == 0 {
            return Err(PicProtectError::Config(
                "detector.slide_window_step must be > 0".into(),
            ));
        }
        Ok(())
    }
}
