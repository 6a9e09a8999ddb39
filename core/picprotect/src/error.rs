use thiserror::Error;

/// Errors returned by picprotect operations.
#[derive(Debug, Error)]
pub enum PicProtectError {
    /// Input bytes are not a readable JPEG, PNG, or WebP image.
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    /// Image has no pixels.
    #[error("image dimensions are zero")]
    ZeroDimensions,

    /// Encoder rejected the image.
    #[error("failed to encode image: {0}")]
    EncodeError(String),

    /// Detector errored or its worker died.
    #[error("face detection failed: {0}")]
    DetectionFailed(String),

    /// Detector model file is missing or unreadable.
    #[error("failed to load face detector model: {0}")]
    DetectorModel(String),

    /// No detector is compiled in or no model is configured.
    #[error("no face detector backend is available")]
    NoDetector,

    /// Quality outside `0.0..=1.0`.
    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),

    /// Block size of zero.
    #[error("pixelation block size must be > 0")]
    InvalidBlockSize,

    /// Export requested before any import.
    #[error("no image is displayed")]
    NothingToExport,

    /// Settings file could not be parsed or holds invalid values.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
