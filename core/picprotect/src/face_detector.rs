use image::DynamicImage;

use crate::error::PicProtectError;
use crate::region::NormalizedRect;

/// A face reported by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceBounds {
    /// Bounding box in normalized, bottom-left-origin coordinates.
    pub rect: NormalizedRect,
    /// Detection confidence score. The scale is backend-specific.
    pub confidence: f64,
}

/// Pluggable face detection backend.
///
/// Implement this trait to provide a custom face detector (ONNX, a platform
/// vision service, a test double) and hand it to [`crate::FaceLocator::new`].
/// Detection runs on a worker thread, hence `Send + Sync`.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in `image`, returning zero or more normalized boxes.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBounds>, PicProtectError>;
}
