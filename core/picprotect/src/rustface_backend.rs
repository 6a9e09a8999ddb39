use std::path::Path;

use image::DynamicImage;

use crate::config::DetectorSettings;
use crate::error::PicProtectError;
use crate::face_detector::{FaceBounds, FaceDetector};
use crate::region::NormalizedRect;

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The model is loaded once; every `detect` call builds a fresh detector from
/// a clone of it since `rustface::Detector` needs `&mut self`.
pub struct RustfaceDetector {
    model: rustface::Model,
    settings: DetectorSettings,
}

impl RustfaceDetector {
    /// Load a SeetaFace model (e.g. `seeta_fd_frontal_v1.0.bin`) from disk.
    pub fn from_path(
        path: impl AsRef<Path>,
        settings: DetectorSettings,
    ) -> Result<Self, PicProtectError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| PicProtectError::DetectorModel(format!("{}: {e}", path.display())))?;
        let model = rustface::read_model(std::io::BufReader::new(file))
            .map_err(|e| PicProtectError::DetectorModel(format!("{}: {e}", path.display())))?;
        log::debug!("loaded SeetaFace model from {}", path.display());
        Ok(Self { model, settings })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBounds>, PicProtectError> {
        let gray = image.to_luma8();
        let (width, height) = (gray.width(), gray.height());
        if width == 0 || height == 0 {
            return Err(PicProtectError::ZeroDimensions);
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.settings.min_face_size);
        detector.set_score_thresh(self.settings.score_thresh);
        detector.set_pyramid_scale_factor(self.settings.pyramid_scale_factor);
        detector.set_slide_window_step(
            self.settings.slide_window_step,
            self.settings.slide_window_step,
        );

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBounds {
                    rect: NormalizedRect::from_top_left_pixels(
                        bbox.x() as f64,
                        bbox.y() as f64,
                        bbox.width() as f64,
                        bbox.height() as f64,
                        width,
                        height,
                    ),
                    confidence: face.score(),
                }
            })
            .collect())
    }
}
