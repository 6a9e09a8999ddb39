//! Detect faces in a photo, pick the ones to hide, and pixelate them.
//!
//! The pipeline has three parts: a [`FaceLocator`] runs a pluggable
//! [`FaceDetector`] off-thread, the overlay mapper turns the normalized boxes
//! into tap targets over the displayed image, and the [`Compositor`]
//! pixelates the selected faces. [`Editor`] owns the state and ties them
//! together.
//!
//! # Example
//!
//! ```no_run
//! use picprotect::{Editor, OutputFormat, Settings};
//!
//! let mut settings = Settings::default();
//! settings.detector.model_path = Some("seeta_fd_frontal_v1.0.bin".into());
//!
//! let mut editor = Editor::from_settings(&settings).unwrap();
//! let pending = editor.import_bytes(&std::fs::read("photo.jpg").unwrap()).unwrap();
//! editor.complete_detection(pending);
//! editor.set_all(true);
//! let png = editor.export(OutputFormat::Png, 1.0).unwrap();
//! std::fs::write("protected.png", png).unwrap();
//! ```

#![warn(missing_docs)]

mod codec;
/// Pixelation filter and selective compositing.
pub mod compositor;
mod config;
mod editor;
mod error;
/// Face detection trait and data types.
pub mod face_detector;
mod locator;
/// Mapping faces onto the displayed image.
pub mod overlay;
/// Geometry and face-region types.
pub mod region;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace-based face detector backend.
pub mod rustface_backend;

/// Image decoding and export encoding.
pub use codec::{decode_image, encode_image, OutputFormat};
/// Compositor and pixelation filter.
pub use compositor::{BlockPixelator, Compositor, Pixelator, DEFAULT_BLOCK_SIZE};
/// JSON-backed settings.
pub use config::{DetectorSettings, OutputSettings, Settings};
/// Screen state and detection outcome.
pub use editor::{default_detector, DetectionOutcome, Editor};
/// Error type returned by picprotect operations.
pub use error::PicProtectError;
/// Face detection trait and face bounding-box type.
pub use face_detector::{FaceBounds, FaceDetector};
/// Off-thread detection and its pending handle.
pub use locator::{FaceLocator, PendingDetection};
/// Overlay mapping.
pub use overlay::{aspect_fit, map_overlays, Overlay, OverlayLayer};
/// Geometry and face-region types.
pub use region::{FaceRegion, FaceRegions, NormalizedRect, PixelBounds, Point, Rect, RegionId, Size};
#[cfg(feature = "rustface")]
/// Built-in detector that loads a SeetaFace model.
pub use rustface_backend::RustfaceDetector;
