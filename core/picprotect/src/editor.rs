use std::sync::Arc;

use image::DynamicImage;

use crate::codec::{decode_image, encode_image, OutputFormat};
use crate::compositor::{BlockPixelator, Compositor};
use crate::config::{DetectorSettings, Settings};
use crate::error::PicProtectError;
use crate::face_detector::{FaceBounds, FaceDetector};
use crate::locator::{FaceLocator, PendingDetection};
use crate::overlay::{aspect_fit, Overlay, OverlayLayer};
use crate::region::{FaceRegions, Point, Rect, RegionId, Size};

/// What happened to a finished detection request.
#[derive(Debug)]
pub enum DetectionOutcome {
    /// The faces replaced the current list. Holds how many were found.
    Applied(usize),
    /// A newer import started before this request finished; the result was dropped.
    Superseded,
    /// The detector failed. Regions and display were left as they were.
    Failed(PicProtectError),
}

/// State of the single editing screen.
///
/// Owns the original image, the image on display, the face list, and the
/// overlays, and routes every change through the locator, overlay mapper,
/// and compositor. Everything here is meant to be driven from one thread;
/// only detection runs elsewhere.
pub struct Editor {
    locator: FaceLocator,
    compositor: Compositor,
    original: Option<Arc<DynamicImage>>,
    displayed: Option<DynamicImage>,
    regions: FaceRegions,
    overlays: OverlayLayer,
    container: Size,
    display_rect: Rect,
    /// Bumped on every import. Only completions carrying the current value apply.
    generation: u64,
}

impl Editor {
    /// Empty editor: no image, no faces, zero-sized container.
    pub fn new(locator: FaceLocator, compositor: Compositor) -> Self {
        Self {
            locator,
            compositor,
            original: None,
            displayed: None,
            regions: FaceRegions::default(),
            overlays: OverlayLayer::new(),
            container: Size::default(),
            display_rect: Rect::default(),
            generation: 0,
        }
    }

    /// Build an editor with the built-in detector and block pixelator.
    pub fn from_settings(settings: &Settings) -> Result<Self, PicProtectError> {
        settings.validate()?;
        let detector = default_detector(&settings.detector)?;
        Ok(Self::new(
            FaceLocator::new(detector),
            Compositor::new(Box::new(BlockPixelator), settings.block_size),
        ))
    }

    /// Replace the working image and start detecting faces in it.
    ///
    /// The previous face list and overlays are discarded right away; the new
    /// image is shown unmodified until faces are toggled.
    pub fn import(&mut self, image: DynamicImage) -> PendingDetection {
        self.generation += 1;
        log::info!(
            "imported {}x{} image (generation {})",
            image.width(),
            image.height(),
            self.generation
        );

        let original = Arc::new(image);
        self.displayed = Some((*original).clone());
        self.original = Some(Arc::clone(&original));
        self.regions = FaceRegions::default();
        self.refresh_layout();

        self.locator.locate(original, self.generation)
    }

    /// Decode `bytes` and import the result.
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<PendingDetection, PicProtectError> {
        let image = decode_image(bytes)?;
        Ok(self.import(image))
    }

    /// Wait for `pending` and apply its result.
    pub fn complete_detection(&mut self, pending: PendingDetection) -> DetectionOutcome {
        let generation = pending.generation();
        let result = pending.wait();
        self.apply_detection(generation, result)
    }

    /// Apply `pending` if it has finished.
    ///
    /// `None` while it is still running and on every call after its result
    /// was applied.
    pub fn poll_detection(&mut self, pending: &PendingDetection) -> Option<DetectionOutcome> {
        let result = pending.try_take()?;
        Some(self.apply_detection(pending.generation(), result))
    }

    fn apply_detection(
        &mut self,
        generation: u64,
        result: Result<Vec<FaceBounds>, PicProtectError>,
    ) -> DetectionOutcome {
        if generation != self.generation {
            log::debug!(
                "dropping detection for generation {generation}, current is {}",
                self.generation
            );
            return DetectionOutcome::Superseded;
        }

        let faces = match result {
            Ok(faces) => faces,
            Err(err) => {
                log::warn!("face detection failed: {err}");
                return DetectionOutcome::Failed(err);
            }
        };

        self.regions =
            FaceRegions::from_bounds(generation, faces.into_iter().map(|f| (f.rect, f.confidence)));
        log::info!("detected {} face(s)", self.regions.len());

        self.refresh_layout();
        self.rerender();
        DetectionOutcome::Applied(self.regions.len())
    }

    /// Record the container size and rebuild the overlays for it.
    pub fn layout(&mut self, container: Size) {
        self.container = container;
        self.refresh_layout();
    }

    /// Toggle whichever face lies under `point`, if any.
    pub fn tap(&mut self, point: Point) -> Option<RegionId> {
        let id = self.overlays.hit_test(point)?;
        self.toggle(id)?;
        Some(id)
    }

    /// Flip pixelation of one face and re-render. Returns the new state, or
    /// `None` for an id that isn't in the current list.
    pub fn toggle(&mut self, id: RegionId) -> Option<bool> {
        let selected = self.regions.toggle(id)?;
        log::debug!("region {id:?} selected={selected}");
        self.rerender();
        self.overlays.relayout(&self.display_rect, &self.regions);
        Some(selected)
    }

    /// Select or clear every face at once.
    pub fn set_all(&mut self, selected: bool) {
        self.regions.set_all(selected);
        self.rerender();
        self.overlays.relayout(&self.display_rect, &self.regions);
    }

    /// Pixelate exactly the faces in `ids` and re-render once.
    ///
    /// Repeated ids count once and unknown ids are skipped. Returns how many
    /// faces are selected afterwards.
    pub fn select_only(&mut self, ids: &[RegionId]) -> usize {
        let count = self.regions.select_only(ids);
        log::debug!("{count} of {} region(s) selected", self.regions.len());
        self.rerender();
        self.overlays.relayout(&self.display_rect, &self.regions);
        count
    }

    /// Encode the image currently on display.
    pub fn export(&self, format: OutputFormat, quality: f32) -> Result<Vec<u8>, PicProtectError> {
        let displayed = self
            .displayed
            .as_ref()
            .ok_or(PicProtectError::NothingToExport)?;
        encode_image(displayed, format, quality)
    }

    /// The last imported image, never modified.
    pub fn original(&self) -> Option<&DynamicImage> {
        self.original.as_deref()
    }

    /// The image on screen: the original with the selected faces pixelated.
    pub fn displayed(&self) -> Option<&DynamicImage> {
        self.displayed.as_ref()
    }

    /// Faces of the current image.
    pub fn regions(&self) -> &FaceRegions {
        &self.regions
    }

    /// Tap targets for the current layout.
    pub fn overlays(&self) -> &[Overlay] {
        self.overlays.overlays()
    }

    /// Where the image sits inside the container.
    pub fn display_rect(&self) -> Rect {
        self.display_rect
    }

    fn refresh_layout(&mut self) {
        self.display_rect = match &self.original {
            Some(image) => aspect_fit(
                Size::new(image.width() as f64, image.height() as f64),
                self.container,
            ),
            None => Rect::default(),
        };
        self.overlays.relayout(&self.display_rect, &self.regions);
    }

    fn rerender(&mut self) {
        let Some(original) = &self.original else {
            return;
        };
        match self.compositor.render(original, &self.regions) {
            Some(image) => self.displayed = Some(image),
            None => log::warn!("pixelation unavailable, display left unchanged"),
        }
    }
}

/// The built-in SeetaFace detector, if compiled in and a model is configured.
pub fn default_detector(
    settings: &DetectorSettings,
) -> Result<Arc<dyn FaceDetector>, PicProtectError> {
    #[cfg(feature = "rustface")]
    {
        let path = settings
            .model_path
            .as_ref()
            .ok_or(PicProtectError::NoDetector)?;
        let detector = crate::rustface_backend::RustfaceDetector::from_path(path, settings.clone())?;
        Ok(Arc::new(detector))
    }

    #[cfg(not(feature = "rustface"))]
    {
        let _ = settings;
        Err(PicProtectError::NoDetector)
    }
}
