use serde::Serialize;

use crate::region::{FaceRegions, Point, Rect, RegionId, Size};

/// Tap target for one face, in container coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    /// Face this overlay stands for.
    pub id: RegionId,
    /// Face box projected onto the displayed image.
    pub rect: Rect,
    /// Mirrors the face's selection so the UI can style it.
    pub selected: bool,
}

/// Where an image of `image` size lands when shown aspect-fit and centered
/// in `container`. The unused axis is letterboxed evenly on both sides.
///
/// Returns an empty rect when either size is degenerate.
pub fn aspect_fit(image: Size, container: Size) -> Rect {
    if image.width <= 0.0 || image.height <= 0.0 || container.width <= 0.0 || container.height <= 0.0
    {
        return Rect::default();
    }

    let scale = (container.width / image.width).min(container.height / image.height);
    let width = image.width * scale;
    let height = image.height * scale;

    Rect {
        x: (container.width - width) / 2.0,
        y: (container.height - height) / 2.0,
        width,
        height,
    }
}

/// Map every region onto `display`, the rectangle the image occupies inside
/// its container.
///
/// Produces nothing when `display` has no area, e.g. before layout.
pub fn map_overlays(display: &Rect, regions: &FaceRegions) -> Vec<Overlay> {
    if display.is_empty() {
        return Vec::new();
    }

    regions
        .iter()
        .map(|region| Overlay {
            id: region.id(),
            rect: region.bounds().project(display),
            selected: region.is_selected(),
        })
        .collect()
}

/// The set of tap targets currently on screen.
#[derive(Debug, Clone, Default)]
pub struct OverlayLayer {
    overlays: Vec<Overlay>,
}

impl OverlayLayer {
    /// Empty layer, as before the first layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every overlay and rebuild from `regions`.
    pub fn relayout(&mut self, display: &Rect, regions: &FaceRegions) {
        self.overlays = map_overlays(display, regions);
        log::debug!(
            "laid out {} overlay(s) in {:.1}x{:.1} at ({:.1}, {:.1})",
            self.overlays.len(),
            display.width,
            display.height,
            display.x,
            display.y
        );
    }

    /// Overlays in face order.
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Number of overlays on screen.
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    /// True when nothing can be tapped.
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Which face a tap at `point` lands on. Later overlays sit on top.
    pub fn hit_test(&self, point: Point) -> Option<RegionId> {
        self.overlays
            .iter()
            .rev()
            .find(|o| o.rect.contains(point))
            .map(|o| o.id)
    }
}
