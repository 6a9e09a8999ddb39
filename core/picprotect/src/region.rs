use serde::Serialize;

/// Rectangle in normalized image coordinates.
///
/// All components are fractions of the image size. The origin sits at the
/// bottom-left corner, which is how detectors report their boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedRect {
    /// Left edge, 0.0 = left border of the image.
    pub x: f64,
    /// Bottom edge, 0.0 = bottom border of the image.
    pub y: f64,
    /// Width as a fraction of the image width.
    pub width: f64,
    /// Height as a fraction of the image height.
    pub height: f64,
}

impl NormalizedRect {
    /// Create a normalized rectangle from its bottom-left corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a normalized rectangle from a top-left pixel box inside an image
    /// of `image_width` × `image_height` pixels.
    pub fn from_top_left_pixels(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let (iw, ih) = (image_width as f64, image_height as f64);
        Self {
            x: x / iw,
            y: 1.0 - (y + height) / ih,
            width: width / iw,
            height: height / ih,
        }
    }

    /// Project onto `frame`, flipping the vertical axis so the result has its
    /// origin at the top-left.
    ///
    /// `frame` is the display rectangle of the image for overlays, or
    /// `(0, 0, image_width, image_height)` for pixel space.
    pub fn project(&self, frame: &Rect) -> Rect {
        let width = self.width * frame.width;
        let height = self.height * frame.height;
        Rect {
            x: self.x * frame.width + frame.x,
            y: (1.0 - self.y) * frame.height - height + frame.y,
            width,
            height,
        }
    }
}

/// Rectangle with a top-left origin, in display points or image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` × `height` image.
    pub fn of_image(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    /// True when either side is zero (or negative).
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Half-open containment test: the right and bottom edges are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x < self.x + self.width
            && point.y < self.y + self.height
    }

    /// Snap to whole pixels inside a `width` × `height` image.
    ///
    /// Pixel `(px, py)` is covered when `round(x) <= px < round(x + w)` and
    /// likewise vertically. Returns `None` when nothing is covered.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Option<PixelBounds> {
        let clamp = |v: f64, max: u32| v.round().max(0.0).min(max as f64) as u32;

        let x0 = clamp(self.x, width);
        let x1 = clamp(self.x + self.width, width);
        let y0 = clamp(self.y, height);
        let y1 = clamp(self.y + self.height, height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(PixelBounds {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// Point with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Distance from the left edge.
    pub x: f64,
    /// Distance from the top edge.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a container or image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Size {
    /// Create a size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Integer pixel rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    /// First covered column.
    pub x: u32,
    /// First covered row.
    pub y: u32,
    /// Number of covered columns, never zero.
    pub width: u32,
    /// Number of covered rows, never zero.
    pub height: u32,
}

impl PixelBounds {
    /// Whether pixel `(px, py)` is covered.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && py >= self.y && px < self.x + self.width && py < self.y + self.height
    }
}

/// Opaque identity of one detected face.
///
/// Ids are handed out per detection batch and never reused across imports,
/// so a tap aimed at a face from an older image can't hit a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegionId {
    batch: u64,
    serial: u32,
}

/// One detected face and whether it is currently pixelated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceRegion {
    id: RegionId,
    bounds: NormalizedRect,
    confidence: f64,
    selected: bool,
}

impl FaceRegion {
    /// Identity of this face within its batch.
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Face box as reported by the detector.
    pub fn bounds(&self) -> &NormalizedRect {
        &self.bounds
    }

    /// Detector score. Only meaningful relative to other scores from the same detector.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Whether the face is pixelated.
    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Ordered batch of faces from one detection run.
///
/// The batch never grows, shrinks, or reorders; only the `selected` flags
/// change. A new import replaces the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FaceRegions {
    regions: Vec<FaceRegion>,
}

impl FaceRegions {
    /// Build a batch from detector output, every face unselected.
    pub fn from_bounds<I>(batch: u64, faces: I) -> Self
    where
        I: IntoIterator<Item = (NormalizedRect, f64)>,
    {
        let regions = faces
            .into_iter()
            .enumerate()
            .map(|(serial, (bounds, confidence))| FaceRegion {
                id: RegionId {
                    batch,
                    serial: serial as u32,
                },
                bounds,
                confidence,
                selected: false,
            })
            .collect();
        Self { regions }
    }

    /// Number of faces in the batch.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// True when the detector found nothing.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Faces in detector order.
    pub fn iter(&self) -> impl Iterator<Item = &FaceRegion> {
        self.regions.iter()
    }

    /// Look up a face by id. Ids from another batch never match.
    pub fn get(&self, id: RegionId) -> Option<&FaceRegion> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Flip the selection of `id`, returning the new state.
    pub fn toggle(&mut self, id: RegionId) -> Option<bool> {
        let region = self.regions.iter_mut().find(|r| r.id == id)?;
        region.selected = !region.selected;
        Some(region.selected)
    }

    /// Set every face to `selected`.
    pub fn set_all(&mut self, selected: bool) {
        for region in &mut self.regions {
            region.selected = selected;
        }
    }

    /// Select exactly the faces in `ids` and clear the rest.
    ///
    /// Repeated ids count once; ids from another batch are ignored. Returns
    /// how many faces ended up selected.
    pub fn select_only(&mut self, ids: &[RegionId]) -> usize {
        let mut count = 0;
        for region in &mut self.regions {
            region.selected = ids.contains(&region.id);
            count += region.selected as usize;
        }
        count
    }

    /// True if at least one face is selected.
    pub fn any_selected(&self) -> bool {
        self.regions.iter().any(|r| r.selected)
    }

    /// Selected faces in detector order.
    pub fn selected(&self) -> impl Iterator<Item = &FaceRegion> {
        self.regions.iter().filter(|r| r.selected)
    }
}
