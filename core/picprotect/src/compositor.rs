use image::{DynamicImage, GenericImageView, RgbaImage};

use crate::region::{FaceRegions, PixelBounds, Rect};

/// Default pixelation cell size in source pixels.
pub const DEFAULT_BLOCK_SIZE: u32 = 12;

/// Pluggable pixelation filter.
pub trait Pixelator: Send + Sync {
    /// Pixelate the whole image with square cells of `block_size` pixels.
    ///
    /// `None` means the filter is unavailable or produced nothing.
    fn pixelate(&self, image: &DynamicImage, block_size: u32) -> Option<DynamicImage>;
}

/// Replaces each cell with its mean color.
///
/// Cells are aligned to the top-left corner; the last row and column are
/// truncated when the image size is not a multiple of the block size.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockPixelator;

impl Pixelator for BlockPixelator {
    fn pixelate(&self, image: &DynamicImage, block_size: u32) -> Option<DynamicImage> {
        if block_size == 0 || image.width() == 0 || image.height() == 0 {
            return None;
        }

        let src = image.to_rgba8();
        let (width, height) = src.dimensions();
        let mut out = RgbaImage::new(width, height);

        for cell_y in (0..height).step_by(block_size as usize) {
            for cell_x in (0..width).step_by(block_size as usize) {
                let cell_w = block_size.min(width - cell_x);
                let cell_h = block_size.min(height - cell_y);

                let mut sum = [0u64; 4];
                for y in cell_y..cell_y + cell_h {
                    for x in cell_x..cell_x + cell_w {
                        for (acc, channel) in sum.iter_mut().zip(src.get_pixel(x, y).0) {
                            *acc += channel as u64;
                        }
                    }
                }

                let count = (cell_w as u64) * (cell_h as u64);
                let mean = sum.map(|s| ((s + count / 2) / count) as u8);

                for y in cell_y..cell_y + cell_h {
                    for x in cell_x..cell_x + cell_w {
                        out.put_pixel(x, y, image::Rgba(mean));
                    }
                }
            }
        }

        Some(DynamicImage::ImageRgba8(out))
    }
}

/// Renders the original image with the selected faces pixelated.
pub struct Compositor {
    pixelator: Box<dyn Pixelator>,
    block_size: u32,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Box::new(BlockPixelator), DEFAULT_BLOCK_SIZE)
    }
}

impl Compositor {
    /// Compositor that pixelates with `pixelator` in cells of `block_size` pixels.
    pub fn new(pixelator: Box<dyn Pixelator>, block_size: u32) -> Self {
        Self {
            pixelator,
            block_size,
        }
    }

    /// Pixel rectangles of the selected faces within a `width` × `height`
    /// image. Faces that fall outside the image are skipped.
    pub fn selected_bounds(regions: &FaceRegions, width: u32, height: u32) -> Vec<PixelBounds> {
        let frame = Rect::of_image(width, height);
        regions
            .selected()
            .filter_map(|r| r.bounds().project(&frame).pixel_bounds(width, height))
            .collect()
    }

    /// Build the image to display.
    ///
    /// Equal to `original` outside the selected faces and to its pixelated
    /// version inside them. With nothing selected the pixelator is not run.
    /// Returns `None` if pixelation fails.
    pub fn render(&self, original: &DynamicImage, regions: &FaceRegions) -> Option<DynamicImage> {
        let (width, height) = original.dimensions();
        let clips = Self::selected_bounds(regions, width, height);

        if clips.is_empty() {
            return Some(original.clone());
        }

        let pixelated = match self.pixelator.pixelate(original, self.block_size) {
            Some(p) if p.dimensions() == (width, height) => p,
            Some(p) => {
                log::warn!(
                    "pixelator returned {}x{} for a {width}x{height} image",
                    p.width(),
                    p.height()
                );
                return None;
            }
            None => {
                log::warn!("pixelator produced no output");
                return None;
            }
        };

        let mut result = original.clone();
        for clip in &clips {
            let patch = pixelated.crop_imm(clip.x, clip.y, clip.width, clip.height);
            image::imageops::replace(&mut result, &patch, clip.x as i64, clip.y as i64);
        }
        Some(result)
    }
}
