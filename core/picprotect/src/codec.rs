use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::PicProtectError;

/// Format used when exporting the displayed image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG, keeps alpha.
    #[default]
    Png,

    /// JPEG at the requested quality. Alpha is flattened onto white.
    Jpeg,

    /// Lossless WebP, keeps alpha.
    Webp,
}

impl FromStr for OutputFormat {
    type Err = PicProtectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(PicProtectError::Config(format!(
                "unknown output format: {other}"
            ))),
        }
    }
}

/// Decode input bytes (JPEG, PNG, or WebP) into a `DynamicImage`.
pub fn decode_image(input: &[u8]) -> Result<DynamicImage, PicProtectError> {
    let image =
        image::load_from_memory(input).map_err(|e| PicProtectError::DecodeError(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(PicProtectError::ZeroDimensions);
    }
    Ok(image)
}

/// Flatten alpha channel by compositing onto a white background.
pub(crate) fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    let rgba: RgbaImage = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let over_white = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        rgb.put_pixel(x, y, image::Rgb([over_white(r), over_white(g), over_white(b)]));
    }

    rgb
}

/// Encode an image in the given format.
///
/// `quality` (0.0–1.0) only affects JPEG; PNG and WebP are written lossless.
pub fn encode_image(
    image: &DynamicImage,
    format: OutputFormat,
    quality: f32,
) -> Result<Vec<u8>, PicProtectError> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(PicProtectError::InvalidQuality(quality));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(PicProtectError::ZeroDimensions);
    }

    let mut buffer = Vec::new();
    let rgba = image.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());

    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer)
                .write_image(rgba.as_raw(), width, height, image::ExtendedColorType::Rgba8)
                .map_err(|e| PicProtectError::EncodeError(e.to_string()))?;
        }
        OutputFormat::Webp => {
            // image-webp only does lossless
            WebPEncoder::new_lossless(&mut buffer)
                .write_image(rgba.as_raw(), width, height, image::ExtendedColorType::Rgba8)
                .map_err(|e| PicProtectError::EncodeError(e.to_string()))?;
        }
        OutputFormat::Jpeg => {
            let rgb = flatten_alpha(image);
            let quality_percent = ((quality * 100.0).round() as u8).max(1);
            JpegEncoder::new_with_quality(&mut buffer, quality_percent)
                .write_image(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
                .map_err(|e| PicProtectError::EncodeError(e.to_string()))?;
        }
    }

    Ok(buffer)
}
