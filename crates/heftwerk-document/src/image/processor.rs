// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, alpha flattening and downscaling ahead of PDF
// conversion. Operates on in-memory images using the `image` crate.

use heftwerk_core::error::HeftwerkError;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tracing::{debug, info, instrument};

/// Background that transparent pixels are composited onto.
const FLATTEN_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Image processing pipeline operating on a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, so steps
/// chain:
///
/// ```ignore
/// let rgb = ImageProcessor::from_bytes(&upload)?
///     .fit_within(827, 1169)
///     .into_rgb8();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
    /// Container format the image was decoded from, if known.
    format: Option<ImageFormat>,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, HeftwerkError> {
        let format = image::guess_format(data).ok();
        let img = image::load_from_memory(data).map_err(|err| {
            HeftwerkError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            ?format,
            "Image decoded from bytes"
        );
        Ok(Self { image: img, format })
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Container format the bytes were decoded from.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Whether the image carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Resize the image to fit within `max_width` x `max_height`, preserving
    /// aspect ratio. Images already inside the box are left untouched.
    #[instrument(skip(self), fields(max_width, max_height))]
    pub fn fit_within(self, max_width: u32, max_height: u32) -> Self {
        if self.image.width() <= max_width && self.image.height() <= max_height {
            return self;
        }
        info!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            max_width,
            max_height,
            "Downscaling image"
        );
        let resized = self
            .image
            .resize(max_width, max_height, image::imageops::FilterType::Lanczos3);
        debug!(
            new_w = resized.width(),
            new_h = resized.height(),
            "Resize complete"
        );
        Self {
            image: resized,
            format: self.format,
        }
    }

    /// Composite any alpha channel onto white, producing an RGB image.
    #[instrument(skip(self))]
    pub fn flatten_alpha(self) -> Self {
        if !self.has_alpha() {
            return self;
        }
        debug!("Flattening alpha onto white");
        let rgba = self.image.to_rgba8();
        let [bg_r, bg_g, bg_b] = FLATTEN_BACKGROUND.map(u32::from);

        let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let alpha = u32::from(a);
            let blend = |channel: u8, background: u32| -> u8 {
                ((u32::from(channel) * alpha + background * (255 - alpha) + 127) / 255) as u8
            };
            Rgb([blend(r, bg_r), blend(g, bg_g), blend(b, bg_b)])
        });
        Self {
            image: DynamicImage::ImageRgb8(flattened),
            format: self.format,
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Consume the processor and return 8-bit RGB samples.
    pub fn into_rgb8(self) -> RgbImage {
        match self.image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        }
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
pub(crate) fn encode_to_format(
    image: &DynamicImage,
    format: ImageFormat,
) -> Result<Vec<u8>, HeftwerkError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image.write_to(&mut cursor, format).map_err(|err| {
        HeftwerkError::ImageError(format!("image encoding failed: {}", err))
    })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn flatten_turns_transparent_pixels_white() {
        let processor = ImageProcessor::from_bytes(&fixtures::png_bytes(4, 2, true)).unwrap();
        assert!(processor.has_alpha());

        let rgb = processor.flatten_alpha().into_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(3, 1), &Rgb([200, 30, 30]));
    }

    #[test]
    fn flatten_is_a_no_op_without_alpha() {
        let processor = ImageProcessor::from_bytes(&fixtures::png_bytes(3, 3, false)).unwrap();
        assert!(!processor.has_alpha());
        let rgb = processor.flatten_alpha().into_rgb8();
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([30, 120, 200]));
    }

    #[test]
    fn fit_within_keeps_aspect_ratio_and_never_upscales() {
        let big = ImageProcessor::from_bytes(&fixtures::png_bytes(400, 200, false))
            .unwrap()
            .fit_within(100, 100);
        assert_eq!((big.width(), big.height()), (100, 50));

        let small = ImageProcessor::from_bytes(&fixtures::png_bytes(40, 20, false))
            .unwrap()
            .fit_within(100, 100);
        assert_eq!((small.width(), small.height()), (40, 20));
    }

    #[test]
    fn detects_container_format() {
        let jpeg = ImageProcessor::from_bytes(&fixtures::jpeg_bytes(8, 8)).unwrap();
        assert_eq!(jpeg.format(), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn garbage_is_an_image_error() {
        assert!(matches!(
            ImageProcessor::from_bytes(b"not an image"),
            Err(HeftwerkError::ImageError(_))
        ));
    }
}
