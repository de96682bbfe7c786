// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: turn a raster image into a one-page PDF.
//
// Two paths:
// - lossless: the page is exactly the image's pixel size (1 px = 1 pt) and the
//   samples are embedded untouched (JPEG passthrough, otherwise Flate RGB8).
//   Built directly with `lopdf`.
// - raster: the image is downsampled to the paper at a fixed dpi and placed
//   with `printpdf` 0.8, which uses a data-oriented API: pages are `PdfPage`
//   structs holding `Vec<Op>` operation lists, serialised via
//   `PdfDocument::save()`.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use heftwerk_core::PaperSize;
use heftwerk_core::error::HeftwerkError;
use image::ImageFormat;
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use super::pages::blank_document;
use crate::image::processor::ImageProcessor;

/// Resource name of the embedded image on lossless pages.
const IMAGE_RESOURCE: &str = "Im1";

/// Document title of raster pages.
const RASTER_TITLE: &str = "Heftwerk Image";

/// Margin around images on raster pages.
const RASTER_MARGIN_MM: f32 = 15.0;

/// Creates new one-page PDF documents from raster images.
pub struct PdfWriter {
    /// Paper size for the raster path.
    paper_size: PaperSize,
    /// Resolution of the raster path.
    dpi: f32,
}

impl PdfWriter {
    /// Create a new writer targeting the given paper size and raster dpi.
    pub fn new(paper_size: PaperSize, dpi: f32) -> Self {
        Self { paper_size, dpi }
    }

    /// A4 at 100 dpi.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4, 100.0)
    }

    /// Paper dimensions in printpdf's Mm units.
    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    // -- Lossless path --------------------------------------------------------

    /// Create a single-page PDF whose page and embedded image both have the
    /// source image's pixel dimensions.
    ///
    /// 8-bit greyscale and three-component JPEGs are embedded byte-for-byte.
    /// Everything else, CMYK JPEGs included, is decoded, has its alpha
    /// flattened onto white and is stored as Flate-compressed RGB.
    #[instrument(skip(self, image_bytes), fields(bytes_len = image_bytes.len()))]
    pub fn create_lossless(&self, image_bytes: &[u8]) -> Result<Vec<u8>, HeftwerkError> {
        let processor = ImageProcessor::from_bytes(image_bytes)?;
        let (width, height) = (processor.width(), processor.height());

        let passthrough = match processor.format() {
            Some(ImageFormat::Jpeg) => dct_color_space(image_bytes),
            _ => None,
        };

        let image_stream = match passthrough {
            Some(color_space) => {
                debug!(color_space, "Embedding JPEG stream unchanged");
                Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(width),
                        "Height" => i64::from(height),
                        "ColorSpace" => color_space,
                        "BitsPerComponent" => 8_i64,
                        "Filter" => "DCTDecode",
                    },
                    image_bytes.to_vec(),
                )
            }
            None => {
                let rgb = processor.flatten_alpha().into_rgb8();
                let compressed = zlib(rgb.as_raw())?;
                Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(width),
                        "Height" => i64::from(height),
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8_i64,
                        "Filter" => "FlateDecode",
                    },
                    compressed,
                )
            }
        };

        let (mut doc, pages_id) = blank_document();
        let image_id = doc.add_object(image_stream);

        // Scale the unit square to the full page.
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        i64::from(width).into(),
                        0.into(),
                        0.into(),
                        i64::from(height).into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content.encode().map_err(|err| {
            HeftwerkError::Conversion(format!("failed to encode page content: {}", err))
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), i64::from(width).into(), i64::from(height).into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { IMAGE_RESOURCE => image_id },
            },
        });

        if let Ok(Object::Dictionary(pages)) = doc.get_object_mut(pages_id) {
            pages.set("Kids", vec![Object::Reference(page_id)]);
            pages.set("Count", 1_i64);
        }

        let mut output = Vec::new();
        doc.save_to(&mut output).map_err(|err| {
            HeftwerkError::Conversion(format!("failed to serialise image PDF: {}", err))
        })?;

        info!(width, height, output_bytes = output.len(), "Lossless image PDF created");
        Ok(output)
    }

    // -- Raster path ----------------------------------------------------------

    /// Create a single-page PDF containing the image re-encoded at the
    /// writer's dpi.
    ///
    /// The image is downsampled so it fits inside the page margins at that
    /// resolution, then centred on the page.
    #[instrument(skip(self, image_bytes), fields(bytes_len = image_bytes.len()))]
    pub fn create_rasterised(&self, image_bytes: &[u8]) -> Result<Vec<u8>, HeftwerkError> {
        let (page_w, page_h) = self.page_dimensions();
        info!(paper = ?self.paper_size, dpi = self.dpi, "Creating raster image PDF");

        // Largest pixel box inside the margins at the target resolution.
        let margin_px = (RASTER_MARGIN_MM / 25.4 * self.dpi).round() as u32;
        let (paper_w_px, paper_h_px) = self.paper_size.pixels_at(self.dpi);
        let max_w = paper_w_px.saturating_sub(2 * margin_px).max(1);
        let max_h = paper_h_px.saturating_sub(2 * margin_px).max(1);

        let rgb_image = ImageProcessor::from_bytes(image_bytes)?
            .flatten_alpha()
            .fit_within(max_w, max_h)
            .into_rgb8();

        let img_width = rgb_image.width() as usize;
        let img_height = rgb_image.height() as usize;

        let raw = RawImage {
            pixels: RawImageData::U8(rgb_image.into_raw()),
            width: img_width,
            height: img_height,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(RASTER_TITLE);
        let xobject_id = doc.add_image(&raw);

        // Native size of the image at the target dpi; it already fits.
        let img_w_pt = img_width as f32 / self.dpi * 72.0;
        let img_h_pt = img_height as f32 / self.dpi * 72.0;

        // Centre the image on the page.
        let x_offset = (page_w.into_pt().0 - img_w_pt) / 2.0;
        let y_offset = (page_h.into_pt().0 - img_h_pt) / 2.0;

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x_offset)),
                translate_y: Some(Pt(y_offset)),
                scale_x: None,
                scale_y: None,
                dpi: Some(self.dpi),
                rotate: None,
            },
        }];

        let page = PdfPage::new(page_w, page_h, ops);
        doc.with_pages(vec![page]);

        debug!(img_width, img_height, img_w_pt, img_h_pt, "Image placed on page");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(count = warnings.len(), "printpdf reported warnings");
        }

        Ok(output)
    }
}

/// PDF colour space for a JPEG that can be embedded as-is, judged from its
/// frame header rather than the decoder, which converts CMYK to RGB.
fn dct_color_space(jpeg: &[u8]) -> Option<&'static str> {
    match jpeg_frame(jpeg)? {
        (8, 1) => Some("DeviceGray"),
        (8, 3) => Some("DeviceRGB"),
        _ => None,
    }
}

/// Sample precision and component count from the first SOF segment.
fn jpeg_frame(jpeg: &[u8]) -> Option<(u8, u8)> {
    if jpeg.get(..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut pos = 2;
    loop {
        if *jpeg.get(pos)? != 0xFF {
            return None;
        }
        // Any number of 0xFF fill bytes may precede the marker code.
        let mut code_pos = pos + 1;
        while *jpeg.get(code_pos)? == 0xFF {
            code_pos += 1;
        }
        let marker = *jpeg.get(code_pos)?;
        pos = code_pos + 1;

        match marker {
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => continue,
            // End of image or start of scan before any frame header.
            0xD9 | 0xDA => return None,
            // SOF0..SOF15, excluding DHT, JPG and DAC.
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let precision = *jpeg.get(pos + 2)?;
                let components = *jpeg.get(pos + 7)?;
                return Some((precision, components));
            }
            _ => {
                let length =
                    usize::from(u16::from_be_bytes([*jpeg.get(pos)?, *jpeg.get(pos + 1)?]));
                if length < 2 {
                    return None;
                }
                pos += length;
            }
        }
    }
}

fn zlib(data: &[u8]) -> Result<Vec<u8>, HeftwerkError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
