// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterisation for previews, backed by pdfium.
//
// The pdfium library is bound once per renderer. Documents and pages are
// opened per call and dropped before the call returns, so memory stays flat
// while a whole strip of thumbnails is generated.

use std::path::Path;

use heftwerk_core::error::HeftwerkError;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use pdfium_render::prelude::*;
use tracing::{debug, error, instrument, warn};

use crate::image::processor::encode_to_format;

/// Rasterises PDF pages. Every failure is logged and reported as "no image".
pub struct ThumbnailRenderer {
    /// `None` when no pdfium library could be bound.
    pdfium: Option<Pdfium>,
}

impl ThumbnailRenderer {
    /// Bind pdfium, trying a library next to the executable first and the
    /// system library second.
    pub fn new() -> Self {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library());

        match bindings {
            Ok(bindings) => {
                debug!("pdfium bound");
                Self {
                    pdfium: Some(Pdfium::new(bindings)),
                }
            }
            Err(err) => {
                warn!(%err, "pdfium unavailable; page previews disabled");
                Self { pdfium: None }
            }
        }
    }

    /// A renderer that never produces images.
    pub fn disabled() -> Self {
        Self { pdfium: None }
    }

    /// Whether a pdfium library is bound.
    pub fn is_available(&self) -> bool {
        self.pdfium.is_some()
    }

    /// Rasterise the zero-based page `page_index` of the PDF at `path`, with
    /// `scale` applied to the page's size in points.
    ///
    /// Returns `None` (and logs the reason) if the file is missing or corrupt,
    /// the page does not exist, or no renderer is available.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn render_thumbnail(&self, path: &Path, page_index: usize, scale: f32) -> Option<RgbImage> {
        match self.try_render(path, page_index, scale) {
            Ok(image) => Some(image),
            Err(err) => {
                error!(%err, "thumbnail not rendered");
                None
            }
        }
    }

    /// Thumbnails for the first `limit` pages of a document.
    pub fn render_strip(
        &self,
        path: &Path,
        page_count: usize,
        scale: f32,
        limit: usize,
    ) -> Vec<Option<RgbImage>> {
        (0..page_count.min(limit))
            .map(|page_index| self.render_thumbnail(path, page_index, scale))
            .collect()
    }

    fn try_render(
        &self,
        path: &Path,
        page_index: usize,
        scale: f32,
    ) -> Result<RgbImage, HeftwerkError> {
        if !path.is_file() {
            return Err(HeftwerkError::Render(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let pdfium = self
            .pdfium
            .as_ref()
            .ok_or_else(|| HeftwerkError::Render("pdfium library not available".into()))?;

        let index = PdfPageIndex::try_from(page_index)
            .map_err(|_| HeftwerkError::Render(format!("page index {} too large", page_index)))?;

        // Document and page handles live only inside this scope.
        let rgba = {
            let document = pdfium
                .load_pdf_from_file(path, None)
                .map_err(|err| HeftwerkError::Render(format!("cannot open PDF: {}", err)))?;
            let page = document
                .pages()
                .get(index)
                .map_err(|err| HeftwerkError::Render(format!("no page {}: {}", page_index, err)))?;

            let config = PdfRenderConfig::new().scale_page_by_factor(scale);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|err| HeftwerkError::Render(format!("rasterisation failed: {}", err)))?;

            let width = u32::try_from(bitmap.width()).unwrap_or(0);
            let height = u32::try_from(bitmap.height()).unwrap_or(0);
            RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| {
                HeftwerkError::Render("invalid RGBA pixel buffer from pdfium".into())
            })?
        };

        debug!(width = rgba.width(), height = rgba.height(), "page rasterised");
        Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}

impl Default for ThumbnailRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a rendered page as PNG.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, HeftwerkError> {
    encode_to_format(&DynamicImage::ImageRgb8(image.clone()), ImageFormat::Png)
}
