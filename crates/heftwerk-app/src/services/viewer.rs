// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page viewer for the webview: rasterises the single-page PDF it is handed
// and keeps the result as a PNG data URL for an `img` element.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use heftwerk_core::error::{HeftwerkError, Result};
use heftwerk_document::render::encode_png;
use heftwerk_document::{PdfReader, ThumbnailRenderer};
use heftwerk_session::PageViewer;

/// Renders through pdfium at the requested display width.
pub struct PngViewer<'a> {
    renderer: &'a ThumbnailRenderer,
    data_url: Option<String>,
}

impl<'a> PngViewer<'a> {
    pub fn new(renderer: &'a ThumbnailRenderer) -> Self {
        Self {
            renderer,
            data_url: None,
        }
    }

    /// The last page shown, if any.
    pub fn into_data_url(self) -> Option<String> {
        self.data_url
    }
}

impl PageViewer for PngViewer<'_> {
    fn show(&mut self, pdf: &Path, width: u32) -> Result<()> {
        let (page_width, _) = PdfReader::open(pdf)?.page_size(1)?;
        let scale = if page_width > 0.0 {
            (f64::from(width) / page_width) as f32
        } else {
            1.0
        };

        let image = self
            .renderer
            .render_thumbnail(pdf, 0, scale)
            .ok_or_else(|| HeftwerkError::Render("page preview unavailable".into()))?;
        self.data_url = Some(png_data_url(&encode_png(&image)?));
        Ok(())
    }
}

/// `data:` URL for PNG bytes.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
