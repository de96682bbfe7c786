// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open and inspect existing PDF documents and cut single pages
// out of them using the `lopdf` crate.

use std::path::Path;

use heftwerk_core::error::HeftwerkError;
use lopdf::{Document, ObjectId};
use tracing::{debug, info, instrument};

use super::pages::{PageCopier, blank_document, number};

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document` and provides the page-level operations the preview
/// needs: counting pages, reading page sizes and extracting single pages.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HeftwerkError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            HeftwerkError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, HeftwerkError> {
        let document = Document::load_mem(data).map_err(|err| {
            HeftwerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Borrow the underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Width and height in points of a page (1-indexed), taken from its
    /// MediaBox (inherited if needed).
    pub fn page_size(&self, page_number: u32) -> Result<(f64, f64), HeftwerkError> {
        let page_id = self.page_id(page_number)?;
        let media_box = self.media_box(page_id).ok_or_else(|| {
            HeftwerkError::PdfError(format!("page {} has no usable /MediaBox", page_number))
        })?;
        Ok((
            (media_box[2] - media_box[0]).abs(),
            (media_box[3] - media_box[1]).abs(),
        ))
    }

    // -- Extraction -----------------------------------------------------------

    /// Extract a single page (1-indexed) into a new standalone PDF document.
    ///
    /// Returns the serialised bytes of the single-page PDF.
    #[instrument(skip(self))]
    pub fn extract_page(&self, page_number: u32) -> Result<Vec<u8>, HeftwerkError> {
        let page_id = self.page_id(page_number)?;

        let (mut new_doc, pages_id) = blank_document();
        PageCopier::new(&self.document).append_page(&mut new_doc, pages_id, page_id)?;

        let mut output = Vec::new();
        new_doc.save_to(&mut output).map_err(|err| {
            HeftwerkError::PdfError(format!("failed to serialise extracted page: {}", err))
        })?;

        debug!(page_number, output_bytes = output.len(), "Page extracted");
        Ok(output)
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_number: u32) -> Result<ObjectId, HeftwerkError> {
        let pages = self.document.get_pages();
        if page_number == 0 || page_number as usize > pages.len() {
            return Err(HeftwerkError::PageOutOfRange {
                page: page_number,
                total: pages.len(),
            });
        }

        // lopdf pages are keyed by 1-indexed page number.
        pages.get(&page_number).copied().ok_or_else(|| {
            HeftwerkError::PdfError(format!("page {} not found in page tree", page_number))
        })
    }

    fn media_box(&self, page_id: ObjectId) -> Option<[f64; 4]> {
        let mut node_id = page_id;
        // Walk up the tree; MediaBox is inheritable.
        for _ in 0..64 {
            let node = self.document.get_dictionary(node_id).ok()?;
            if let Ok(values) = node.get(b"MediaBox").and_then(|object| object.as_array()) {
                let numbers: Vec<f64> = values.iter().filter_map(number).collect();
                return <[f64; 4]>::try_from(numbers).ok();
            }
            node_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        }
        None
    }
}
