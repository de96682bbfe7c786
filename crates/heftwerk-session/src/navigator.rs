// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selection and single-page preview.
//
// The viewer is only ever handed one page: it is cut out into a minimal PDF,
// written to a throwaway temp file, shown, and the file is deleted again.

use std::io::Write;
use std::path::{Path, PathBuf};

use heftwerk_core::error::Result;
use heftwerk_core::types::ManagedDocument;
use heftwerk_document::PdfReader;
use tracing::{debug, instrument};

/// Displays a PDF. Implemented by the UI.
pub trait PageViewer {
    /// Show the PDF at `pdf` scaled to `width` pixels. The file only exists
    /// for the duration of the call.
    fn show(&mut self, pdf: &Path, width: u32) -> Result<()>;
}

/// Moves the current page of a document and renders it for the viewer.
pub struct PageNavigator {
    scratch_dir: PathBuf,
    width: u32,
}

impl PageNavigator {
    pub fn new(scratch_dir: impl Into<PathBuf>, width: u32) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            width,
        }
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    /// Select `page`, clamped to the document's pages. Returns the page now
    /// selected.
    pub fn set_page(document: &mut ManagedDocument, page: u32) -> u32 {
        document.current_page = clamp_page(page, document.page_count);
        document.current_page
    }

    pub fn next(document: &mut ManagedDocument) -> u32 {
        Self::set_page(document, document.current_page.saturating_add(1))
    }

    pub fn previous(document: &mut ManagedDocument) -> u32 {
        Self::set_page(document, document.current_page.saturating_sub(1))
    }

    /// Show page `page_number` (1-based) of the PDF at `path`.
    ///
    /// The single-page temp file is removed before this returns, including
    /// when the viewer fails.
    #[instrument(skip_all, fields(path = %path.display(), page = page_number))]
    pub fn render_page(
        &self,
        path: &Path,
        page_number: u32,
        viewer: &mut dyn PageViewer,
    ) -> Result<()> {
        let single_page = PdfReader::open(path)?.extract_page(page_number)?;

        let mut page_file = tempfile::Builder::new()
            .prefix("page-")
            .suffix(".pdf")
            .tempfile_in(&self.scratch_dir)?;
        page_file.write_all(&single_page)?;
        page_file.flush()?;

        debug!(temp = %page_file.path().display(), width = self.width, "handing page to viewer");
        let shown = viewer.show(page_file.path(), self.width);
        drop(page_file);
        shown
    }
}

/// A message for documents too long to browse comfortably, if `page_count`
/// exceeds `threshold`.
pub fn advisory(page_count: usize, threshold: usize) -> Option<String> {
    (page_count > threshold).then(|| {
        format!(
            "This document has {page_count} pages. Previews show one page at a time; \
             use the page selector to jump to a page."
        )
    })
}

fn clamp_page(page: u32, page_count: usize) -> u32 {
    let last = u32::try_from(page_count).unwrap_or(u32::MAX).max(1);
    page.clamp(1, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heftwerk_core::error::HeftwerkError;
    use heftwerk_core::types::DocumentType;
    use heftwerk_document::fixtures;
    use lopdf::Document;

    /// Records what it was shown and checks the file while it still exists.
    #[derive(Default)]
    struct RecordingViewer {
        shown: Vec<(PathBuf, u32, Vec<u32>)>,
        fail: bool,
    }

    impl PageViewer for RecordingViewer {
        fn show(&mut self, pdf: &Path, width: u32) -> Result<()> {
            let doc = Document::load(pdf).map_err(|err| HeftwerkError::PdfError(err.to_string()))?;
            self.shown
                .push((pdf.to_path_buf(), width, fixtures::page_widths(&doc)));
            if self.fail {
                return Err(HeftwerkError::Render("viewer crashed".into()));
            }
            Ok(())
        }
    }

    fn document(page_count: usize) -> ManagedDocument {
        ManagedDocument::new("a.pdf".into(), PathBuf::from("a.pdf"), DocumentType::Pdf, page_count)
    }

    fn write_pdf(dir: &Path, widths: &[u32]) -> PathBuf {
        let path = dir.join("source.pdf");
        std::fs::write(&path, fixtures::pdf_with_widths(widths)).unwrap();
        path
    }

    #[test]
    fn page_selection_is_clamped() {
        let mut doc = document(3);
        assert_eq!(PageNavigator::set_page(&mut doc, 0), 1);
        assert_eq!(PageNavigator::set_page(&mut doc, 9), 3);
        assert_eq!(PageNavigator::next(&mut doc), 3);
        assert_eq!(PageNavigator::previous(&mut doc), 2);
        assert_eq!(PageNavigator::previous(&mut doc), 1);
        assert_eq!(PageNavigator::previous(&mut doc), 1);
        assert_eq!(doc.current_page, 1);
    }

    #[test]
    fn empty_document_stays_on_page_one() {
        let mut doc = document(0);
        assert_eq!(PageNavigator::next(&mut doc), 1);
        assert_eq!(PageNavigator::set_page(&mut doc, 5), 1);
    }

    #[test]
    fn viewer_sees_exactly_one_page_and_the_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_pdf(dir.path(), &[301, 302, 303]);
        let scratch = tempfile::tempdir().unwrap();
        let navigator = PageNavigator::new(scratch.path(), 640);
        let mut viewer = RecordingViewer::default();

        navigator.render_page(&source, 2, &mut viewer).unwrap();

        let (path, width, widths) = &viewer.shown[0];
        assert_eq!(*width, 640);
        assert_eq!(widths, &vec![302]);
        assert!(path.starts_with(scratch.path()));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn temp_page_is_removed_when_the_viewer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_pdf(dir.path(), &[301]);
        let scratch = tempfile::tempdir().unwrap();
        let navigator = PageNavigator::new(scratch.path(), 700);
        let mut viewer = RecordingViewer {
            fail: true,
            ..Default::default()
        };

        assert!(navigator.render_page(&source, 1, &mut viewer).is_err());
        assert_eq!(viewer.shown.len(), 1);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn out_of_range_page_never_reaches_the_viewer() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_pdf(dir.path(), &[301]);
        let navigator = PageNavigator::new(dir.path(), 700);
        let mut viewer = RecordingViewer::default();

        assert!(matches!(
            navigator.render_page(&source, 4, &mut viewer),
            Err(HeftwerkError::PageOutOfRange { page: 4, total: 1 })
        ));
        assert!(viewer.shown.is_empty());
    }

    #[test]
    fn advisory_only_above_threshold() {
        assert!(advisory(30, 30).is_none());
        let message = advisory(31, 30).unwrap();
        assert!(message.contains("31 pages"));
    }
}
