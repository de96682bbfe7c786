// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload admission and image-to-PDF conversion.
//
// Only PDF, JPEG and PNG are admitted. PDFs are stored as-is; images become a
// one-page PDF before they join the merge list, either embedded losslessly at
// native resolution or re-encoded at a fixed dpi.

use std::path::{Path, PathBuf};

use heftwerk_core::AppConfig;
use heftwerk_core::error::{HeftwerkError, Result};
use heftwerk_core::types::{DocumentType, UploadedFile};
use tracing::{debug, info, instrument, warn};

use crate::pdf::writer::PdfWriter;

/// Document converter for uploads.
pub struct DocumentConverter;

impl DocumentConverter {
    /// Decide whether an upload may join the session, and as what.
    ///
    /// A declared MIME type wins over the file extension. Anything that is not
    /// a PDF, JPEG or PNG is rejected with `UnsupportedDocument`.
    pub fn admit(file: &UploadedFile) -> Result<DocumentType> {
        let by_mime = file.mime.as_deref().map(|mime| (mime, DocumentType::from_mime(mime)));
        let detected = match by_mime {
            Some((_, Some(doc_type))) => Some(doc_type),
            // An explicit but unknown MIME type is a rejection, not a fallback.
            Some((mime, None)) => {
                warn!(file = %file.name, mime, "rejecting upload with unsupported MIME type");
                return Err(HeftwerkError::UnsupportedDocument(format!(
                    "{} ({})",
                    file.name, mime
                )));
            }
            None => file
                .extension()
                .and_then(|ext| DocumentType::from_extension(&ext)),
        };

        match detected {
            Some(doc_type) => {
                debug!(file = %file.name, mime = doc_type.mime_type(), "upload admitted");
                Ok(doc_type)
            }
            None => {
                warn!(file = %file.name, "rejecting upload with unsupported extension");
                Err(HeftwerkError::UnsupportedDocument(file.name.clone()))
            }
        }
    }

    /// Convert an image to a one-page PDF written to a new temp file in `dir`.
    ///
    /// Alpha is flattened onto white in both paths. With
    /// `preserve_resolution`, the image is embedded losslessly at its native
    /// pixel size; otherwise it is re-encoded at `config.raster_dpi` onto
    /// `config.paper_size`.
    #[instrument(skip(image_bytes, config), fields(bytes_len = image_bytes.len()))]
    pub fn image_to_pdf(
        image_bytes: &[u8],
        preserve_resolution: bool,
        dir: &Path,
        config: &AppConfig,
    ) -> Result<PathBuf> {
        let writer = PdfWriter::new(config.paper_size, config.raster_dpi);
        let pdf_bytes = if preserve_resolution {
            writer.create_lossless(image_bytes)?
        } else {
            writer.create_rasterised(image_bytes)?
        };

        let path = persist_temp(dir, "image-", &pdf_bytes)?;
        info!(path = %path.display(), output_bytes = pdf_bytes.len(), "image converted to PDF");
        Ok(path)
    }
}

/// Write `bytes` to a new, kept temp file in `dir` and return its path.
pub fn persist_temp(dir: &Path, prefix: &str, bytes: &[u8]) -> Result<PathBuf> {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".pdf")
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    let path = file
        .into_temp_path()
        .keep()
        .map_err(|err| HeftwerkError::Io(err.error))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::pdf::reader::PdfReader;

    #[test]
    fn admits_supported_extensions() {
        for (name, expected) in [
            ("a.pdf", DocumentType::Pdf),
            ("B.PDF", DocumentType::Pdf),
            ("photo.jpg", DocumentType::Jpeg),
            ("photo.jpeg", DocumentType::Jpeg),
            ("scan.png", DocumentType::Png),
        ] {
            let file = UploadedFile::new(name, Vec::new());
            assert_eq!(DocumentConverter::admit(&file).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn rejects_unsupported_extension() {
        let file = UploadedFile::new("notes.docx", Vec::new());
        assert!(matches!(
            DocumentConverter::admit(&file),
            Err(HeftwerkError::UnsupportedDocument(_))
        ));
    }

    #[test]
    fn declared_mime_wins_over_extension() {
        let file = UploadedFile::new("renamed.pdf", Vec::new()).with_mime("image/gif");
        assert!(DocumentConverter::admit(&file).is_err());

        let file = UploadedFile::new("no-extension", Vec::new()).with_mime("image/png");
        assert_eq!(DocumentConverter::admit(&file).unwrap(), DocumentType::Png);
    }

    #[test]
    fn image_to_pdf_writes_a_one_page_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default();

        for preserve in [true, false] {
            let path = DocumentConverter::image_to_pdf(
                &fixtures::png_bytes(50, 80, true),
                preserve,
                dir.path(),
                &config,
            )
            .unwrap();
            assert!(path.starts_with(dir.path()));
            assert_eq!(PdfReader::open(&path).unwrap().page_count(), 1);
        }
    }

    #[test]
    fn conversion_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = DocumentConverter::image_to_pdf(
            b"broken",
            true,
            dir.path(),
            &AppConfig::default(),
        );
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
