// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Heftwerk.

use thiserror::Error;

/// Top-level error type for all Heftwerk operations.
#[derive(Debug, Error)]
pub enum HeftwerkError {
    // -- Admission --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("image conversion failed: {0}")]
    Conversion(String),

    #[error("page rendering failed: {0}")]
    Render(String),

    #[error("page {page} out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: usize },

    #[error("merge failed at document #{index} ({name}): {detail}")]
    Merge {
        index: usize,
        name: String,
        detail: String,
    },

    // -- Session --
    #[error("no document named {0:?} in this session")]
    UnknownDocument(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HeftwerkError>;
