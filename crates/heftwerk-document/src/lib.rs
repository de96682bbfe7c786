// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// heftwerk-document: document processing for the Heftwerk PDF binder.
//
// Provides upload admission and image-to-PDF conversion, PDF reading and
// single-page extraction, ordered merging, and page rasterisation for previews.

pub mod convert;
pub mod image;
pub mod pdf;
pub mod render;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

// Re-export the primary structs so callers can use `heftwerk_document::MergeEngine` etc.
pub use convert::DocumentConverter;
pub use image::processor::ImageProcessor;
pub use pdf::merge::MergeEngine;
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use render::thumbnail::ThumbnailRenderer;
