// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading, page extraction, merging, and creating PDFs from images.

pub mod merge;
mod outline;
pub(crate) mod pages;
pub mod reader;
pub mod writer;

pub use merge::MergeEngine;
pub use reader::PdfReader;
pub use writer::PdfWriter;
