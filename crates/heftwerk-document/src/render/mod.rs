// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render module: PDF page rasterisation for thumbnails and the page viewer.

pub mod thumbnail;

pub use thumbnail::{ThumbnailRenderer, encode_png};
