// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Embed images losslessly at their native pixel size instead of
    /// re-encoding them at `raster_dpi`.
    pub preserve_resolution: bool,
    /// Resolution of the re-encode path.
    pub raster_dpi: f32,
    /// Page size used when re-encoding images.
    pub paper_size: crate::PaperSize,
    /// Scale factor applied to page size for preview thumbnails.
    pub thumbnail_scale: f32,
    /// Display width handed to the viewer, in pixels.
    pub viewer_width: u32,
    /// Documents with more pages than this get a preview advisory.
    pub large_document_pages: usize,
    /// Stem of the merged file name; a timestamp is appended.
    pub merged_file_stem: String,
    /// Parent of the per-session temp directories. `None` uses the OS temp dir.
    pub temp_root: Option<PathBuf>,
}

impl AppConfig {
    /// Directory session temp dirs are created in.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preserve_resolution: true,
            raster_dpi: 100.0,
            paper_size: crate::PaperSize::A4,
            thumbnail_scale: 0.2,
            viewer_width: 700,
            large_document_pages: 30,
            merged_file_stem: "merged_pdf".into(),
            temp_root: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"viewer_width": 900}"#).unwrap();
        assert_eq!(config.viewer_width, 900);
        assert!(config.preserve_resolution);
        assert_eq!(config.large_document_pages, 30);
    }

    #[test]
    fn temp_root_defaults_to_os_temp_dir() {
        let config = AppConfig::default();
        assert_eq!(config.temp_root(), std::env::temp_dir());
    }
}
