// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Global application state: reactive signals for the Dioxus UI.

use heftwerk_core::AppConfig;
use heftwerk_core::types::{ManagedDocument, MergedArtifact, UploadedFile};
use heftwerk_session::{CycleReport, Notice};

use crate::services::app_services::AppServices;

/// Shared state accessible to all pages via `use_context`.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Files currently in the upload widget, in pick order.
    pub uploads: Vec<UploadedFile>,
    /// Snapshot of the session's document list, in merge order.
    pub documents: Vec<ManagedDocument>,
    /// Messages from the last interaction.
    pub notices: Vec<Notice>,
    /// Name and page count of the last merge, if one is held.
    pub merged: Option<MergedSummary>,
    /// Document shown in the preview.
    pub selected: Option<String>,
    /// Merge progress in `0.0..=1.0` while a merge runs.
    pub merge_progress: Option<f32>,
    /// Application settings.
    pub config: AppConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSummary {
    pub file_name: String,
    pub page_count: usize,
    pub size_bytes: usize,
}

impl MergedSummary {
    /// Size rounded up to whole KiB.
    pub fn size_kib(&self) -> usize {
        self.size_bytes.div_ceil(1024)
    }
}

impl From<&MergedArtifact> for MergedSummary {
    fn from(artifact: &MergedArtifact) -> Self {
        Self {
            file_name: artifact.file_name.clone(),
            page_count: artifact.page_count,
            size_bytes: artifact.bytes.len(),
        }
    }
}

impl AppState {
    /// Create initial state from the backend services.
    pub fn new(svc: &AppServices) -> Self {
        Self {
            config: svc.config(),
            ..Self::default()
        }
    }

    /// Take over the outcome of a cycle and refresh the session snapshot.
    pub fn absorb(&mut self, report: CycleReport, svc: &AppServices) {
        self.notices = report.notices;
        self.documents = svc.documents();
        self.merged = svc.merged().as_ref().map(MergedSummary::from);

        let still_listed = self
            .selected
            .as_ref()
            .is_some_and(|name| self.documents.iter().any(|doc| &doc.name == name));
        if !still_listed {
            self.selected = self.documents.first().map(|doc| doc.name.clone());
        }
    }

    /// Add picked files to the upload set. Names already present are kept as
    /// they are.
    pub fn add_uploads(&mut self, files: Vec<UploadedFile>) {
        for file in files {
            if !self.uploads.iter().any(|existing| existing.name == file.name) {
                self.uploads.push(file);
            }
        }
    }

    /// Drop a file from the upload set.
    pub fn dismiss_upload(&mut self, name: &str) {
        self.uploads.retain(|file| file.name != name);
    }

    /// A merge holds the session until it finishes; anything else that
    /// needs the session waits for this to turn false.
    pub fn is_merging(&self) -> bool {
        self.merge_progress.is_some()
    }

    pub fn document_names(&self) -> Vec<String> {
        self.documents.iter().map(|doc| doc.name.clone()).collect()
    }
}

/// The order after moving the entry at `from` to position `to`.
pub fn moved(names: &[String], from: usize, to: usize) -> Vec<String> {
    let mut order = names.to_vec();
    if from < order.len() {
        let name = order.remove(from);
        order.insert(to.min(order.len()), name);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn moving_entries() {
        let list = names(&["a", "b", "c"]);
        assert_eq!(moved(&list, 2, 0), names(&["c", "a", "b"]));
        assert_eq!(moved(&list, 0, 1), names(&["b", "a", "c"]));
        assert_eq!(moved(&list, 0, 9), names(&["b", "c", "a"]));
        assert_eq!(moved(&list, 5, 0), list);
    }

    #[test]
    fn merging_lasts_while_progress_is_reported() {
        let mut state = AppState::default();
        assert!(!state.is_merging());
        state.merge_progress = Some(0.0);
        assert!(state.is_merging());
        state.merge_progress = Some(1.0);
        assert!(state.is_merging());
        state.merge_progress = None;
        assert!(!state.is_merging());
    }

    #[test]
    fn uploads_are_unique_by_name() {
        let mut state = AppState::default();
        state.add_uploads(vec![
            UploadedFile::new("a.pdf", vec![1]),
            UploadedFile::new("a.pdf", vec![2]),
            UploadedFile::new("b.png", vec![3]),
        ]);
        assert_eq!(state.uploads.len(), 2);
        assert_eq!(state.uploads[0].bytes, vec![1]);

        state.dismiss_upload("a.pdf");
        assert_eq!(state.uploads.len(), 1);
        assert_eq!(state.uploads[0].name, "b.png");
    }
}
