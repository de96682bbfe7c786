// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One user's working state and the interaction cycle that drives it.
//
// Each user interaction is one call to `Session::run_cycle`, which always runs
// the same steps in the same order:
//
//   1. admit uploads not seen before (dedupe, classify, store or convert)
//   2. reconcile against the upload set (names no longer uploaded go away)
//   3. apply the user's action, if any
//   4. sweep temp files nothing references any more
//
// The session owns a private temp directory; dropping the session removes it
// with everything inside.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use heftwerk_core::AppConfig;
use heftwerk_core::error::{HeftwerkError, Result};
use heftwerk_core::types::{ManagedDocument, MergedArtifact, SessionId, UploadedFile};
use heftwerk_document::{DocumentConverter, MergeEngine, PdfReader, ThumbnailRenderer};
use image::RgbImage;
use tempfile::TempDir;
use tracing::{debug, error, info, instrument, warn};

use crate::lifecycle::TempRegistry;
use crate::navigator::{PageNavigator, PageViewer, advisory};
use crate::notice::{CycleReport, Notice};
use crate::store::{Added, FileStore};

/// What the user asked for in this interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// New order of the document list, as names.
    Reorder(Vec<String>),
    Remove(String),
    SetPage { name: String, page: u32 },
    NextPage(String),
    PreviousPage(String),
    Merge,
    /// Discard the current merged artifact.
    ClearMerged,
    /// Applies to images admitted from now on.
    SetPreserveResolution(bool),
}

/// State for one user of the app.
pub struct Session {
    id: SessionId,
    config: AppConfig,
    dir: TempDir,
    store: FileStore,
    registry: TempRegistry,
    navigator: PageNavigator,
    merger: MergeEngine,
    merged: Option<MergedArtifact>,
    /// Upload names that failed admission; retried only after they leave the
    /// upload set.
    rejected: HashSet<String>,
}

impl Session {
    /// Start a session with its own temp directory `heftwerk-<id>` under the
    /// configured temp root.
    pub fn new(config: AppConfig) -> Result<Self> {
        let id = SessionId::new();
        let root = config.temp_root();
        std::fs::create_dir_all(&root)?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("heftwerk-{id}"))
            .rand_bytes(0)
            .tempdir_in(&root)?;
        info!(session = %id, dir = %dir.path().display(), "session started");

        Ok(Self {
            id,
            store: FileStore::new(dir.path()),
            navigator: PageNavigator::new(dir.path(), config.viewer_width),
            merger: MergeEngine::new(dir.path()),
            registry: TempRegistry::new(),
            merged: None,
            rejected: HashSet::new(),
            dir,
            config,
        })
    }

    /// Run one interaction against the current upload set.
    ///
    /// `uploads` is the complete set of files currently in the upload widget.
    /// `progress` receives merge progress when the action is `Merge`.
    #[instrument(skip_all, fields(session = %self.id, uploads = uploads.len()))]
    pub fn run_cycle(
        &mut self,
        uploads: &[UploadedFile],
        action: Option<Action>,
        progress: &mut dyn FnMut(f32),
    ) -> CycleReport {
        let mut report = CycleReport::default();

        self.admit_uploads(uploads, &mut report);

        let current: Vec<&str> = uploads.iter().map(|file| file.name.as_str()).collect();
        let reconciled = self.store.reconcile(&current);
        self.rejected.retain(|name| current.contains(&name.as_str()));

        if let Some(action) = action {
            self.apply(action, &reconciled, progress, &mut report);
        }

        let swept = self.registry.sweep(self.store.paths());
        debug!(
            documents = self.store.len(),
            reconciled = reconciled.len(),
            swept,
            "cycle complete"
        );
        report
    }

    // -- Rendering ------------------------------------------------------------

    /// Hand the current page of `name` to `viewer`.
    pub fn render_current_page(&self, name: &str, viewer: &mut dyn PageViewer) -> Result<()> {
        let document = self.document_or_err(name)?;
        self.navigator
            .render_page(&document.path, document.current_page, viewer)
    }

    /// Thumbnails of the first `limit` pages of `name`, at the configured
    /// scale. A page that fails to render is `None` at its position.
    pub fn thumbnail_strip(
        &self,
        name: &str,
        limit: usize,
        renderer: &ThumbnailRenderer,
    ) -> Vec<Option<RgbImage>> {
        let Some(document) = self.store.get(name) else {
            return Vec::new();
        };
        renderer.render_strip(
            &document.path,
            document.page_count,
            self.config.thumbnail_scale,
            limit,
        )
    }

    /// Advisory for long documents.
    pub fn advisory(&self, name: &str) -> Option<String> {
        let document = self.store.get(name)?;
        advisory(document.page_count, self.config.large_document_pages)
    }

    // -- Accessors ------------------------------------------------------------

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Replace the settings. Takes effect for later uploads and renders; the
    /// temp directory of a running session does not move.
    pub fn set_config(&mut self, config: AppConfig) {
        self.navigator.set_width(config.viewer_width);
        self.config = config;
    }

    /// Documents in merge order.
    pub fn documents(&self) -> &[ManagedDocument] {
        self.store.documents()
    }

    pub fn document(&self, name: &str) -> Option<&ManagedDocument> {
        self.store.get(name)
    }

    pub fn merged(&self) -> Option<&MergedArtifact> {
        self.merged.as_ref()
    }

    pub fn take_merged(&mut self) -> Option<MergedArtifact> {
        self.merged.take()
    }

    pub fn temp_dir(&self) -> &Path {
        self.dir.path()
    }

    // -- Cycle steps ----------------------------------------------------------

    fn admit_uploads(&mut self, uploads: &[UploadedFile], report: &mut CycleReport) {
        for file in uploads {
            if self.store.contains(&file.name) || self.rejected.contains(&file.name) {
                continue;
            }
            if let Err(err) = self.admit(file) {
                warn!(file = %file.name, %err, "upload not admitted");
                report.push(Notice::from_error(&file.name, &err));
                self.rejected.insert(file.name.clone());
            }
        }
    }

    fn admit(&mut self, file: &UploadedFile) -> Result<()> {
        let kind = DocumentConverter::admit(file)?;

        if kind.is_image() {
            let path = DocumentConverter::image_to_pdf(
                &file.bytes,
                self.config.preserve_resolution,
                self.dir.path(),
                &self.config,
            )?;
            self.registry.register(&path);
            let page_count = PdfReader::open(&path)?.page_count();
            self.store.adopt(file.name.clone(), path, kind, page_count);
        } else if let Added::Stored(path) = self.store.add(file)? {
            self.registry.register(path);
        }
        Ok(())
    }

    fn apply(
        &mut self,
        action: Action,
        reconciled: &[String],
        progress: &mut dyn FnMut(f32),
        report: &mut CycleReport,
    ) {
        debug!(?action, "applying action");
        match action {
            Action::Reorder(order) => self.store.reorder(&order),
            Action::Remove(name) => {
                // The upload widget usually drops the file in the same
                // interaction, in which case reconcile already removed it.
                let outcome = if reconciled.contains(&name) {
                    Ok(())
                } else {
                    self.store.remove(&name).map(|_| ())
                };
                match outcome {
                    Ok(()) => report.push(Notice::info(format!("Removed {name}."))),
                    Err(err) => report.push(Notice::from_error(&name, &err)),
                }
            }
            Action::SetPage { name, page } => {
                self.navigate(&name, report, |doc| PageNavigator::set_page(doc, page));
            }
            Action::NextPage(name) => self.navigate(&name, report, PageNavigator::next),
            Action::PreviousPage(name) => self.navigate(&name, report, PageNavigator::previous),
            Action::Merge => self.merge(progress, report),
            Action::ClearMerged => self.merged = None,
            Action::SetPreserveResolution(preserve) => {
                self.config.preserve_resolution = preserve;
            }
        }
    }

    fn navigate(
        &mut self,
        name: &str,
        report: &mut CycleReport,
        step: impl FnOnce(&mut ManagedDocument) -> u32,
    ) {
        match self.store.get_mut(name) {
            Some(document) => {
                let page = step(document);
                debug!(name, page, "page selected");
            }
            None => report.push(Notice::from_error(
                name,
                &HeftwerkError::UnknownDocument(name.to_string()),
            )),
        }
    }

    fn merge(&mut self, progress: &mut dyn FnMut(f32), report: &mut CycleReport) {
        if self.store.is_empty() {
            report.push(Notice::warning("Upload at least one file to merge."));
            return;
        }

        let paths: Vec<PathBuf> = self.store.paths().map(Path::to_path_buf).collect();
        match self.merger.merge(&paths, |fraction| progress(fraction)) {
            Ok(bytes) => {
                let artifact =
                    MergeEngine::artifact(bytes, &self.config.merged_file_stem, Utc::now());
                report.push(Notice::success(format!(
                    "Merged {} files into {} ({} pages).",
                    paths.len(),
                    artifact.file_name,
                    artifact.page_count
                )));
                self.merged = Some(artifact);
                report.merged = true;
            }
            Err(err) => {
                error!(%err, "merge failed");
                self.merged = None;
                report.push(Notice::from_error("Merge", &err));
            }
        }
    }

    fn document_or_err(&self, name: &str) -> Result<&ManagedDocument> {
        self.store
            .get(name)
            .ok_or_else(|| HeftwerkError::UnknownDocument(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;
    use heftwerk_core::types::DocumentType;
    use heftwerk_document::fixtures;
    use lopdf::Document;

    fn session(root: &Path) -> Session {
        Session::new(AppConfig {
            temp_root: Some(root.to_path_buf()),
            ..AppConfig::default()
        })
        .unwrap()
    }

    fn no_progress() -> impl FnMut(f32) {
        |_| {}
    }

    fn a_pdf() -> UploadedFile {
        UploadedFile::new("a.pdf", fixtures::pdf_with_widths(&[101, 102]))
    }

    fn b_png() -> UploadedFile {
        UploadedFile::new("b.png", fixtures::png_bytes(40, 60, true))
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn session_dir_is_named_after_the_id_and_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let session = session(root.path());
        let dir = session.temp_dir().to_path_buf();

        assert!(dir.is_dir());
        assert_eq!(
            dir.file_name().unwrap().to_string_lossy(),
            format!("heftwerk-{}", session.id())
        );

        drop(session);
        assert!(!dir.exists());
    }

    #[test]
    fn upload_reorder_merge_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());
        let uploads = vec![a_pdf(), b_png()];

        let report = session.run_cycle(&uploads, None, &mut no_progress());
        assert!(!report.has_errors(), "{:?}", report.notices);
        let names: Vec<&str> = session.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.png"]);
        assert_eq!(session.document("b.png").unwrap().kind, DocumentType::Png);

        session.run_cycle(
            &uploads,
            Some(Action::Reorder(vec!["b.png".into(), "a.pdf".into()])),
            &mut no_progress(),
        );

        let mut seen: Vec<f32> = Vec::new();
        let report = session.run_cycle(&uploads, Some(Action::Merge), &mut |f: f32| seen.push(f));
        assert!(report.merged);
        assert_eq!(report.at(NoticeLevel::Success).count(), 1);
        assert_eq!(seen, vec![0.5, 1.0]);

        let merged = session.merged().unwrap();
        assert_eq!(merged.page_count, 3);
        assert!(merged.file_name.starts_with("merged_pdf_"));
        let doc = Document::load_mem(&merged.bytes).unwrap();
        assert_eq!(fixtures::page_widths(&doc), vec![40, 101, 102]);
    }

    #[test]
    fn repeated_cycles_do_not_duplicate_documents() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());
        let uploads = vec![a_pdf(), a_pdf()];

        session.run_cycle(&uploads, None, &mut no_progress());
        let path = session.document("a.pdf").unwrap().path.clone();
        session.run_cycle(&uploads, None, &mut no_progress());

        assert_eq!(session.documents().len(), 1);
        assert_eq!(session.document("a.pdf").unwrap().path, path);
        assert_eq!(files_in(session.temp_dir()), 1);
    }

    #[test]
    fn unsupported_upload_is_warned_about_once() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());
        let uploads = vec![UploadedFile::new("notes.docx", b"PK".to_vec()), a_pdf()];

        let first = session.run_cycle(&uploads, None, &mut no_progress());
        assert_eq!(first.at(NoticeLevel::Warning).count(), 1);
        assert_eq!(session.documents().len(), 1);

        let second = session.run_cycle(&uploads, None, &mut no_progress());
        assert!(second.notices.is_empty());
    }

    #[test]
    fn failed_conversion_skips_only_that_file() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());
        let uploads = vec![
            UploadedFile::new("broken.png", b"not an image".to_vec()),
            a_pdf(),
        ];

        let report = session.run_cycle(&uploads, None, &mut no_progress());
        assert_eq!(report.at(NoticeLevel::Error).count(), 1);
        assert!(report.notices[0].text.starts_with("broken.png: "));
        assert_eq!(session.documents().len(), 1);
        assert_eq!(files_in(session.temp_dir()), 1);
    }

    #[test]
    fn files_leaving_the_upload_set_are_deleted() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());

        session.run_cycle(&[a_pdf(), b_png()], None, &mut no_progress());
        let a_path = session.document("a.pdf").unwrap().path.clone();
        assert_eq!(files_in(session.temp_dir()), 2);

        session.run_cycle(&[b_png()], None, &mut no_progress());
        assert!(session.document("a.pdf").is_none());
        assert!(!a_path.exists());
        assert_eq!(files_in(session.temp_dir()), 1);
    }

    #[test]
    fn remove_action_works_with_or_without_the_widget_update() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());
        let both = vec![a_pdf(), b_png()];
        session.run_cycle(&both, None, &mut no_progress());

        let report = session.run_cycle(
            &[b_png()],
            Some(Action::Remove("a.pdf".into())),
            &mut no_progress(),
        );
        assert!(!report.has_errors());
        assert_eq!(session.documents().len(), 1);

        let report = session.run_cycle(
            &[b_png()],
            Some(Action::Remove("b.png".into())),
            &mut no_progress(),
        );
        assert_eq!(report.at(NoticeLevel::Info).count(), 1);
        assert!(session.documents().is_empty());

        let report = session.run_cycle(&[], Some(Action::Remove("zzz".into())), &mut no_progress());
        assert!(report.has_errors());
    }

    #[test]
    fn page_actions_are_clamped() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());
        let uploads = vec![a_pdf()];
        session.run_cycle(&uploads, None, &mut no_progress());

        let set = |page| Action::SetPage {
            name: "a.pdf".into(),
            page,
        };
        session.run_cycle(&uploads, Some(set(7)), &mut no_progress());
        assert_eq!(session.document("a.pdf").unwrap().current_page, 2);
        session.run_cycle(&uploads, Some(Action::PreviousPage("a.pdf".into())), &mut no_progress());
        session.run_cycle(&uploads, Some(Action::PreviousPage("a.pdf".into())), &mut no_progress());
        assert_eq!(session.document("a.pdf").unwrap().current_page, 1);
        session.run_cycle(&uploads, Some(Action::NextPage("a.pdf".into())), &mut no_progress());
        assert_eq!(session.document("a.pdf").unwrap().current_page, 2);

        let report = session.run_cycle(&uploads, Some(Action::NextPage("x".into())), &mut no_progress());
        assert!(report.has_errors());
    }

    #[test]
    fn merge_without_documents_is_a_warning() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());

        let report = session.run_cycle(&[], Some(Action::Merge), &mut no_progress());
        assert!(!report.merged);
        assert_eq!(report.at(NoticeLevel::Warning).count(), 1);
        assert!(session.merged().is_none());
    }

    #[test]
    fn merge_failure_reports_once_and_keeps_no_artifact() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());
        let uploads = vec![a_pdf(), b_png()];
        session.run_cycle(&uploads, None, &mut no_progress());
        session.run_cycle(&uploads, Some(Action::Merge), &mut no_progress());
        assert!(session.merged().is_some());

        let a_path = session.document("a.pdf").unwrap().path.clone();
        std::fs::write(&a_path, fixtures::corrupt_pdf()).unwrap();

        let report = session.run_cycle(&uploads, Some(Action::Merge), &mut no_progress());
        assert!(!report.merged);
        assert_eq!(report.at(NoticeLevel::Error).count(), 1);
        assert!(session.merged().is_none());
    }

    #[test]
    fn clear_and_take_merged() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());
        let uploads = vec![a_pdf()];
        session.run_cycle(&uploads, Some(Action::Merge), &mut no_progress());
        assert!(session.take_merged().is_some());
        assert!(session.merged().is_none());

        session.run_cycle(&uploads, Some(Action::Merge), &mut no_progress());
        session.run_cycle(&uploads, Some(Action::ClearMerged), &mut no_progress());
        assert!(session.merged().is_none());
    }

    #[test]
    fn preserve_resolution_applies_to_later_images() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());

        session.run_cycle(
            &[],
            Some(Action::SetPreserveResolution(false)),
            &mut no_progress(),
        );
        assert!(!session.config().preserve_resolution);

        session.run_cycle(&[b_png()], None, &mut no_progress());
        let path = session.document("b.png").unwrap().path.clone();
        let reader = PdfReader::open(&path).unwrap();
        let (width, _) = reader.page_size(1).unwrap();
        // Rasterised images land on A4, not on a 40 pt page.
        assert!(width > 500.0);
    }

    #[test]
    fn render_current_page_and_advisory() {
        struct CountingViewer(usize);
        impl PageViewer for CountingViewer {
            fn show(&mut self, pdf: &Path, _width: u32) -> Result<()> {
                assert!(pdf.exists());
                self.0 += 1;
                Ok(())
            }
        }

        let root = tempfile::tempdir().unwrap();
        let mut session = session(root.path());
        session.run_cycle(&[a_pdf()], None, &mut no_progress());

        let mut viewer = CountingViewer(0);
        session.render_current_page("a.pdf", &mut viewer).unwrap();
        assert_eq!(viewer.0, 1);
        assert_eq!(files_in(session.temp_dir()), 1);
        assert!(matches!(
            session.render_current_page("zzz", &mut viewer),
            Err(HeftwerkError::UnknownDocument(_))
        ));

        assert!(session.advisory("a.pdf").is_none());

        // Failed pages keep their slot so the strip can say which one failed.
        let strip = session.thumbnail_strip("a.pdf", 8, &ThumbnailRenderer::disabled());
        let pages = session.document("a.pdf").unwrap().page_count;
        assert_eq!(strip.len(), pages.min(8));
        assert!(strip.iter().all(Option::is_none));
        assert!(
            session
                .thumbnail_strip("zzz", 8, &ThumbnailRenderer::disabled())
                .is_empty()
        );
    }
}
