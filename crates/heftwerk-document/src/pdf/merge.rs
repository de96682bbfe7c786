// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Merge engine: concatenate an ordered list of PDFs into one document.
//
// The input order is authoritative: every page of input 1, then every page of
// input 2, and so on. Bookmarks of every input are carried over in the same
// order. Any failure aborts the whole merge; callers never see a partial
// document.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use heftwerk_core::error::HeftwerkError;
use heftwerk_core::types::MergedArtifact;
use lopdf::Document;
use tracing::{debug, info, instrument};

use super::outline::OutlineBuilder;
use super::pages::{PageCopier, blank_document, ordered_page_ids};

/// Concatenates PDFs, reporting fractional progress after each input.
pub struct MergeEngine {
    /// Directory the output is materialised in before it is read back.
    scratch_dir: PathBuf,
}

impl MergeEngine {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Merge `ordered_paths` into one PDF and return its bytes.
    ///
    /// `progress` receives `(i + 1) / count` after input `i` has been appended.
    /// The output goes through a temp file in the scratch directory, which is
    /// removed before this returns.
    #[instrument(skip_all, fields(inputs = ordered_paths.len()))]
    pub fn merge<P: AsRef<Path>>(
        &self,
        ordered_paths: &[P],
        mut progress: impl FnMut(f32),
    ) -> Result<Vec<u8>, HeftwerkError> {
        if ordered_paths.is_empty() {
            return Err(HeftwerkError::Merge {
                index: 0,
                name: String::new(),
                detail: "nothing to merge".into(),
            });
        }

        info!(inputs = ordered_paths.len(), "Merging PDFs");

        let count = ordered_paths.len();
        let (mut merged, pages_id) = blank_document();
        let mut outline = OutlineBuilder::new();
        let mut total_pages = 0usize;

        for (index, path) in ordered_paths.iter().enumerate() {
            let path = path.as_ref();
            let fail = |detail: String| HeftwerkError::Merge {
                index: index + 1,
                name: display_name(path),
                detail,
            };

            let source = Document::load(path).map_err(|err| fail(err.to_string()))?;
            let mut copier = PageCopier::new(&source);
            let page_ids = ordered_page_ids(&source);
            for page_id in &page_ids {
                copier
                    .append_page(&mut merged, pages_id, *page_id)
                    .map_err(|err| fail(err.to_string()))?;
            }
            outline
                .absorb(&mut copier, &mut merged)
                .map_err(|err| fail(err.to_string()))?;
            total_pages += page_ids.len();

            debug!(index, pages = page_ids.len(), path = %path.display(), "Input appended");
            progress((index + 1) as f32 / count as f32);
        }

        outline.finish(&mut merged)?;
        let output = self.materialise(&mut merged)?;
        info!(total_pages, output_bytes = output.len(), "Merge complete");
        Ok(output)
    }

    /// Wrap merged bytes into the artifact offered for download.
    pub fn artifact(bytes: Vec<u8>, stem: &str, now: DateTime<Utc>) -> MergedArtifact {
        let page_count = Document::load_mem(&bytes)
            .map(|doc| doc.get_pages().len())
            .unwrap_or(0);
        MergedArtifact {
            file_name: Self::file_name(stem, now),
            bytes,
            page_count,
            created_at: now,
        }
    }

    /// `<stem>_<YYYYMMDD_HHMMSS>.pdf`
    pub fn file_name(stem: &str, now: DateTime<Utc>) -> String {
        format!("{}_{}.pdf", stem, now.format("%Y%m%d_%H%M%S"))
    }

    /// Save to a scratch temp file and read the bytes back. The temp file is
    /// deleted when `file` drops.
    fn materialise(&self, merged: &mut Document) -> Result<Vec<u8>, HeftwerkError> {
        let write_failed = |detail: String| HeftwerkError::Merge {
            index: 0,
            name: "output".into(),
            detail,
        };

        let mut file = tempfile::Builder::new()
            .prefix("merged-")
            .suffix(".pdf")
            .tempfile_in(&self.scratch_dir)?;
        merged
            .save_to(file.as_file_mut())
            .map_err(|err| write_failed(err.to_string()))?;

        let handle = file.as_file_mut();
        handle.seek(SeekFrom::Start(0))?;
        let mut output = Vec::new();
        handle.read_to_end(&mut output)?;
        Ok(output)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use chrono::TimeZone;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn widths(bytes: &[u8]) -> Vec<u32> {
        fixtures::page_widths(&Document::load_mem(bytes).unwrap())
    }

    #[test]
    fn merge_keeps_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.pdf", &fixtures::pdf_with_widths(&[101, 102]));
        let b = write(dir.path(), "b.pdf", &fixtures::pdf_with_widths(&[201]));
        let engine = MergeEngine::new(dir.path());

        let ab = engine.merge(&[&a, &b], |_| {}).unwrap();
        let ba = engine.merge(&[&b, &a], |_| {}).unwrap();

        assert_eq!(widths(&ab), vec![101, 102, 201]);
        assert_eq!(widths(&ba), vec![201, 101, 102]);
    }

    #[test]
    fn reversed_single_page_inputs_give_reversed_output() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.pdf", &fixtures::pdf_with_widths(&[110]));
        let b = write(dir.path(), "b.pdf", &fixtures::pdf_with_widths(&[220]));
        let engine = MergeEngine::new(dir.path());

        let forward = widths(&engine.merge(&[&a, &b], |_| {}).unwrap());
        let mut backward = widths(&engine.merge(&[&b, &a], |_| {}).unwrap());
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn same_file_twice_is_not_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.pdf", &fixtures::pdf_with_widths(&[150]));
        let merged = MergeEngine::new(dir.path()).merge(&[&a, &a], |_| {}).unwrap();
        assert_eq!(widths(&merged), vec![150, 150]);
    }

    #[test]
    fn progress_is_reported_after_each_input() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..4)
            .map(|i| {
                write(
                    dir.path(),
                    &format!("{i}.pdf"),
                    &fixtures::pdf_with_widths(&[100 + i]),
                )
            })
            .collect();

        let mut seen = Vec::new();
        MergeEngine::new(dir.path())
            .merge(&paths, |fraction| seen.push(fraction))
            .unwrap();
        assert_eq!(seen, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn corrupt_input_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.pdf", &fixtures::pdf_with_widths(&[100]));
        let bad = write(dir.path(), "bad.pdf", &fixtures::corrupt_pdf());

        let mut seen = Vec::new();
        let result = MergeEngine::new(dir.path()).merge(&[&good, &bad], |f| seen.push(f));

        match result {
            Err(HeftwerkError::Merge { index, name, .. }) => {
                assert_eq!(index, 2);
                assert_eq!(name, "bad.pdf");
            }
            other => panic!("expected merge error, got {other:?}"),
        }
        assert_eq!(seen, vec![0.5]);
    }

    #[test]
    fn scratch_file_is_removed() {
        let inputs = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let a = write(inputs.path(), "a.pdf", &fixtures::pdf_with_widths(&[100]));

        MergeEngine::new(scratch.path()).merge(&[&a], |_| {}).unwrap();
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let none: [PathBuf; 0] = [];
        assert!(MergeEngine::new(dir.path()).merge(&none, |_| {}).is_err());
    }

    #[test]
    fn bookmarks_of_every_input_are_kept_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(
            dir.path(),
            "a.pdf",
            &fixtures::pdf_with_outline(&[101, 102], &["Intro", "Body"]),
        );
        let plain = write(dir.path(), "plain.pdf", &fixtures::pdf_with_widths(&[150]));
        let b = write(dir.path(), "b.pdf", &fixtures::pdf_with_outline(&[201], &["Appendix"]));

        let merged = MergeEngine::new(dir.path())
            .merge(&[&a, &plain, &b], |_| {})
            .unwrap();
        let doc = Document::load_mem(&merged).unwrap();

        assert_eq!(fixtures::page_widths(&doc), vec![101, 102, 150, 201]);
        assert_eq!(
            fixtures::outline_entries(&doc),
            vec![
                ("Intro".to_string(), Some(0)),
                ("Body".to_string(), Some(1)),
                ("Appendix".to_string(), Some(3)),
            ]
        );

        let root_id = doc
            .catalog()
            .unwrap()
            .get(b"Outlines")
            .unwrap()
            .as_reference()
            .unwrap();
        let root = doc.get_dictionary(root_id).unwrap();
        assert_eq!(root.get(b"Count").unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn merging_without_bookmarks_adds_no_outline() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.pdf", &fixtures::pdf_with_widths(&[100]));
        let merged = MergeEngine::new(dir.path()).merge(&[&a, &a], |_| {}).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        assert!(!doc.catalog().unwrap().has(b"Outlines"));
    }

    #[test]
    fn artifact_name_is_timestamped() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let artifact = MergeEngine::artifact(fixtures::pdf_with_widths(&[100, 200]), "merged_pdf", now);
        assert_eq!(artifact.file_name, "merged_pdf_20260304_050607.pdf");
        assert_eq!(artifact.page_count, 2);
    }
}
