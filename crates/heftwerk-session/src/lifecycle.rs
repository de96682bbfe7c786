// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Temp-file bookkeeping for a session.
//
// Every file the session writes (stored uploads, converted images) is
// registered here. After each cycle, files no longer referenced by the file
// list are deleted. Deletion is best-effort: a file that is already gone or
// cannot be removed is logged and forgotten, never reported as an error.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

/// Set of temp files created by one session.
#[derive(Debug, Default)]
pub struct TempRegistry {
    known: HashSet<PathBuf>,
}

impl TempRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a file so a later sweep can delete it.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        self.known.insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.known.contains(path)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Delete every tracked file not in `referenced` and stop tracking it.
    ///
    /// Returns how many files were forgotten, whether or not their deletion
    /// succeeded.
    #[instrument(skip_all, fields(known = self.known.len()))]
    pub fn sweep<'a>(&mut self, referenced: impl IntoIterator<Item = &'a Path>) -> usize {
        let referenced: HashSet<&Path> = referenced.into_iter().collect();
        let orphans: Vec<PathBuf> = self
            .known
            .iter()
            .filter(|path| !referenced.contains(path.as_path()))
            .cloned()
            .collect();

        for path in &orphans {
            discard(path);
            self.known.remove(path);
        }

        if !orphans.is_empty() {
            debug!(swept = orphans.len(), "orphaned temp files swept");
        }
        orphans.len()
    }
}

/// Remove a file, swallowing every error. Returns whether the file was deleted.
pub(crate) fn discard(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "temp file deleted");
            true
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "temp file already gone");
            false
        }
        Err(err) => {
            debug!(path = %path.display(), %err, "temp file could not be deleted");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn sweep_deletes_only_unreferenced_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = touch(dir.path(), "kept.pdf");
        let orphan = touch(dir.path(), "orphan.pdf");

        let mut registry = TempRegistry::new();
        registry.register(&kept);
        registry.register(&orphan);

        assert_eq!(registry.sweep([kept.as_path()]), 1);
        assert!(kept.exists());
        assert!(!orphan.exists());
        assert!(registry.contains(&kept));
        assert!(!registry.contains(&orphan));
    }

    #[test]
    fn missing_files_are_forgotten_silently() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TempRegistry::new();
        registry.register(dir.path().join("never-written.pdf"));

        assert_eq!(registry.sweep(std::iter::empty()), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn sweep_with_everything_referenced_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.pdf");
        let mut registry = TempRegistry::new();
        registry.register(&a);

        assert_eq!(registry.sweep([a.as_path()]), 0);
        assert_eq!(registry.len(), 1);
        assert!(a.exists());
    }

    #[test]
    fn discard_reports_whether_a_file_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.pdf");
        assert!(discard(&a));
        assert!(!discard(&a));
    }
}
