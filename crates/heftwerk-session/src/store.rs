// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ordered list of the documents in a session.
//
// Names are unique: adding a name that is already tracked does nothing. The
// list order is the merge order. Every entry is backed by a PDF temp file
// inside the session directory; removing an entry unlinks its file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use heftwerk_core::error::{HeftwerkError, Result};
use heftwerk_core::types::{DocumentType, ManagedDocument, UploadedFile};
use heftwerk_document::PdfReader;
use heftwerk_document::convert::persist_temp;
use tracing::{debug, info, instrument};

use crate::lifecycle::discard;

/// Outcome of adding a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Added {
    /// Newly tracked, backed by the file at this path.
    Stored(PathBuf),
    /// A document with this name is already tracked; nothing was written.
    Duplicate,
}

/// The session's document list.
pub struct FileStore {
    /// Directory new temp files are written to.
    dir: PathBuf,
    documents: Vec<ManagedDocument>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            documents: Vec::new(),
        }
    }

    /// Store an uploaded PDF.
    ///
    /// The bytes are parsed once to read the page count, then written to a new
    /// temp file. A duplicate name returns `Added::Duplicate` without any I/O.
    #[instrument(skip_all, fields(name = %file.name, bytes_len = file.bytes.len()))]
    pub fn add(&mut self, file: &UploadedFile) -> Result<Added> {
        if self.contains(&file.name) {
            debug!("already tracked");
            return Ok(Added::Duplicate);
        }

        let page_count = PdfReader::from_bytes(&file.bytes)?.page_count();
        let path = persist_temp(&self.dir, "upload-", &file.bytes)?;
        self.documents.push(ManagedDocument::new(
            file.name.clone(),
            path.clone(),
            DocumentType::Pdf,
            page_count,
        ));

        info!(page_count, path = %path.display(), "document stored");
        Ok(Added::Stored(path))
    }

    /// Track a PDF that was written elsewhere, such as a converted image.
    pub fn adopt(
        &mut self,
        name: impl Into<String>,
        path: PathBuf,
        kind: DocumentType,
        page_count: usize,
    ) -> Added {
        let name = name.into();
        if self.contains(&name) {
            debug!(name, "already tracked");
            return Added::Duplicate;
        }
        info!(name, page_count, path = %path.display(), "document adopted");
        self.documents
            .push(ManagedDocument::new(name, path.clone(), kind, page_count));
        Added::Stored(path)
    }

    /// Apply a new order given as names.
    ///
    /// Unknown names and repeats are ignored. Tracked names missing from
    /// `new_order` keep their relative order after the listed ones, so the
    /// set of documents never changes.
    pub fn reorder<S: AsRef<str>>(&mut self, new_order: &[S]) {
        let mut remaining = std::mem::take(&mut self.documents);
        let mut ordered = Vec::with_capacity(remaining.len());

        for name in new_order {
            if let Some(position) = remaining.iter().position(|doc| doc.name == name.as_ref()) {
                ordered.push(remaining.remove(position));
            }
        }
        ordered.extend(remaining);

        self.documents = ordered;
        debug!(order = ?self.names(), "documents reordered");
    }

    /// Move a document one place towards the front.
    pub fn move_up(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        if index > 0 {
            let mut names = self.names();
            names.swap(index - 1, index);
            self.reorder(&names);
        }
        Ok(())
    }

    /// Move a document one place towards the back.
    pub fn move_down(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        if index + 1 < self.documents.len() {
            let mut names = self.names();
            names.swap(index, index + 1);
            self.reorder(&names);
        }
        Ok(())
    }

    /// Stop tracking a document and delete its file.
    #[instrument(skip(self))]
    pub fn remove(&mut self, name: &str) -> Result<ManagedDocument> {
        let index = self.index_of(name)?;
        let document = self.documents.remove(index);
        discard(&document.path);
        info!("document removed");
        Ok(document)
    }

    /// Drop every document whose name is not in `current_names`, deleting
    /// their files. Returns the removed names in list order.
    pub fn reconcile<S: AsRef<str>>(&mut self, current_names: &[S]) -> Vec<String> {
        let current: HashSet<&str> = current_names.iter().map(AsRef::as_ref).collect();
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.documents)
            .into_iter()
            .partition(|doc| current.contains(doc.name.as_str()));
        self.documents = kept;

        dropped
            .into_iter()
            .map(|doc| {
                discard(&doc.path);
                info!(name = %doc.name, "document no longer uploaded");
                doc.name
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.documents.iter().any(|doc| doc.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ManagedDocument> {
        self.documents.iter().find(|doc| doc.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ManagedDocument> {
        self.documents.iter_mut().find(|doc| doc.name == name)
    }

    /// Documents in merge order.
    pub fn documents(&self) -> &[ManagedDocument] {
        &self.documents
    }

    pub fn names(&self) -> Vec<String> {
        self.documents.iter().map(|doc| doc.name.clone()).collect()
    }

    /// Backing files of every tracked document.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.documents.iter().map(|doc| doc.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.documents
            .iter()
            .position(|doc| doc.name == name)
            .ok_or_else(|| HeftwerkError::UnknownDocument(name.to_string()))
    }
}
