// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-tree plumbing shared by page extraction and merging: an empty document
// skeleton, and a copier that moves pages (plus everything they reference)
// from one lopdf document into another.

use std::collections::HashMap;

use heftwerk_core::error::HeftwerkError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::warn;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed, cyclic /Parent chains.
const MAX_TREE_DEPTH: usize = 64;

/// Create an empty document with a catalog and an empty /Pages node.
///
/// Returns the document and the object id of its /Pages node.
pub(crate) fn blank_document() -> (Document, ObjectId) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(Vec::new()),
            "Count" => 0_i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    (doc, pages_id)
}

/// Page ids of `doc` in page order.
pub(crate) fn ordered_page_ids(doc: &Document) -> Vec<ObjectId> {
    // get_pages() is a BTreeMap keyed by 1-based page number.
    doc.get_pages().into_values().collect()
}

/// Copies pages from one source document into a target document.
///
/// Every source object is copied at most once per copier, so resources shared
/// between pages stay shared and reference cycles (annotations pointing back
/// at their page) terminate.
pub(crate) struct PageCopier<'a> {
    source: &'a Document,
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> PageCopier<'a> {
    pub(crate) fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: HashMap::new(),
        }
    }

    /// Append `page_id` from the source as the last page of `target`, whose
    /// /Pages node is `pages_id`. Returns the new page's id in `target`.
    pub(crate) fn append_page(
        &mut self,
        target: &mut Document,
        pages_id: ObjectId,
        page_id: ObjectId,
    ) -> Result<ObjectId, HeftwerkError> {
        let source = self.source;
        let mut page = source
            .get_dictionary(page_id)
            .map_err(|err| {
                HeftwerkError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
            })?
            .clone();
        page.remove(b"Parent");

        for key in INHERITABLE {
            if !page.has(key)
                && let Some(value) = self.inherited(page_id, key)
            {
                page.set(key.to_vec(), value);
            }
        }

        // A page may already have been pulled in through a link destination.
        let new_id = match self.copied.get(&page_id) {
            Some(&id) => id,
            None => {
                let id = target.new_object_id();
                self.copied.insert(page_id, id);
                id
            }
        };

        let mut cloned = self.copy_dictionary(target, &page)?;
        cloned.set("Parent", pages_id);
        target.objects.insert(new_id, Object::Dictionary(cloned));

        push_kid(target, pages_id, new_id)?;
        Ok(new_id)
    }

    pub(crate) fn source(&self) -> &'a Document {
        self.source
    }

    /// Make references to `source_id` resolve to `target_id` without copying
    /// the source object.
    pub(crate) fn alias(&mut self, source_id: ObjectId, target_id: ObjectId) {
        self.copied.insert(source_id, target_id);
    }

    /// Look `key` up along the /Parent chain of `page_id`.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut node = self.source.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
            let parent = self.source.get_dictionary(parent_id).ok()?;
            if let Ok(value) = parent.get(key) {
                return Some(value.clone());
            }
            node = parent;
        }
        None
    }

    fn copy_object(
        &mut self,
        target: &mut Document,
        object: &Object,
    ) -> Result<Object, HeftwerkError> {
        match object {
            Object::Reference(id) => Ok(Object::Reference(self.copy_reference(target, *id)?)),
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.copy_dictionary(target, dict)?)),
            Object::Array(items) => {
                let mut copied = Vec::with_capacity(items.len());
                for item in items {
                    copied.push(self.copy_object(target, item)?);
                }
                Ok(Object::Array(copied))
            }
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(target, &stream.dict)?;
                Ok(Object::Stream(Stream::new(dict, stream.content.clone())))
            }
            // Boolean, Integer, Real, String, Name, Null.
            other => Ok(other.clone()),
        }
    }

    /// Copy a dictionary. Page-tree nodes lose /Parent, which would drag the
    /// whole source tree along; the caller re-parents pages. Other /Parent
    /// links (popups, form fields, outline items) are kept.
    fn copy_dictionary(
        &mut self,
        target: &mut Document,
        dict: &Dictionary,
    ) -> Result<Dictionary, HeftwerkError> {
        let tree_node = dict
            .get(b"Type")
            .and_then(|kind| kind.as_name())
            .is_ok_and(|kind| kind == b"Page" || kind == b"Pages");

        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            if tree_node && key == b"Parent" {
                continue;
            }
            copied.set(key.clone(), self.copy_object(target, value)?);
        }
        Ok(copied)
    }

    /// Copy the object behind `id` (once) and return its id in `target`.
    pub(crate) fn copy_reference(
        &mut self,
        target: &mut Document,
        id: ObjectId,
    ) -> Result<ObjectId, HeftwerkError> {
        if let Some(&mapped) = self.copied.get(&id) {
            return Ok(mapped);
        }

        // Reserve the id before descending so cycles resolve to it.
        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);

        let source = self.source;
        let copied = match source.get_object(id) {
            Ok(object) => self.copy_object(target, object)?,
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                Object::Null
            }
        };
        target.objects.insert(new_id, copied);
        Ok(new_id)
    }
}

/// Append `page_id` to the /Kids of `pages_id` and bump /Count.
fn push_kid(
    target: &mut Document,
    pages_id: ObjectId,
    page_id: ObjectId,
) -> Result<(), HeftwerkError> {
    let pages = target
        .get_object_mut(pages_id)
        .and_then(|object| object.as_dict_mut())
        .map_err(|err| HeftwerkError::PdfError(format!("no /Pages node: {}", err)))?;

    match pages.get_mut(b"Kids") {
        Ok(Object::Array(kids)) => kids.push(Object::Reference(page_id)),
        _ => {
            return Err(HeftwerkError::PdfError(
                "/Pages node has no /Kids array".to_string(),
            ));
        }
    }

    let count = pages
        .get(b"Count")
        .and_then(|count| count.as_i64())
        .unwrap_or(0);
    pages.set("Count", count + 1);
    Ok(())
}

/// Numeric value of an Integer or Real object.
pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}
