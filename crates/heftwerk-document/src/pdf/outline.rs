// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outline (bookmark) carry-over for merged documents.
//
// Each input's top-level outline items are copied with the same copier that
// copied its pages, so destinations land on the merged pages. The copied
// chains are then linked end to end under one /Outlines root.

use heftwerk_core::error::HeftwerkError;
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::debug;

use super::pages::PageCopier;

/// Guard against /Next chains that loop.
const MAX_TOP_LEVEL_ITEMS: usize = 10_000;

/// Top-level items of one input, already copied into the target.
struct Segment {
    first: ObjectId,
    last: ObjectId,
    count: i64,
}

/// Builds the merged document's outline from the inputs' outlines.
pub(crate) struct OutlineBuilder {
    root: Option<ObjectId>,
    segments: Vec<Segment>,
}

impl OutlineBuilder {
    pub(crate) fn new() -> Self {
        Self {
            root: None,
            segments: Vec::new(),
        }
    }

    /// Copy the outline of the copier's source into `target`.
    ///
    /// Call after all of that source's pages have been appended. Inputs
    /// without an outline are skipped.
    pub(crate) fn absorb(
        &mut self,
        copier: &mut PageCopier<'_>,
        target: &mut Document,
    ) -> Result<(), HeftwerkError> {
        let source = copier.source();
        let Some(source_root) = outline_root(source) else {
            return Ok(());
        };
        let Ok(root) = source.get_dictionary(source_root) else {
            return Ok(());
        };
        let (Some(first), Some(last)) = (reference(root, b"First"), reference(root, b"Last"))
        else {
            return Ok(());
        };
        let count = root
            .get(b"Count")
            .and_then(|count| count.as_i64())
            .map(i64::abs)
            .unwrap_or_else(|_| top_level_len(source, first));

        // Top-level items point back at the source root; send them to ours.
        let merged_root = *self.root.get_or_insert_with(|| target.new_object_id());
        copier.alias(source_root, merged_root);

        let first = copier.copy_reference(target, first)?;
        let last = copier.copy_reference(target, last)?;
        debug!(count, "Outline copied");
        self.segments.push(Segment { first, last, count });
        Ok(())
    }

    /// Chain the copied segments and hang them off the target's catalog.
    pub(crate) fn finish(self, target: &mut Document) -> Result<(), HeftwerkError> {
        let (Some(root), Some(head), Some(tail)) =
            (self.root, self.segments.first(), self.segments.last())
        else {
            return Ok(());
        };

        for pair in self.segments.windows(2) {
            link(target, pair[0].last, "Next", pair[1].first);
            link(target, pair[1].first, "Prev", pair[0].last);
        }

        let count: i64 = self.segments.iter().map(|segment| segment.count).sum();
        target.objects.insert(
            root,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => head.first,
                "Last" => tail.last,
                "Count" => count,
            }),
        );
        target
            .catalog_mut()
            .map_err(|err| HeftwerkError::PdfError(format!("no catalog for outline: {}", err)))?
            .set("Outlines", root);
        Ok(())
    }
}

fn outline_root(doc: &Document) -> Option<ObjectId> {
    doc.catalog().ok()?.get(b"Outlines").ok()?.as_reference().ok()
}

fn reference(dict: &Dictionary, key: &[u8]) -> Option<ObjectId> {
    dict.get(key).ok()?.as_reference().ok()
}

/// Number of items on the /Next chain starting at `first`.
fn top_level_len(doc: &Document, first: ObjectId) -> i64 {
    let mut len = 0;
    let mut next = Some(first);
    while let Some(id) = next
        && len < MAX_TOP_LEVEL_ITEMS
    {
        len += 1;
        next = doc
            .get_dictionary(id)
            .ok()
            .and_then(|item| reference(item, b"Next"));
    }
    len as i64
}

fn link(target: &mut Document, from: ObjectId, key: &str, to: ObjectId) {
    if let Ok(Object::Dictionary(item)) = target.get_object_mut(from) {
        item.set(key, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::pdf::pages::{blank_document, ordered_page_ids};

    #[test]
    fn input_without_outline_leaves_catalog_alone() {
        let source = Document::load_mem(&fixtures::pdf_with_widths(&[100])).unwrap();
        let (mut target, pages_id) = blank_document();
        let mut copier = PageCopier::new(&source);
        for page_id in ordered_page_ids(&source) {
            copier.append_page(&mut target, pages_id, page_id).unwrap();
        }

        let mut outline = OutlineBuilder::new();
        outline.absorb(&mut copier, &mut target).unwrap();
        outline.finish(&mut target).unwrap();
        assert!(!target.catalog().unwrap().has(b"Outlines"));
    }

    #[test]
    fn missing_count_is_derived_from_the_chain() {
        let mut source =
            Document::load_mem(&fixtures::pdf_with_outline(&[100, 200], &["a", "b"])).unwrap();
        let root_id = outline_root(&source).unwrap();
        if let Ok(Object::Dictionary(root)) = source.get_object_mut(root_id) {
            root.remove(b"Count");
        }

        let (mut target, pages_id) = blank_document();
        let mut copier = PageCopier::new(&source);
        for page_id in ordered_page_ids(&source) {
            copier.append_page(&mut target, pages_id, page_id).unwrap();
        }
        let mut outline = OutlineBuilder::new();
        outline.absorb(&mut copier, &mut target).unwrap();
        outline.finish(&mut target).unwrap();

        let merged_root = outline_root(&target).unwrap();
        let root = target.get_dictionary(merged_root).unwrap();
        assert_eq!(root.get(b"Count").unwrap().as_i64().unwrap(), 2);
    }
}
