//! Repair experiments for malformed PDFs
//!
//! These strategies were found to help with individual broken files; none of
//! them is known to fix every input. `repair_document` tries them in a fixed
//! order and records every attempt so callers can see what happened.

use crate::copy::{CopyCache, create_page_xobject};
use crate::io::document_to_bytes;
use crate::merge::finish_page_tree;
use crate::page::{contents_kind, media_box};
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// A single repair strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStrategy {
    /// Wrap every page as a Form XObject and draw it onto a fresh page
    Reembed,
    /// Load and save the document unchanged
    Resave,
}

impl RepairStrategy {
    /// Fallback order used when the caller has no preference
    pub const DEFAULT_ORDER: [RepairStrategy; 2] = [RepairStrategy::Reembed, RepairStrategy::Resave];

    pub fn name(self) -> &'static str {
        match self {
            RepairStrategy::Reembed => "re-embed",
            RepairStrategy::Resave => "re-save",
        }
    }
}

/// Result of one repair attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RepairAttempt {
    pub strategy: RepairStrategy,
    /// `Err` holds the failure message
    pub outcome: std::result::Result<(), String>,
}

/// Outcome of `repair_document`
#[derive(Debug, Clone)]
pub struct RepairReport {
    pub attempts: Vec<RepairAttempt>,
    /// Strategy whose output is in `bytes`
    pub strategy: RepairStrategy,
    pub bytes: Vec<u8>,
    /// Whether every page of the repaired document has a content stream
    pub all_pages_have_content: bool,
}

/// Try each strategy in order until one produces a loadable document
pub fn repair_document(bytes: &[u8], strategies: &[RepairStrategy]) -> Result<RepairReport> {
    let mut attempts = Vec::new();

    for &strategy in strategies {
        log::info!("Trying repair strategy: {}", strategy.name());
        let result = match strategy {
            RepairStrategy::Reembed => reembed_pages(bytes),
            RepairStrategy::Resave => resave(bytes),
        };

        match result.and_then(|repaired| verify(&repaired).map(|ok| (repaired, ok))) {
            Ok((repaired, all_pages_have_content)) => {
                attempts.push(RepairAttempt {
                    strategy,
                    outcome: Ok(()),
                });
                return Ok(RepairReport {
                    attempts,
                    strategy,
                    bytes: repaired,
                    all_pages_have_content,
                });
            }
            Err(e) => {
                log::warn!("Repair strategy {} failed: {}", strategy.name(), e);
                attempts.push(RepairAttempt {
                    strategy,
                    outcome: Err(e.to_string()),
                });
            }
        }
    }

    Err(MergeError::RepairFailed)
}

/// Redraw every page through a Form XObject on a page of the same size.
///
/// Pages that cannot be rebuilt are logged and left out. Fails only when
/// the document has pages and none of them could be rebuilt.
pub fn reembed_pages(bytes: &[u8]) -> Result<Vec<u8>> {
    let source = Document::load_mem(bytes)?;
    let mut output = Document::with_version("1.7");
    let pages_tree_id = output.new_object_id();
    let mut page_refs = Vec::new();
    let mut cache = CopyCache::new();
    let mut last_error = None;

    for (number, page_id) in source.get_pages() {
        match reembed_page(&mut output, &source, page_id, pages_tree_id, &mut cache) {
            Ok(page_id) => {
                log::debug!("Re-embedded page {}", number);
                page_refs.push(Object::Reference(page_id));
            }
            Err(e) => {
                log::warn!("Page {} could not be re-embedded, leaving it out: {}", number, e);
                last_error = Some(e);
            }
        }
    }

    if let Some(e) = last_error.filter(|_| page_refs.is_empty()) {
        return Err(e);
    }

    finish_page_tree(&mut output, pages_tree_id, page_refs);
    document_to_bytes(output)
}

fn reembed_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    parent_id: ObjectId,
    cache: &mut CopyCache,
) -> Result<ObjectId> {
    let [x0, y0, x1, y1] = media_box(source, page_id);
    let xobject_id = create_page_xobject(output, source, page_id, cache)?;

    let mut xobjects = Dictionary::new();
    xobjects.set("P0", Object::Reference(xobject_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let content_id = output.add_object(Stream::new(Dictionary::new(), b"q /P0 Do Q\n".to_vec()));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(parent_id));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Real(x0),
            Object::Real(y0),
            Object::Real(x1),
            Object::Real(y1),
        ]),
    );
    page_dict.set("Resources", Object::Dictionary(resources));
    page_dict.set("Contents", Object::Reference(content_id));

    Ok(output.add_object(page_dict))
}

/// Load and save without changes, then make sure the result loads again
pub fn resave(bytes: &[u8]) -> Result<Vec<u8>> {
    let doc = Document::load_mem(bytes)?;
    let saved = document_to_bytes(doc)?;
    Document::load_mem(&saved)?;
    Ok(saved)
}

/// Whether every page of a serialized document has a content stream
fn verify(bytes: &[u8]) -> Result<bool> {
    let doc = Document::load_mem(bytes)?;
    Ok(pages_with_content(&doc) == doc.get_pages().len())
}

fn pages_with_content(doc: &Document) -> usize {
    doc.get_pages()
        .values()
        .filter_map(|&id| doc.get_dictionary(id).ok())
        .filter(|dict| !contents_kind(doc, dict).is_unusable())
        .count()
}

/// Contents presence observed at each step of the save/reload experiment
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadProbe {
    pub pages: usize,
    /// Pages with usable content in the original document
    pub original_with_content: usize,
    /// Pages with usable content after save and reload
    pub reloaded_with_content: usize,
    /// Pages with usable content after copying the reloaded document
    pub merged_with_content: usize,
    /// Serialized copy of the reloaded document
    pub merged_bytes: Vec<u8>,
}

/// Save and reload a document, then copy it into a fresh one, reporting
/// content presence at every step.
pub fn reload_probe(bytes: &[u8]) -> Result<ReloadProbe> {
    let original = Document::load_mem(bytes)?;
    let original_with_content = pages_with_content(&original);
    let pages = original.get_pages().len();

    let saved = document_to_bytes(original)?;
    let reloaded = Document::load_mem(&saved)?;
    let reloaded_with_content = pages_with_content(&reloaded);

    let options = crate::MergeOptions {
        repair: RepairPolicy::Strict,
        ..Default::default()
    };
    let (merged, _) = crate::merge::merge_documents(std::slice::from_ref(&reloaded), &options)
        .or_else(|e| {
            log::warn!("Strict copy failed ({}), retrying with empty-content substitution", e);
            crate::merge::merge_documents(
                std::slice::from_ref(&reloaded),
                &crate::MergeOptions::default(),
            )
        })?;
    let merged_bytes = document_to_bytes(merged)?;
    let merged_with_content = pages_with_content(&Document::load_mem(&merged_bytes)?);

    Ok(ReloadProbe {
        pages,
        original_with_content,
        reloaded_with_content,
        merged_with_content,
        merged_bytes,
    })
}
