//! Concatenating PDFs
//!
//! Pages are copied in input order into a fresh document. When a target
//! size is configured every page is rescaled onto it; pages without a usable
//! content stream are handled according to the configured repair policy.

use crate::copy::{CopyCache, copy_object_deep, copy_page};
use crate::io::{file_exists, load_pdf, save_pdf};
use crate::normalize::{apply_placement, compute_placement};
use crate::options::MergeOptions;
use crate::page::{ContentsKind, contents_kind, media_box};
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::{Path, PathBuf};

/// Merge PDF files into `output`.
///
/// Missing input files are logged and skipped. Any failure to load, copy or
/// save aborts the whole operation; the output is only written at the end.
pub async fn merge_pdfs(
    inputs: &[impl AsRef<Path>],
    output: impl AsRef<Path>,
    options: &MergeOptions,
) -> Result<MergeReport> {
    let output = output.as_ref().to_owned();

    let mut documents = Vec::new();
    let mut loaded_paths: Vec<PathBuf> = Vec::new();
    let mut skipped = Vec::new();

    for input in inputs {
        let path = input.as_ref();
        if !file_exists(path).await {
            log::error!("File does not exist, skipping: {}", path.display());
            skipped.push(path.to_owned());
            continue;
        }

        let doc = load_pdf(path).await?;
        log::info!("Added {} ({} pages)", path.display(), doc.get_pages().len());
        documents.push(doc);
        loaded_paths.push(path.to_owned());
    }

    if documents.is_empty() {
        return Err(MergeError::NoInputs);
    }

    let merge_options = options.clone();
    let (merged, stats) =
        tokio::task::spawn_blocking(move || merge_documents(&documents, &merge_options)).await??;

    save_pdf(merged, &output).await?;
    log::info!(
        "Merged {} pages into {}",
        stats.total_pages(),
        output.display()
    );

    Ok(MergeReport {
        output,
        merged: loaded_paths
            .into_iter()
            .zip(stats.pages_per_document.iter().copied())
            .collect(),
        skipped,
        repaired_pages: stats.repaired_pages,
        total_pages: stats.total_pages(),
    })
}

/// Merge in-memory documents into a new document
pub fn merge_documents(
    documents: &[Document],
    options: &MergeOptions,
) -> Result<(Document, MergeStats)> {
    let mut output = Document::with_version("1.7");
    let pages_tree_id = output.new_object_id();
    let mut page_refs = Vec::new();
    let mut stats = MergeStats::default();
    let target = options.target_size.dimensions_pt();

    for source in documents {
        // Object ids are per-document, so each source gets its own cache
        let mut cache = CopyCache::new();
        let page_ids: Vec<ObjectId> = source.get_pages().values().copied().collect();

        for &page_id in &page_ids {
            let page_number = page_refs.len() + 1;
            let page_id = copy_single_page(
                &mut output,
                source,
                page_id,
                page_number,
                pages_tree_id,
                target,
                options,
                &mut cache,
                &mut stats,
            )?;
            page_refs.push(Object::Reference(page_id));
        }

        stats.pages_per_document.push(page_ids.len());
    }

    finish_page_tree(&mut output, pages_tree_id, page_refs);

    Ok((output, stats))
}

#[allow(clippy::too_many_arguments)]
fn copy_single_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    page_number: usize,
    parent_id: ObjectId,
    target: Option<(f32, f32)>,
    options: &MergeOptions,
    cache: &mut CopyCache,
    stats: &mut MergeStats,
) -> Result<ObjectId> {
    let mut page = copy_page(output, source, page_id, cache)?;

    match contents_kind(source, source.get_dictionary(page_id)?) {
        kind @ (ContentsKind::Missing | ContentsKind::Dangling) => match options.repair {
            RepairPolicy::Strict => {
                return Err(MergeError::MissingContent { page: page_number });
            }
            RepairPolicy::SubstituteEmptyContent => {
                log::warn!(
                    "Page {} content stream is {:?}; substituting an empty stream",
                    page_number,
                    kind
                );
                let empty_id = output.add_object(Stream::new(Dictionary::new(), Vec::new()));
                page.set("Contents", Object::Reference(empty_id));
                stats.repaired_pages += 1;
            }
        },
        ContentsKind::Array(ids) => {
            // Rebuild from the streams that exist so no null entries remain
            let mut refs = Vec::with_capacity(ids.len());
            for id in ids {
                refs.push(copy_object_deep(output, source, &Object::Reference(id), cache)?);
            }
            page.set("Contents", Object::Array(refs));
        }
        ContentsKind::Stream(_) | ContentsKind::Inline => {}
    }

    if let Some(target) = target {
        let original_box = media_box(source, page_id);
        let original = (
            (original_box[2] - original_box[0]).abs(),
            (original_box[3] - original_box[1]).abs(),
        );
        let placement = compute_placement(original, target, options.center);
        log::debug!(
            "Page {}: {:.2}x{:.2} -> {:.2}x{:.2}, scale {:.4}, offset ({:.2}, {:.2})",
            page_number,
            original.0,
            original.1,
            target.0,
            target.1,
            placement.scale,
            placement.offset_x,
            placement.offset_y
        );
        apply_placement(output, &mut page, original_box, &placement)?;
        stats.normalized_pages += 1;
    }

    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(parent_id));

    Ok(output.add_object(page))
}

/// Write the Pages node and Catalog for a list of page references
pub(crate) fn finish_page_tree(output: &mut Document, pages_tree_id: ObjectId, page_refs: Vec<Object>) {
    let count = page_refs.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(page_refs)),
        ("Count", Object::Integer(count)),
    ]);
    output
        .objects
        .insert(pages_tree_id, Object::Dictionary(pages_dict));

    let catalog_id = output.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_tree_id)),
    ]));
    output.trailer.set("Root", catalog_id);
}
