//! Copying pages between documents
//!
//! Pages are deep-copied object by object into the output document. A page
//! can also be wrapped as a Form XObject, which the repair experiments use
//! to redraw a page onto a fresh one.

use crate::page::{
    ContentsKind, INHERITABLE_KEYS, contents_kind, inherited_attribute, media_box, page_content,
};
use crate::types::{MergeError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Maps source object ids to their copies in the output document
pub type CopyCache = HashMap<ObjectId, ObjectId>;

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// Uses a cache to avoid copying the same object multiple times. Dangling
/// references become `null`, as PDF readers treat them. `Parent` and `P`
/// back-references are not followed; the merge rebuilds the page tree.
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut CopyCache,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let referenced = match source.get_object(*id) {
                Ok(referenced) => referenced,
                Err(_) => {
                    log::debug!("dangling reference {} {} R replaced with null", id.0, id.1);
                    return Ok(Object::Null);
                }
            };

            // Reserve the id before recursing so reference cycles terminate
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(
            output, source, dict, cache,
        )?)),
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => Ok(Object::Stream(Stream {
            dict: copy_dictionary(output, source, &stream.dict, cache)?,
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: None,
        })),
        _ => Ok(obj.clone()),
    }
}

fn copy_dictionary(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    cache: &mut CopyCache,
) -> Result<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        if key.as_slice() == b"Parent" || key.as_slice() == b"P" {
            continue;
        }
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    Ok(new_dict)
}

/// Copy a page dictionary with its inherited attributes made explicit.
///
/// The returned dictionary has no `Parent`; the caller attaches it to the
/// output page tree.
pub fn copy_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut CopyCache,
) -> Result<Dictionary> {
    let mut page = copy_dictionary(output, source, source.get_dictionary(page_id)?, cache)?;

    for key in INHERITABLE_KEYS {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page_id, key) {
            page.set(key.to_vec(), copy_object_deep(output, source, &value, cache)?);
        }
    }

    if !page.has(b"Resources") {
        page.set("Resources", Object::Dictionary(Dictionary::new()));
    }

    Ok(page)
}

// =============================================================================
// XObject Creation
// =============================================================================

/// Stream entries that describe how the content bytes are encoded
const ENCODING_KEYS: [&[u8]; 2] = [b"Filter", b"DecodeParms"];

/// Create a Form XObject from a source page.
///
/// The XObject's bounding box is the page MediaBox, so drawing it with an
/// identity matrix on a page of the same box reproduces the original page.
///
/// Content is stored decoded. A lone content stream whose filter lopdf
/// cannot decode keeps its encoded bytes and its `Filter`/`DecodeParms`.
/// Several streams where one is undecodable cannot be joined into a single
/// stream, so that page fails with `MergeError::UndecodableContent`.
pub fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut CopyCache,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;
    let [x0, y0, x1, y1] = media_box(source, page_id);

    let streams = content_streams(source, page_dict);
    let encoded = match streams.as_slice() {
        [stream] if is_undecodable(stream) => Some(*stream),
        _ => {
            if let Some(stream) = streams.iter().find(|s| is_undecodable(s)) {
                return Err(MergeError::UndecodableContent {
                    filter: filter_names(stream),
                });
            }
            None
        }
    };

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(x0),
            Object::Real(y0),
            Object::Real(x1),
            Object::Real(y1),
        ]),
    );
    xobject_dict.set("FormType", Object::Integer(1));

    if let Some(resources) = inherited_attribute(source, page_id, b"Resources") {
        xobject_dict.set(
            "Resources",
            copy_object_deep(output, source, &resources, cache)?,
        );
    }

    let content_data = match encoded {
        Some(stream) => {
            log::warn!(
                "Content filter {} cannot be decoded; keeping the stream encoded",
                filter_names(stream)
            );
            for key in ENCODING_KEYS {
                if let Ok(value) = stream.dict.get(key) {
                    xobject_dict.set(key.to_vec(), copy_object_deep(output, source, value, cache)?);
                }
            }
            stream.content.clone()
        }
        None => page_content(source, page_dict)?,
    };

    Ok(output.add_object(Stream::new(xobject_dict, content_data)))
}

fn content_streams<'a>(source: &'a Document, page_dict: &'a Dictionary) -> Vec<&'a Stream> {
    match contents_kind(source, page_dict) {
        ContentsKind::Stream(id) => source
            .get_object(id)
            .and_then(Object::as_stream)
            .into_iter()
            .collect(),
        ContentsKind::Array(ids) => ids
            .into_iter()
            .filter_map(|id| source.get_object(id).and_then(Object::as_stream).ok())
            .collect(),
        ContentsKind::Inline => page_dict
            .get(b"Contents")
            .and_then(Object::as_stream)
            .into_iter()
            .collect(),
        ContentsKind::Missing | ContentsKind::Dangling => Vec::new(),
    }
}

/// Filtered, but not with a filter lopdf can decode
fn is_undecodable(stream: &Stream) -> bool {
    stream.dict.has(b"Filter") && stream.decompressed_content().is_err()
}

fn filter_names(stream: &Stream) -> String {
    stream
        .filters()
        .map(|names| {
            names
                .iter()
                .map(|name| String::from_utf8_lossy(name).into_owned())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|_| "(malformed)".to_string())
}
