//! Page-level helpers over the lopdf object model
//!
//! Page attributes such as MediaBox and Resources may be inherited from
//! ancestors in the page tree, so every lookup here walks the Parent chain.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::types::Result;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Attributes a page may inherit from the page tree
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against malformed page trees with Parent cycles
const MAX_TREE_DEPTH: usize = 64;

/// State of a page's `Contents` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentsKind {
    /// No `Contents` key at all
    Missing,
    /// `Contents` refers to an object that does not exist or is not a stream
    Dangling,
    /// A single content stream
    Stream(ObjectId),
    /// An array of content streams (dangling entries are dropped)
    Array(Vec<ObjectId>),
    /// A direct stream object embedded in the page dictionary
    Inline,
}

impl ContentsKind {
    /// True when the page has nothing to draw from
    pub fn is_unusable(&self) -> bool {
        matches!(self, ContentsKind::Missing | ContentsKind::Dangling)
    }
}

/// Look up a page attribute, following the Parent chain when absent
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent_id = match current.get(b"Parent") {
            Ok(Object::Reference(id)) => *id,
            _ => return None,
        };
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Page MediaBox as `[x0, y0, x1, y1]`, falling back to US Letter
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, &obj).and_then(|o| rect_from_object(&o)))
        .unwrap_or([0.0, 0.0, DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1])
}

/// Get page dimensions (width, height) in points
pub fn get_page_dimensions(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let [x0, y0, x1, y1] = media_box(doc, page_id);
    ((x1 - x0).abs(), (y1 - y0).abs())
}

/// Classify the `Contents` entry of a page dictionary
pub fn contents_kind(doc: &Document, page_dict: &Dictionary) -> ContentsKind {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return ContentsKind::Missing,
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Stream(_)) => ContentsKind::Stream(*id),
            Ok(Object::Array(items)) => streams_in_array(doc, items),
            _ => ContentsKind::Dangling,
        },
        Object::Array(items) => streams_in_array(doc, items),
        Object::Stream(_) => ContentsKind::Inline,
        _ => ContentsKind::Dangling,
    }
}

fn streams_in_array(doc: &Document, items: &[Object]) -> ContentsKind {
    let ids: Vec<ObjectId> = items
        .iter()
        .filter_map(|item| match item {
            Object::Reference(id) => Some(*id),
            _ => None,
        })
        .filter(|id| matches!(doc.get_object(*id), Ok(Object::Stream(_))))
        .collect();

    if ids.is_empty() {
        ContentsKind::Dangling
    } else {
        ContentsKind::Array(ids)
    }
}

/// Decoded content of every stream making up a page, concatenated
pub fn page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    match contents_kind(doc, page_dict) {
        ContentsKind::Stream(id) => Ok(stream_bytes(doc, id)),
        ContentsKind::Array(ids) => {
            let mut result = Vec::new();
            for id in ids {
                result.extend_from_slice(&stream_bytes(doc, id));
                result.push(b'\n');
            }
            Ok(result)
        }
        ContentsKind::Inline => match page_dict.get(b"Contents")? {
            Object::Stream(stream) => Ok(stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone())),
            _ => Ok(Vec::new()),
        },
        ContentsKind::Missing | ContentsKind::Dangling => Ok(Vec::new()),
    }
}

/// Decompressed bytes of one stream, raw bytes when the filter is unsupported
pub(crate) fn stream_bytes(doc: &Document, id: ObjectId) -> Vec<u8> {
    match doc.get_object(id) {
        Ok(Object::Stream(stream)) => stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()),
        _ => Vec::new(),
    }
}

/// Follow a reference one level, returning owned data
pub(crate) fn resolve(doc: &Document, obj: &Object) -> Option<Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok().cloned(),
        other => Some(other.clone()),
    }
}

/// Extract numeric value from a PDF object
pub(crate) fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn rect_from_object(obj: &Object) -> Option<[f32; 4]> {
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, item) in rect.iter_mut().zip(arr) {
        *slot = extract_number(item)?;
    }
    Some(rect)
}

/// Build a `[0 0 w h]` rectangle object
pub(crate) fn rect_object(width: f32, height: f32) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(width),
        Object::Real(height),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_parses_mixed_numbers() {
        let obj = Object::Array(vec![
            Object::Integer(0),
            Object::Real(10.5),
            Object::Integer(612),
            Object::Real(792.0),
        ]);
        assert_eq!(rect_from_object(&obj), Some([0.0, 10.5, 612.0, 792.0]));
    }

    #[test]
    fn rect_rejects_short_arrays() {
        let obj = Object::Array(vec![Object::Integer(0), Object::Integer(0)]);
        assert_eq!(rect_from_object(&obj), None);
    }
}
