//! Read-only diagnostics over PDF files
//!
//! `inspect_document` gathers everything the diagnostic commands print into a
//! `PdfReport`; the renderers in `report` format it for humans.

mod compare;
mod content;
mod paper;
mod report;

pub use compare::{ComparisonView, Difference, PdfComparison, compare_reports};
pub use content::{has_draw_operators, preview};
pub use paper::{PaperClass, classify_page};
pub use report::{ContentStreamsView, DeepView, DetailedView, SizesView, SummaryView};

use crate::page::{ContentsKind, contents_kind, get_page_dimensions, inherited_attribute, resolve};
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;

/// Everything the diagnostic commands know about one file
#[derive(Debug, Clone)]
pub struct PdfReport {
    /// Label used in output, usually the file path
    pub source: String,
    pub version: String,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub file_size: usize,
    pub pages: Vec<PageReport>,
}

impl PdfReport {
    /// Pages whose decoded content exceeds `threshold` bytes
    pub fn pages_with_content(&self, threshold: usize) -> usize {
        self.pages
            .iter()
            .filter(|page| page.contents.decoded_len > threshold)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct PageReport {
    /// 1-based page number
    pub number: u32,
    pub object_id: ObjectId,
    pub width: f32,
    pub height: f32,
    pub paper: PaperClass,
    pub contents: ContentsInfo,
    pub resources: Option<ResourceInfo>,
}

/// Content stream facts for one page
#[derive(Debug, Clone)]
pub struct ContentsInfo {
    pub kind: ContentsKind,
    /// Type of the raw `Contents` entry, e.g. "Reference"
    pub entry_type: Option<&'static str>,
    /// Type of the object a referenced entry points at
    pub resolved_type: Option<&'static str>,
    pub streams: Vec<StreamInfo>,
    /// Encoded bytes across all streams
    pub raw_len: usize,
    /// Decoded bytes across all streams
    pub decoded_len: usize,
    pub has_draw_operators: bool,
    pub preview: String,
}

#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// `None` for a stream stored directly in the page dictionary
    pub id: Option<ObjectId>,
    pub filter: Option<String>,
    pub raw_len: usize,
    pub decoded_len: usize,
}

/// Resource dictionary summary
#[derive(Debug, Clone, Default)]
pub struct ResourceInfo {
    /// XObject names with their subtype
    pub xobjects: Vec<(String, String)>,
    pub fonts: Vec<String>,
    pub ext_gstates: Vec<String>,
}

/// Inspect a file on disk
pub async fn inspect_file(path: impl AsRef<Path>) -> Result<PdfReport> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let source = path.display().to_string();

    let report = tokio::task::spawn_blocking(move || -> Result<PdfReport> {
        let doc = Document::load_mem(&bytes)?;
        Ok(inspect_document(&doc, source, bytes.len()))
    })
    .await??;

    Ok(report)
}

/// Inspect two files and compare them structurally
pub async fn compare_files(
    left: impl AsRef<Path>,
    right: impl AsRef<Path>,
) -> Result<PdfComparison> {
    let left = inspect_file(left).await?;
    let right = inspect_file(right).await?;
    Ok(compare_reports(left, right))
}

/// Collect a report from a loaded document
pub fn inspect_document(doc: &Document, source: impl Into<String>, file_size: usize) -> PdfReport {
    let pages = doc
        .get_pages()
        .into_iter()
        .map(|(number, page_id)| inspect_page(doc, number, page_id))
        .collect();

    PdfReport {
        source: source.into(),
        version: doc.version.clone(),
        creator: info_string(doc, b"Creator"),
        producer: info_string(doc, b"Producer"),
        file_size,
        pages,
    }
}

fn inspect_page(doc: &Document, number: u32, page_id: ObjectId) -> PageReport {
    let (width, height) = get_page_dimensions(doc, page_id);
    let empty = Dictionary::new();
    let page_dict = doc.get_dictionary(page_id).unwrap_or(&empty);

    PageReport {
        number,
        object_id: page_id,
        width,
        height,
        paper: classify_page(width, height),
        contents: inspect_contents(doc, page_dict),
        resources: inspect_resources(doc, page_id),
    }
}

fn inspect_contents(doc: &Document, page_dict: &Dictionary) -> ContentsInfo {
    let kind = contents_kind(doc, page_dict);
    let entry = page_dict.get(b"Contents").ok();
    let entry_type = entry.map(object_type);
    let resolved_type = match entry {
        Some(Object::Reference(id)) => Some(doc.get_object(*id).map(object_type).unwrap_or("Missing")),
        _ => None,
    };

    let mut streams = Vec::new();
    let mut decoded = Vec::new();
    let mut push_stream = |id: Option<ObjectId>, stream: &lopdf::Stream| {
        let bytes = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        streams.push(StreamInfo {
            id,
            filter: stream
                .dict
                .get(b"Filter")
                .ok()
                .map(|f| name_or_type(f).to_string()),
            raw_len: stream.content.len(),
            decoded_len: bytes.len(),
        });
        decoded.extend_from_slice(&bytes);
    };

    match (&kind, entry) {
        (ContentsKind::Stream(id), _) => {
            if let Ok(Object::Stream(stream)) = doc.get_object(*id) {
                push_stream(Some(*id), stream);
            }
        }
        (ContentsKind::Array(ids), _) => {
            for id in ids {
                if let Ok(Object::Stream(stream)) = doc.get_object(*id) {
                    push_stream(Some(*id), stream);
                }
            }
        }
        (ContentsKind::Inline, Some(Object::Stream(stream))) => push_stream(None, stream),
        _ => {}
    }

    ContentsInfo {
        entry_type,
        resolved_type,
        raw_len: streams.iter().map(|s| s.raw_len).sum(),
        decoded_len: decoded.len(),
        has_draw_operators: has_draw_operators(&decoded),
        preview: preview(&decoded),
        streams,
        kind,
    }
}

fn inspect_resources(doc: &Document, page_id: ObjectId) -> Option<ResourceInfo> {
    let resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|obj| resolve(doc, &obj))
        .and_then(|obj| obj.as_dict().ok().cloned())?;

    let mut info = ResourceInfo::default();

    if let Some(xobjects) = sub_dictionary(doc, &resources, b"XObject") {
        for (name, value) in xobjects.iter() {
            let subtype = resolve(doc, value)
                .and_then(|obj| match obj {
                    Object::Stream(stream) => stream.dict.get(b"Subtype").ok().map(|s| name_or_type(s).to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| "?".to_string());
            info.xobjects.push((String::from_utf8_lossy(name).into_owned(), subtype));
        }
    }
    if let Some(fonts) = sub_dictionary(doc, &resources, b"Font") {
        info.fonts = fonts
            .iter()
            .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
            .collect();
    }
    if let Some(states) = sub_dictionary(doc, &resources, b"ExtGState") {
        info.ext_gstates = states
            .iter()
            .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
            .collect();
    }

    Some(info)
}

fn sub_dictionary(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Dictionary> {
    let value = dict.get(key).ok()?;
    resolve(doc, value).and_then(|obj| obj.as_dict().ok().cloned())
}

fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let info = resolve(doc, info)?;
    match info.as_dict().ok()?.get(key).ok()? {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn name_or_type(obj: &Object) -> &str {
    match obj {
        Object::Name(name) => std::str::from_utf8(name).unwrap_or("?"),
        other => object_type(other),
    }
}

fn object_type(obj: &Object) -> &'static str {
    match obj {
        Object::Null => "Null",
        Object::Boolean(_) => "Boolean",
        Object::Integer(_) => "Integer",
        Object::Real(_) => "Real",
        Object::Name(_) => "Name",
        Object::String(..) => "String",
        Object::Array(_) => "Array",
        Object::Dictionary(_) => "Dictionary",
        Object::Stream(_) => "Stream",
        Object::Reference(_) => "Reference",
    }
}
