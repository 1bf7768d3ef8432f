//! Human-readable renderings of a `PdfReport`

use super::{ContentsInfo, PageReport, PdfReport, ResourceInfo};
use crate::constants::{STREAM_CONTENT_THRESHOLD, SUMMARY_CONTENT_THRESHOLD};
use crate::page::ContentsKind;
use std::fmt;

/// Version, size, and one line per page
pub struct SummaryView<'a>(pub &'a PdfReport);

/// Summary plus content and resource details per page
pub struct DetailedView<'a>(pub &'a PdfReport);

/// Page sizes with paper classification
pub struct SizesView<'a>(pub &'a PdfReport);

/// Per-stream lengths and filters
pub struct ContentStreamsView<'a>(pub &'a PdfReport);

/// Raw structure of every page's Contents and Resources
pub struct DeepView<'a>(pub &'a PdfReport);

fn header(f: &mut fmt::Formatter<'_>, report: &PdfReport) -> fmt::Result {
    writeln!(f, "File: {}", report.source)?;
    writeln!(f, "PDF version: {}", report.version)?;
    writeln!(f, "File size: {} bytes", report.file_size)?;
    if let Some(creator) = &report.creator {
        writeln!(f, "Creator: {}", creator)?;
    }
    if let Some(producer) = &report.producer {
        writeln!(f, "Producer: {}", producer)?;
    }
    writeln!(f, "Pages: {}", report.pages.len())
}

fn size_line(f: &mut fmt::Formatter<'_>, page: &PageReport) -> fmt::Result {
    writeln!(
        f,
        "  Page {}: {:.2} x {:.2} pt ({})",
        page.number, page.width, page.height, page.paper
    )
}

fn kind_label(kind: &ContentsKind) -> String {
    match kind {
        ContentsKind::Missing => "missing".to_string(),
        ContentsKind::Dangling => "dangling reference".to_string(),
        ContentsKind::Stream((num, generation)) => format!("stream {} {} R", num, generation),
        ContentsKind::Array(ids) => format!("array of {} streams", ids.len()),
        ContentsKind::Inline => "inline stream".to_string(),
    }
}

fn resources_lines(f: &mut fmt::Formatter<'_>, resources: &Option<ResourceInfo>) -> fmt::Result {
    let Some(resources) = resources else {
        return writeln!(f, "    Resources: none");
    };
    if resources.xobjects.is_empty() {
        writeln!(f, "    XObjects: none")?;
    } else {
        for (name, subtype) in &resources.xobjects {
            writeln!(f, "    XObject /{}: {}", name, subtype)?;
        }
    }
    writeln!(f, "    Fonts: {}", join_or_none(&resources.fonts))?;
    writeln!(f, "    ExtGState: {}", join_or_none(&resources.ext_gstates))
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names
            .iter()
            .map(|n| format!("/{}", n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn content_verdict(contents: &ContentsInfo, threshold: usize) -> &'static str {
    if contents.decoded_len > threshold {
        "has content"
    } else {
        "empty or near-empty"
    }
}

impl fmt::Display for SummaryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        header(f, report)?;
        for page in &report.pages {
            writeln!(
                f,
                "  Page {}: {:.2} x {:.2} pt ({}), {} ({} bytes)",
                page.number,
                page.width,
                page.height,
                page.paper,
                content_verdict(&page.contents, SUMMARY_CONTENT_THRESHOLD),
                page.contents.decoded_len
            )?;
        }
        writeln!(
            f,
            "Pages with content: {}/{}",
            report.pages_with_content(SUMMARY_CONTENT_THRESHOLD),
            report.pages.len()
        )
    }
}

impl fmt::Display for DetailedView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        header(f, report)?;
        for page in &report.pages {
            size_line(f, page)?;
            let contents = &page.contents;
            writeln!(f, "    Contents: {}", kind_label(&contents.kind))?;
            writeln!(
                f,
                "    Length: {} encoded, {} decoded",
                contents.raw_len, contents.decoded_len
            )?;
            writeln!(f, "    Drawing operators: {}", yes_no(contents.has_draw_operators))?;
            resources_lines(f, &page.resources)?;
            if !contents.preview.is_empty() {
                writeln!(f, "    Preview: {}", contents.preview)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for SizesView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.0.source)?;
        for page in &self.0.pages {
            size_line(f, page)?;
        }
        Ok(())
    }
}

impl fmt::Display for ContentStreamsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "{}", report.source)?;
        for page in &report.pages {
            let contents = &page.contents;
            writeln!(
                f,
                "  Page {}: {}, {}",
                page.number,
                kind_label(&contents.kind),
                content_verdict(contents, STREAM_CONTENT_THRESHOLD)
            )?;
            for stream in &contents.streams {
                let id = match stream.id {
                    Some((num, generation)) => format!("{} {} R", num, generation),
                    None => "inline".to_string(),
                };
                writeln!(
                    f,
                    "    {}: {} bytes encoded, {} decoded, filter {}",
                    id,
                    stream.raw_len,
                    stream.decoded_len,
                    stream.filter.as_deref().unwrap_or("none")
                )?;
            }
        }
        writeln!(
            f,
            "Pages with content: {}/{}",
            report.pages_with_content(STREAM_CONTENT_THRESHOLD),
            report.pages.len()
        )
    }
}

impl fmt::Display for DeepView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        header(f, report)?;
        for page in &report.pages {
            let (num, generation) = page.object_id;
            writeln!(f, "Page {} (object {} {} R)", page.number, num, generation)?;
            writeln!(f, "    Size: {:.2} x {:.2} pt ({})", page.width, page.height, page.paper)?;

            let contents = &page.contents;
            writeln!(
                f,
                "    Contents entry: {}",
                contents.entry_type.unwrap_or("absent")
            )?;
            if let Some(resolved) = contents.resolved_type {
                writeln!(f, "    Resolves to: {}", resolved)?;
            }
            writeln!(f, "    Classified as: {}", kind_label(&contents.kind))?;
            writeln!(
                f,
                "    Streams: {}, {} bytes decoded",
                contents.streams.len(),
                contents.decoded_len
            )?;
            writeln!(f, "    Drawing operators: {}", yes_no(contents.has_draw_operators))?;
            resources_lines(f, &page.resources)?;
        }
        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
