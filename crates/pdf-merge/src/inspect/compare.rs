//! Side-by-side comparison of two inspected documents, e.g. a generated form
//! against the reference form it imitates

use super::{PageReport, PdfReport, ResourceInfo};
use std::fmt;

/// Page sizes closer than this are considered equal
const SIZE_TOLERANCE: f32 = 0.5;

/// One way two documents differ
#[derive(Debug, Clone, PartialEq)]
pub enum Difference {
    PageCount { left: usize, right: usize },
    PageSize {
        page: u32,
        left: (f32, f32),
        right: (f32, f32),
    },
    /// One side draws something on the page and the other does not
    Drawing { page: u32, left: bool, right: bool },
    Fonts { page: u32, left: usize, right: usize },
    XObjects { page: u32, left: usize, right: usize },
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::PageCount { left, right } => {
                write!(f, "page count: {} vs {}", left, right)
            }
            Difference::PageSize { page, left, right } => write!(
                f,
                "page {} size: {:.2} x {:.2} vs {:.2} x {:.2} pt",
                page, left.0, left.1, right.0, right.1
            ),
            Difference::Drawing { page, left, right } => write!(
                f,
                "page {} drawing operators: {} vs {}",
                page,
                yes_no(*left),
                yes_no(*right)
            ),
            Difference::Fonts { page, left, right } => {
                write!(f, "page {} fonts: {} vs {}", page, left, right)
            }
            Difference::XObjects { page, left, right } => {
                write!(f, "page {} XObjects: {} vs {}", page, left, right)
            }
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Result of `compare_reports`
#[derive(Debug, Clone)]
pub struct PdfComparison {
    pub left: PdfReport,
    pub right: PdfReport,
    pub differences: Vec<Difference>,
}

impl PdfComparison {
    pub fn is_match(&self) -> bool {
        self.differences.is_empty()
    }
}

/// Compare page count, then page by page over the pages both sides have
pub fn compare_reports(left: PdfReport, right: PdfReport) -> PdfComparison {
    let mut differences = Vec::new();

    if left.pages.len() != right.pages.len() {
        differences.push(Difference::PageCount {
            left: left.pages.len(),
            right: right.pages.len(),
        });
    }
    for (l, r) in left.pages.iter().zip(&right.pages) {
        compare_pages(l, r, &mut differences);
    }

    PdfComparison {
        left,
        right,
        differences,
    }
}

fn compare_pages(left: &PageReport, right: &PageReport, out: &mut Vec<Difference>) {
    let page = left.number;

    if (left.width - right.width).abs() > SIZE_TOLERANCE
        || (left.height - right.height).abs() > SIZE_TOLERANCE
    {
        out.push(Difference::PageSize {
            page,
            left: (left.width, left.height),
            right: (right.width, right.height),
        });
    }

    let (l_draws, r_draws) = (
        left.contents.has_draw_operators,
        right.contents.has_draw_operators,
    );
    if l_draws != r_draws {
        out.push(Difference::Drawing {
            page,
            left: l_draws,
            right: r_draws,
        });
    }

    let (l_fonts, r_fonts) = (
        resource_count(left, |r| r.fonts.len()),
        resource_count(right, |r| r.fonts.len()),
    );
    if l_fonts != r_fonts {
        out.push(Difference::Fonts {
            page,
            left: l_fonts,
            right: r_fonts,
        });
    }
    let (l_xobjects, r_xobjects) = (
        resource_count(left, |r| r.xobjects.len()),
        resource_count(right, |r| r.xobjects.len()),
    );
    if l_xobjects != r_xobjects {
        out.push(Difference::XObjects {
            page,
            left: l_xobjects,
            right: r_xobjects,
        });
    }
}

fn resource_count(page: &PageReport, pick: fn(&ResourceInfo) -> usize) -> usize {
    page.resources.as_ref().map_or(0, pick)
}

/// Both files' page sizes followed by the differences
pub struct ComparisonView<'a>(pub &'a PdfComparison);

impl fmt::Display for ComparisonView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comparison = self.0;
        for (label, report) in [("A", &comparison.left), ("B", &comparison.right)] {
            writeln!(f, "{}: {} ({} pages)", label, report.source, report.pages.len())?;
            for page in &report.pages {
                writeln!(
                    f,
                    "  Page {}: {:.2} x {:.2} pt ({}), {} bytes of content",
                    page.number, page.width, page.height, page.paper, page.contents.decoded_len
                )?;
            }
        }
        writeln!(f)?;

        if comparison.is_match() {
            return writeln!(f, "No structural differences");
        }
        writeln!(f, "{} differences (A vs B):", comparison.differences.len())?;
        for difference in &comparison.differences {
            writeln!(f, "  - {}", difference)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::{ContentsInfo, PaperClass};
    use crate::page::ContentsKind;

    fn page(number: u32, width: f32, draws: bool, fonts: usize) -> PageReport {
        PageReport {
            number,
            object_id: (number, 0),
            width,
            height: 841.89,
            paper: PaperClass::Custom,
            contents: ContentsInfo {
                kind: ContentsKind::Stream((number, 0)),
                entry_type: Some("Reference"),
                resolved_type: Some("Stream"),
                streams: Vec::new(),
                raw_len: 0,
                decoded_len: 0,
                has_draw_operators: draws,
                preview: String::new(),
            },
            resources: Some(ResourceInfo {
                fonts: (0..fonts).map(|i| format!("F{}", i)).collect(),
                ..Default::default()
            }),
        }
    }

    fn report(source: &str, pages: Vec<PageReport>) -> PdfReport {
        PdfReport {
            source: source.to_string(),
            version: "1.7".to_string(),
            creator: None,
            producer: None,
            file_size: 0,
            pages,
        }
    }

    #[test]
    fn test_identical_reports_match() {
        let a = report("a.pdf", vec![page(1, 595.28, true, 1)]);
        let b = report("b.pdf", vec![page(1, 595.3, true, 1)]);

        let comparison = compare_reports(a, b);

        assert!(comparison.is_match());
        assert!(ComparisonView(&comparison).to_string().contains("No structural differences"));
    }

    #[test]
    fn test_differences_are_listed_per_page() {
        let a = report("a.pdf", vec![page(1, 595.28, true, 2), page(2, 595.28, true, 0)]);
        let b = report("b.pdf", vec![page(1, 612.0, false, 1)]);

        let comparison = compare_reports(a, b);

        assert_eq!(
            comparison.differences,
            vec![
                Difference::PageCount { left: 2, right: 1 },
                Difference::PageSize {
                    page: 1,
                    left: (595.28, 841.89),
                    right: (612.0, 841.89),
                },
                Difference::Drawing {
                    page: 1,
                    left: true,
                    right: false,
                },
                Difference::Fonts {
                    page: 1,
                    left: 2,
                    right: 1,
                },
            ]
        );
        let text = ComparisonView(&comparison).to_string();
        assert!(text.contains("4 differences (A vs B):"));
        assert!(text.contains("page count: 2 vs 1"));
    }
}
