use crate::constants::{A4_PT, B4_PT, PAPER_MATCH_TOLERANCE};
use std::fmt;

/// Named paper size recognized from page dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperClass {
    A4Portrait,
    A4Landscape,
    B4Portrait,
    B4Landscape,
    Custom,
}

/// Classify page dimensions in points
pub fn classify_page(width: f32, height: f32) -> PaperClass {
    let matches = |(w, h): (f32, f32)| {
        (width - w).abs() < PAPER_MATCH_TOLERANCE && (height - h).abs() < PAPER_MATCH_TOLERANCE
    };

    if matches(A4_PT) {
        PaperClass::A4Portrait
    } else if matches((A4_PT.1, A4_PT.0)) {
        PaperClass::A4Landscape
    } else if matches(B4_PT) {
        PaperClass::B4Portrait
    } else if matches((B4_PT.1, B4_PT.0)) {
        PaperClass::B4Landscape
    } else {
        PaperClass::Custom
    }
}

impl fmt::Display for PaperClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaperClass::A4Portrait => "A4 portrait",
            PaperClass::A4Landscape => "A4 landscape",
            PaperClass::B4Portrait => "B4 portrait",
            PaperClass::B4Landscape => "B4 landscape",
            PaperClass::Custom => "custom size",
        };
        f.write_str(name)
    }
}
