//! Shared constants for merging and inspection
//!
//! Paper sizes are in points (1/72 inch). Thresholds mirror what the
//! diagnostic tools report as "real" content.

// =============================================================================
// Paper Sizes
// =============================================================================

/// ISO A4 portrait (210 × 297 mm)
pub const A4_PT: (f32, f32) = (595.28, 841.89);

/// ISO B4 portrait (250 × 353 mm)
pub const B4_PT: (f32, f32) = (708.66, 1000.63);

/// MediaBox assumed when a page tree carries none (US Letter)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (612.0, 792.0);

/// Maximum difference in points for a page to count as a named paper size
pub const PAPER_MATCH_TOLERANCE: f32 = 10.0;

// =============================================================================
// Content heuristics
// =============================================================================

/// Content longer than this counts as a page with real content (summary inspector)
pub const SUMMARY_CONTENT_THRESHOLD: usize = 100;

/// Stream size above which the content-stream inspector reports real content
pub const STREAM_CONTENT_THRESHOLD: usize = 50;

/// Number of decoded characters shown in a content preview
pub const PREVIEW_CHARS: usize = 200;
