use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("None of the input files exist")]
    NoInputs,
    #[error("Page {page} has no usable content stream")]
    MissingContent { page: usize },
    #[error("All repair strategies failed")]
    RepairFailed,
    #[error("Content stream filter {filter} cannot be decoded")]
    UndecodableContent { filter: String },
}

pub type Result<T> = std::result::Result<T, MergeError>;

/// Uniform page size applied to every merged page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TargetSize {
    /// Leave every page at its own size
    #[default]
    Original,
    /// ISO A4 portrait
    A4,
    /// ISO B4 portrait
    B4,
}

impl TargetSize {
    /// Target dimensions in points, or `None` when pages keep their size
    pub fn dimensions_pt(self) -> Option<(f32, f32)> {
        match self {
            TargetSize::Original => None,
            TargetSize::A4 => Some(crate::constants::A4_PT),
            TargetSize::B4 => Some(crate::constants::B4_PT),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TargetSize::Original => "ORIGINAL",
            TargetSize::A4 => "A4",
            TargetSize::B4 => "B4",
        }
    }
}

impl std::str::FromStr for TargetSize {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ORIGINAL" => Ok(TargetSize::Original),
            "A4" => Ok(TargetSize::A4),
            "B4" => Ok(TargetSize::B4),
            other => Err(MergeError::Config(format!(
                "Unknown page size '{}', expected A4, B4 or ORIGINAL",
                other
            ))),
        }
    }
}

/// What to do with a page whose content stream is absent or dangling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepairPolicy {
    /// Fail the merge
    Strict,
    /// Give the page an empty content stream and log a warning
    #[default]
    SubstituteEmptyContent,
}

/// Scale and offset mapping an original page onto a target page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    /// Size of the page after normalization
    pub target: (f32, f32),
}

impl PagePlacement {
    /// Size of the scaled content
    pub fn scaled_size(&self, original: (f32, f32)) -> (f32, f32) {
        (original.0 * self.scale, original.1 * self.scale)
    }
}

/// Counters collected while merging in-memory documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeStats {
    /// Page count contributed by each input, in input order
    pub pages_per_document: Vec<usize>,
    /// Pages that received an empty content stream
    pub repaired_pages: usize,
    /// Pages that were rescaled onto the target size
    pub normalized_pages: usize,
}

impl MergeStats {
    pub fn total_pages(&self) -> usize {
        self.pages_per_document.iter().sum()
    }
}

/// Outcome of merging files on disk
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub output: PathBuf,
    /// Files that were merged with their page counts
    pub merged: Vec<(PathBuf, usize)>,
    /// Files skipped because they do not exist
    pub skipped: Vec<PathBuf>,
    pub repaired_pages: usize,
    pub total_pages: usize,
}
