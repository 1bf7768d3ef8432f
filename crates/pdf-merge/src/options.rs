use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Merge configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MergeOptions {
    /// Uniform output page size
    pub target_size: TargetSize,
    /// Center scaled content on the target page
    pub center: bool,
    /// Handling of pages without a content stream
    pub repair: RepairPolicy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            target_size: TargetSize::Original,
            center: true,
            repair: RepairPolicy::SubstituteEmptyContent,
        }
    }
}

impl MergeOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Whether pages get rescaled at all
    pub fn normalizes(&self) -> bool {
        self.target_size.dimensions_pt().is_some()
    }
}
