//! Form geometry
//!
//! All measurements are in points with a top-left origin. One `FormLayout`
//! value drives every paper variant; the presets differ only in numbers.

use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of detail columns in the trip table
pub const COLUMN_COUNT: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    A4,
    A5,
}

impl PageFormat {
    /// Portrait dimensions in points
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            PageFormat::A4 => (595.28, 841.89),
            PageFormat::A5 => (419.53, 595.28),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Named layout presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutPreset {
    #[default]
    A4Portrait,
    A4Landscape,
    A5Landscape,
}

impl LayoutPreset {
    pub fn layout(self) -> FormLayout {
        match self {
            LayoutPreset::A4Portrait => FormLayout::a4_portrait(),
            LayoutPreset::A4Landscape => FormLayout::a4_landscape(),
            LayoutPreset::A5Landscape => FormLayout::a5_landscape(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// Font sizes used by the form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSizes {
    pub title: f32,
    pub date: f32,
    pub info: f32,
    /// Header labels and info row
    pub cell: f32,
    /// Detail rows and sub-headers
    pub detail: f32,
    /// Two-line sub-header labels
    pub small: f32,
    pub binding: f32,
}

/// Row heights of the table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowHeights {
    pub info: f32,
    pub header: f32,
    pub data: f32,
    pub totals: f32,
    pub amount_in_words: f32,
    pub approval: f32,
}

/// Complete form geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormLayout {
    pub format: PageFormat,
    pub orientation: Orientation,
    pub margins: Margins,
    /// Distance of the binding line from the left page edge; the table is
    /// indented by the same amount
    pub binding_offset: f32,
    pub qr_size: f32,
    /// Space between the top margin and the table
    pub header_height: f32,
    pub fonts: FontSizes,
    pub rows: RowHeights,
    /// Minimum number of data rows, padded with blank rows
    pub min_rows: usize,
    /// Relative widths of the detail columns
    pub column_weights: [f32; COLUMN_COUNT],
    pub title: String,
}

impl Default for FormLayout {
    fn default() -> Self {
        Self::a4_portrait()
    }
}

const DEFAULT_WEIGHTS: [f32; COLUMN_COUNT] = [
    60.0, 60.0, 60.0, 60.0, 45.0, 50.0, 30.0, 47.0, 48.0, 51.0, 50.0, 50.0, 50.0, 40.0,
];

impl FormLayout {
    pub fn a4_portrait() -> Self {
        Self {
            format: PageFormat::A4,
            orientation: Orientation::Portrait,
            margins: Margins::uniform(50.0),
            binding_offset: 30.0,
            qr_size: 70.0,
            header_height: 75.0,
            fonts: FontSizes {
                title: 22.0,
                date: 14.0,
                info: 9.0,
                cell: 9.0,
                detail: 7.0,
                small: 6.0,
                binding: 10.0,
            },
            rows: RowHeights {
                info: 30.0,
                header: 25.0,
                data: 25.0,
                totals: 25.0,
                amount_in_words: 35.0,
                approval: 50.0,
            },
            min_rows: 3,
            column_weights: DEFAULT_WEIGHTS,
            title: "差 旅 报 销 单".to_string(),
        }
    }

    pub fn a4_landscape() -> Self {
        Self {
            orientation: Orientation::Landscape,
            margins: Margins::uniform(40.0),
            fonts: FontSizes {
                detail: 8.0,
                small: 7.0,
                ..Self::a4_portrait().fonts
            },
            min_rows: 4,
            ..Self::a4_portrait()
        }
    }

    pub fn a5_landscape() -> Self {
        Self {
            format: PageFormat::A5,
            orientation: Orientation::Landscape,
            margins: Margins::uniform(20.0),
            binding_offset: 20.0,
            qr_size: 50.0,
            header_height: 58.0,
            fonts: FontSizes {
                title: 16.0,
                date: 11.0,
                info: 7.0,
                cell: 7.0,
                detail: 6.0,
                small: 5.0,
                binding: 8.0,
            },
            rows: RowHeights {
                info: 22.0,
                header: 18.0,
                data: 18.0,
                totals: 18.0,
                amount_in_words: 26.0,
                approval: 34.0,
            },
            min_rows: 3,
            ..Self::a4_portrait()
        }
    }

    /// Load a layout from JSON; missing keys keep the A4 portrait values
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Page size in points, oriented
    pub fn page_size(&self) -> (f32, f32) {
        let (w, h) = self.format.dimensions_pt();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    /// Left edge of the table
    pub fn table_left(&self) -> f32 {
        self.margins.left + self.binding_offset
    }

    /// Top edge of the table
    pub fn table_top(&self) -> f32 {
        self.margins.top + self.header_height
    }

    pub fn table_width(&self) -> f32 {
        self.page_size().0 - self.table_left() - self.margins.right
    }

    /// Lowest y the table may reach without crossing the bottom margin
    pub fn content_bottom(&self) -> f32 {
        self.page_size().1 - self.margins.bottom
    }

    /// Column weights scaled to `table_width`
    pub fn column_widths(&self, table_width: f32) -> [f32; COLUMN_COUNT] {
        let total: f32 = self.column_weights.iter().sum();
        let mut widths = [0.0; COLUMN_COUNT];
        if total <= 0.0 {
            widths.fill(table_width / COLUMN_COUNT as f32);
            return widths;
        }
        for (width, weight) in widths.iter_mut().zip(self.column_weights) {
            *width = weight / total * table_width;
        }
        widths
    }
}
