//! Drawing surface abstraction
//!
//! The form is laid out once against `PageCanvas`. Coordinates are points
//! with the origin at the top-left corner of the page and y growing down.

mod browser;
mod html;
mod pdf;

pub use browser::{DEFAULT_BROWSER_TIMEOUT, find_browser, print_html_to_pdf};
pub use html::HtmlCanvas;
pub use pdf::PdfCanvas;

use crate::types::Result;
use image::RgbImage;

/// Distance from the top of a text line to its baseline, as a fraction of
/// the font size
pub const BASELINE_RATIO: f32 = 0.88;

/// Line advance for stacked lines, as a fraction of the font size
pub const LINE_SPACING: f32 = 1.2;

/// Horizontal inset of left/right aligned text inside a frame
pub const TEXT_PADDING: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Frame {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREY: Color = Color::rgb(0x99, 0x99, 0x99);
    pub const DARK_GREY: Color = Color::rgb(0x66, 0x66, 0x66);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS hex notation
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: Color,
    pub align: HAlign,
    pub valign: VAlign,
}

impl TextStyle {
    pub const fn new(size: f32) -> Self {
        Self {
            size,
            color: Color::BLACK,
            align: HAlign::Left,
            valign: VAlign::Center,
        }
    }

    pub const fn centered(size: f32) -> Self {
        Self {
            align: HAlign::Center,
            ..Self::new(size)
        }
    }

    pub const fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub color: Color,
    /// Dash and gap length
    pub dash: Option<(f32, f32)>,
}

impl StrokeStyle {
    pub const fn solid(width: f32) -> Self {
        Self {
            width,
            color: Color::BLACK,
            dash: None,
        }
    }
}

/// Drawing capabilities the form layout needs
pub trait PageCanvas {
    /// Page width and height in points
    fn page_size(&self) -> (f32, f32);

    fn stroke_rect(&mut self, frame: Frame, stroke: &StrokeStyle);

    fn fill_rect(&mut self, frame: Frame, color: Color);

    fn line(&mut self, from: (f32, f32), to: (f32, f32), stroke: &StrokeStyle);

    /// Draw one line of text whose line box starts at (`x`, `y`)
    fn fill_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color);

    /// Advance width of `text` in points
    fn measure_text(&self, text: &str, size: f32) -> f32;

    /// Draw an image stretched to `frame`
    fn image(&mut self, image: &RgbImage, frame: Frame) -> Result<()>;

    fn save_state(&mut self);

    fn restore_state(&mut self);

    /// Rotate subsequent drawing by `degrees`, clockwise as seen on the
    /// page, about `origin`
    fn rotate(&mut self, degrees: f32, origin: (f32, f32));

    fn translate(&mut self, dx: f32, dy: f32);

    /// Draw text aligned inside `frame`; `\n` starts a new line
    fn text_in_frame(&mut self, text: &str, frame: Frame, style: &TextStyle) {
        let lines: Vec<&str> = text.split('\n').collect();
        let line_height = style.size * LINE_SPACING;
        let block_height = line_height * lines.len() as f32;

        let top = match style.valign {
            VAlign::Top => frame.y + 2.0,
            VAlign::Center => frame.y + (frame.height - block_height) / 2.0,
            VAlign::Bottom => frame.bottom() - block_height - 2.0,
        };

        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let width = self.measure_text(line, style.size);
            let x = match style.align {
                HAlign::Left => frame.x + TEXT_PADDING,
                HAlign::Center => frame.x + (frame.width - width) / 2.0,
                HAlign::Right => frame.right() - width - TEXT_PADDING,
            };
            // Center the glyphs within their line box
            let y = top + i as f32 * line_height + (line_height - style.size) / 2.0;
            self.fill_text(line, x, y, style.size, style.color);
        }
    }

    /// Bordered table cell with optional text
    fn cell(&mut self, frame: Frame, text: &str, style: &TextStyle, border: &StrokeStyle) {
        self.stroke_rect(frame, border);
        if !text.is_empty() {
            self.text_in_frame(text, frame, style);
        }
    }
}

/// Width estimate for backends without font metrics: full-width glyphs take
/// one em, everything else a little over half
pub fn approximate_text_width(text: &str, size: f32) -> f32 {
    text.chars()
        .map(|ch| if is_wide(ch) { 1.0 } else { 0.55 })
        .sum::<f32>()
        * size
}

fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6)
}

/// Affine matrix `[a b c d e f]` rotating by `radians` about `(px, py)`
pub(crate) fn rotation_about(radians: f32, px: f32, py: f32) -> [f32; 6] {
    let (sin, cos) = radians.sin_cos();
    [
        cos,
        sin,
        -sin,
        cos,
        px - px * cos + py * sin,
        py - px * sin - py * cos,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_characters_measure_one_em() {
        assert_eq!(approximate_text_width("合计", 10.0), 20.0);
        assert!((approximate_text_width("99.00", 10.0) - 27.5).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_keeps_origin_fixed() {
        let [a, b, c, d, e, f] = rotation_about(std::f32::consts::FRAC_PI_2, 15.0, 400.0);
        let (x, y) = (15.0, 400.0);
        assert!((a * x + c * y + e - x).abs() < 1e-3);
        assert!((b * x + d * y + f - y).abs() < 1e-3);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::GREY.hex(), "#999999");
    }
}
