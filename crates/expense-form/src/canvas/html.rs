use super::{BASELINE_RATIO, Color, Frame, PageCanvas, StrokeStyle, approximate_text_width};
use crate::types::Result;
use ::image::{ImageFormat, RgbImage};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write;
use std::io::Cursor;

const DEFAULT_FONT_FAMILY: &str = r#""Noto Sans SC", "SimSun", "宋体", serif"#;

/// Browser-print backend: one fixed-size inline SVG page inside a
/// standalone HTML document.
pub struct HtmlCanvas {
    width: f32,
    height: f32,
    title: String,
    font_family: String,
    body: String,
    /// Transform groups currently open
    open_groups: usize,
    /// `open_groups` at each `save_state`
    saved: Vec<usize>,
}

impl HtmlCanvas {
    pub fn new(title: &str, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            title: title.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            body: String::new(),
            open_groups: 0,
            saved: Vec::new(),
        }
    }

    /// CSS font-family list used for all text
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Close any open groups and wrap the page in an HTML document
    pub fn finish(mut self) -> String {
        self.close_groups(0);
        let (w, h) = (self.width, self.height);
        format!(
            r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>
@page {{ size: {w}pt {h}pt; margin: 0; }}
html, body {{ margin: 0; padding: 0; }}
svg {{ display: block; }}
</style>
</head>
<body>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}pt" height="{h}pt" viewBox="0 0 {w} {h}" font-family='{family}'>
{body}</svg>
</body>
</html>
"#,
            title = escape(&self.title),
            family = self.font_family,
            body = self.body,
        )
    }

    fn close_groups(&mut self, keep: usize) {
        while self.open_groups > keep {
            self.body.push_str("</g>\n");
            self.open_groups -= 1;
        }
    }

    fn open_group(&mut self, transform: String) {
        let _ = writeln!(self.body, r#"<g transform="{}">"#, transform);
        self.open_groups += 1;
    }
}

fn stroke_attrs(stroke: &StrokeStyle) -> String {
    let mut attrs = format!(
        r#"stroke="{}" stroke-width="{}""#,
        stroke.color.hex(),
        stroke.width
    );
    if let Some((dash, gap)) = stroke.dash {
        let _ = write!(attrs, r#" stroke-dasharray="{} {}" stroke-linecap="round""#, dash, gap);
    }
    attrs
}

/// Escape text for use in XML content and attributes
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

impl PageCanvas for HtmlCanvas {
    fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn stroke_rect(&mut self, frame: Frame, stroke: &StrokeStyle) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" {}/>"#,
            frame.x,
            frame.y,
            frame.width,
            frame.height,
            stroke_attrs(stroke)
        );
    }

    fn fill_rect(&mut self, frame: Frame, color: Color) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            frame.x,
            frame.y,
            frame.width,
            frame.height,
            color.hex()
        );
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), stroke: &StrokeStyle) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" {}/>"#,
            from.0,
            from.1,
            to.0,
            to.1,
            stroke_attrs(stroke)
        );
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color) {
        let _ = writeln!(
            self.body,
            r#"<text x="{}" y="{}" font-size="{}" fill="{}" xml:space="preserve">{}</text>"#,
            x,
            y + size * BASELINE_RATIO,
            size,
            color.hex(),
            escape(text)
        );
    }

    fn measure_text(&self, text: &str, size: f32) -> f32 {
        approximate_text_width(text, size)
    }

    fn image(&mut self, image: &RgbImage, frame: Frame) -> Result<()> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let _ = writeln!(
            self.body,
            r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="none" href="data:image/png;base64,{}"/>"#,
            frame.x,
            frame.y,
            frame.width,
            frame.height,
            STANDARD.encode(&png)
        );
        Ok(())
    }

    fn save_state(&mut self) {
        self.saved.push(self.open_groups);
    }

    fn restore_state(&mut self) {
        let keep = self.saved.pop().unwrap_or(0);
        self.close_groups(keep);
    }

    fn rotate(&mut self, degrees: f32, origin: (f32, f32)) {
        // SVG's y axis points down, so positive angles are already clockwise
        self.open_group(format!("rotate({} {} {})", degrees, origin.0, origin.1));
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.open_group(format!("translate({} {})", dx, dy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_closes_transform_groups() {
        let mut canvas = HtmlCanvas::new("t", 100.0, 100.0);
        canvas.save_state();
        canvas.rotate(-90.0, (10.0, 50.0));
        canvas.fill_text("a<b", 0.0, 0.0, 10.0, Color::BLACK);
        canvas.restore_state();

        let html = canvas.finish();
        assert_eq!(html.matches("<g ").count(), 1);
        assert_eq!(html.matches("</g>").count(), 1);
        assert!(html.contains("a&lt;b"));
        assert!(html.contains("rotate(-90 10 50)"));
    }

    #[test]
    fn test_page_rule_matches_size() {
        let html = HtmlCanvas::new("form", 595.28, 841.89).finish();
        assert!(html.contains("@page { size: 595.28pt 841.89pt; margin: 0; }"));
    }

    #[test]
    fn test_images_are_inlined_as_png() {
        let mut canvas = HtmlCanvas::new("t", 100.0, 100.0);
        let image = RgbImage::from_pixel(2, 2, ::image::Rgb([0, 0, 0]));
        canvas.image(&image, Frame::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert!(canvas.finish().contains("data:image/png;base64,iVBOR"));
    }
}
