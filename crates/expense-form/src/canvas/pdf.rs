use super::{
    BASELINE_RATIO, Color, Frame, PageCanvas, StrokeStyle, approximate_text_width, rotation_about,
};
use crate::types::Result;
use ::image::RgbImage;
use printpdf::*;

/// Vector PDF backend built on printpdf operations.
///
/// Canvas coordinates are flipped into PDF space (origin bottom-left) as
/// they are emitted, so transforms set through `rotate`/`translate` compose
/// with the flip instead of replacing it.
pub struct PdfCanvas {
    doc: PdfDocument,
    ops: Vec<Op>,
    width: f32,
    height: f32,
    font: Option<(FontId, ParsedFont)>,
}

impl PdfCanvas {
    /// Start a single-page document. Text falls back to built-in Helvetica
    /// when `font` is `None`.
    pub fn new(title: &str, width: f32, height: f32, font: Option<ParsedFont>) -> Self {
        let mut doc = PdfDocument::new(title);
        let font = font.map(|font| (doc.add_font(&font), font));
        Self {
            doc,
            ops: Vec::new(),
            width,
            height,
            font,
        }
    }

    /// Serialize the page into PDF bytes
    pub fn finish(mut self) -> Vec<u8> {
        self.doc.pages.push(PdfPage::new(
            Mm::from(Pt(self.width)),
            Mm::from(Pt(self.height)),
            self.ops,
        ));

        let mut warnings = Vec::new();
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            log::debug!("printpdf reported {} warnings while saving", warnings.len());
        }
        bytes
    }

    fn point(&self, x: f32, y: f32) -> LinePoint {
        LinePoint {
            p: Point {
                x: Pt(x),
                y: Pt(self.height - y),
            },
            bezier: false,
        }
    }

    fn rect_ring(&self, frame: Frame) -> PolygonRing {
        PolygonRing {
            points: vec![
                self.point(frame.x, frame.y),
                self.point(frame.right(), frame.y),
                self.point(frame.right(), frame.bottom()),
                self.point(frame.x, frame.bottom()),
            ],
        }
    }

    fn set_stroke(&mut self, stroke: &StrokeStyle) {
        self.ops.push(Op::SetOutlineColor {
            col: pdf_color(stroke.color),
        });
        self.ops.push(Op::SetOutlineThickness {
            pt: Pt(stroke.width),
        });
        if let Some((dash, gap)) = stroke.dash {
            self.ops.push(Op::SetLineDashPattern {
                dash: LineDashPattern::from_array(&[dash.round() as i64, gap.round() as i64], 0),
            });
        }
    }

    /// Emit a stroke in its own graphics state so dashes do not leak
    fn stroked(&mut self, stroke: &StrokeStyle, op: Op) {
        self.ops.push(Op::SaveGraphicsState);
        self.set_stroke(stroke);
        self.ops.push(op);
        self.ops.push(Op::RestoreGraphicsState);
    }
}

fn pdf_color(color: Color) -> printpdf::Color {
    printpdf::Color::Rgb(Rgb {
        r: color.r as f32 / 255.0,
        g: color.g as f32 / 255.0,
        b: color.b as f32 / 255.0,
        icc_profile: None,
    })
}

impl PageCanvas for PdfCanvas {
    fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn stroke_rect(&mut self, frame: Frame, stroke: &StrokeStyle) {
        let polygon = Polygon {
            rings: vec![self.rect_ring(frame)],
            mode: PaintMode::Stroke,
            winding_order: WindingOrder::NonZero,
        };
        self.stroked(stroke, Op::DrawPolygon { polygon });
    }

    fn fill_rect(&mut self, frame: Frame, color: Color) {
        self.ops.push(Op::SetFillColor {
            col: pdf_color(color),
        });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![self.rect_ring(frame)],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), stroke: &StrokeStyle) {
        let line = Line {
            points: vec![self.point(from.0, from.1), self.point(to.0, to.1)],
            is_closed: false,
        };
        self.stroked(stroke, Op::DrawLine { line });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color) {
        let baseline = self.height - (y + size * BASELINE_RATIO);
        let matrix = TextMatrix::Translate(Pt(x), Pt(baseline));

        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetFillColor {
            col: pdf_color(color),
        });
        match &self.font {
            Some((font_id, _)) => {
                self.ops.push(Op::SetFontSize {
                    font: font_id.clone(),
                    size: Pt(size),
                });
                self.ops.push(Op::SetTextMatrix { matrix });
                self.ops.push(Op::WriteText {
                    items: vec![TextItem::Text(text.to_string())],
                    font: font_id.clone(),
                });
            }
            None => {
                self.ops.push(Op::SetFontSizeBuiltinFont {
                    font: BuiltinFont::Helvetica,
                    size: Pt(size),
                });
                self.ops.push(Op::SetTextMatrix { matrix });
                self.ops.push(Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(text.to_string())],
                    font: BuiltinFont::Helvetica,
                });
            }
        }
        self.ops.push(Op::EndTextSection);
    }

    fn measure_text(&self, text: &str, size: f32) -> f32 {
        let Some((_, font)) = &self.font else {
            return approximate_text_width(text, size);
        };

        let mut width = 0.0;
        for ch in text.chars() {
            match font.lookup_glyph_index(ch as u32) {
                Some(glyph_id) => {
                    let advance = font.get_horizontal_advance(glyph_id);
                    width += (advance as f32 / 1000.0) * size;
                }
                None => width += approximate_text_width(&ch.to_string(), size),
            }
        }
        width
    }

    fn image(&mut self, image: &RgbImage, frame: Frame) -> Result<()> {
        let (px_w, px_h) = image.dimensions();
        if px_w == 0 || px_h == 0 {
            return Ok(());
        }

        let raw = RawImage {
            pixels: RawImageData::U8(image.as_raw().clone()),
            width: px_w as usize,
            height: px_h as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let id = self.doc.add_image(&raw);

        // At 72 dpi one pixel is one point
        self.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(frame.x)),
                translate_y: Some(Pt(self.height - frame.bottom())),
                scale_x: Some(frame.width / px_w as f32),
                scale_y: Some(frame.height / px_h as f32),
                dpi: Some(72.0),
                rotate: None,
            },
        });
        Ok(())
    }

    fn save_state(&mut self) {
        self.ops.push(Op::SaveGraphicsState);
    }

    fn restore_state(&mut self) {
        self.ops.push(Op::RestoreGraphicsState);
    }

    fn rotate(&mut self, degrees: f32, origin: (f32, f32)) {
        // Clockwise on the page is negative in PDF's y-up space
        let matrix = rotation_about(-degrees.to_radians(), origin.0, self.height - origin.1);
        self.ops.push(Op::SetTransformationMatrix {
            matrix: CurTransMat::Raw(matrix),
        });
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.ops.push(Op::SetTransformationMatrix {
            matrix: CurTransMat::Raw([1.0, 0.0, 0.0, 1.0, dx, -dy]),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_font_measures_approximately() {
        let canvas = PdfCanvas::new("test", 100.0, 100.0, None);
        assert_eq!(canvas.measure_text("合计", 10.0), 20.0);
    }

    #[test]
    fn test_finish_produces_pdf_bytes() {
        let mut canvas = PdfCanvas::new("test", 200.0, 100.0, None);
        canvas.stroke_rect(Frame::new(10.0, 10.0, 50.0, 20.0), &StrokeStyle::solid(0.5));
        canvas.fill_text("Hello", 12.0, 12.0, 9.0, Color::BLACK);

        let bytes = canvas.finish();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
