//! Coordinate grid over a template image, for lining up form fields

use crate::canvas::{Color, Frame, PageCanvas, PdfCanvas, StrokeStyle};
use crate::types::*;
use image::RgbImage;
use std::path::Path;

const MINOR_STEP: u32 = 50;
const MAJOR_STEP: u32 = 100;
const LABEL_SIZE: f32 = 8.0;

const MINOR_LINE: StrokeStyle = StrokeStyle {
    width: 0.5,
    color: Color::rgb(255, 170, 170),
    dash: None,
};

const MAJOR_LINE: StrokeStyle = StrokeStyle {
    width: 1.0,
    color: Color::RED,
    dash: None,
};

/// Draw `template` full-page at one point per pixel with a labelled grid on
/// top. Labels give top-left based coordinates, the ones the form layout uses.
pub fn grid_pdf_bytes(template: &RgbImage) -> Result<Vec<u8>> {
    let (width, height) = (template.width() as f32, template.height() as f32);
    let mut canvas = PdfCanvas::new("Coordinate grid", width, height, None);

    canvas.image(template, Frame::new(0.0, 0.0, width, height))?;

    for x in (MINOR_STEP..template.width()).step_by(MINOR_STEP as usize) {
        let major = x % MAJOR_STEP == 0;
        let stroke = if major { &MAJOR_LINE } else { &MINOR_LINE };
        let x = x as f32;
        canvas.line((x, 0.0), (x, height), stroke);
        if major {
            canvas.fill_text(&format!("{}", x), x + 2.0, 2.0, LABEL_SIZE, Color::RED);
        }
    }

    for y in (MINOR_STEP..template.height()).step_by(MINOR_STEP as usize) {
        let major = y % MAJOR_STEP == 0;
        let stroke = if major { &MAJOR_LINE } else { &MINOR_LINE };
        let y = y as f32;
        canvas.line((0.0, y), (width, y), stroke);
        if major {
            canvas.fill_text(&format!("{}", y), 2.0, y + 2.0, LABEL_SIZE, Color::RED);
        }
    }

    let size_label = format!("Size: {} x {}", template.width(), template.height());
    let label_width = canvas.measure_text(&size_label, LABEL_SIZE * 1.5);
    canvas.fill_text(
        &size_label,
        (width - label_width) / 2.0,
        LABEL_SIZE * 2.0,
        LABEL_SIZE * 1.5,
        Color::RED,
    );
    canvas.fill_text(
        "Origin (0,0) at top-left",
        4.0,
        height - LABEL_SIZE * 2.0,
        LABEL_SIZE,
        Color::RED,
    );

    Ok(canvas.finish())
}

/// Write a grid PDF for the image at `template`, returning its size in pixels
pub async fn render_grid(
    template: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<(u32, u32)> {
    let template = template.as_ref().to_owned();
    let output = output.as_ref();

    let (bytes, size) = tokio::task::spawn_blocking(move || -> Result<_> {
        let image = image::open(&template)?.to_rgb8();
        let size = image.dimensions();
        Ok((grid_pdf_bytes(&image)?, size))
    })
    .await??;

    tokio::fs::write(output, bytes).await?;
    log::info!(
        "Wrote {}x{} grid to {}",
        size.0,
        size.1,
        output.display()
    );

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_page_matches_image_size() {
        let template = RgbImage::from_pixel(300, 200, image::Rgb([255, 255, 255]));
        let bytes = grid_pdf_bytes(&template).unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page = doc.get_dictionary(pages[&1]).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let width = media_box[2].as_float().unwrap();
        let height = media_box[3].as_float().unwrap();
        assert!((width - 300.0).abs() < 0.5);
        assert!((height - 200.0).abs() < 0.5);
    }
}
