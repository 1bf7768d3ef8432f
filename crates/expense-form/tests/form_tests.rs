use expense_form::canvas::{Color, Frame, PageCanvas, StrokeStyle, approximate_text_width};
use expense_form::*;
use image::RgbImage;
use tempfile::TempDir;

/// Canvas that records what the form asks it to draw
#[derive(Default)]
struct RecordingCanvas {
    texts: Vec<(String, f32, f32)>,
    rects: Vec<Frame>,
    lines: usize,
    images: Vec<Frame>,
    rotations: Vec<f32>,
}

impl RecordingCanvas {
    fn has_text(&self, text: &str) -> bool {
        self.texts.iter().any(|(t, _, _)| t == text)
    }
}

impl PageCanvas for RecordingCanvas {
    fn page_size(&self) -> (f32, f32) {
        (595.28, 841.89)
    }

    fn stroke_rect(&mut self, frame: Frame, _stroke: &StrokeStyle) {
        self.rects.push(frame);
    }

    fn fill_rect(&mut self, _frame: Frame, _color: Color) {}

    fn line(&mut self, _from: (f32, f32), _to: (f32, f32), _stroke: &StrokeStyle) {
        self.lines += 1;
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, _size: f32, _color: Color) {
        self.texts.push((text.to_string(), x, y));
    }

    fn measure_text(&self, text: &str, size: f32) -> f32 {
        approximate_text_width(text, size)
    }

    fn image(&mut self, _image: &RgbImage, frame: Frame) -> Result<()> {
        self.images.push(frame);
        Ok(())
    }

    fn save_state(&mut self) {}

    fn restore_state(&mut self) {}

    fn rotate(&mut self, degrees: f32, _origin: (f32, f32)) {
        self.rotations.push(degrees);
    }

    fn translate(&mut self, _dx: f32, _dy: f32) {}
}

fn config_without_fonts() -> GeneratorConfig {
    GeneratorConfig {
        fonts: FontSource::new(["/no/such/font.otf"]),
        ..Default::default()
    }
}

#[test]
fn test_sample_record_rows_and_totals() {
    let record = ReimbursementRecord::sample();
    let layout = FormLayout::a4_portrait();
    let mut canvas = RecordingCanvas::default();

    let metrics = render_form(&mut canvas, &record, &layout, None).unwrap();

    assert_eq!(metrics.data_rows, 2);
    assert_eq!(metrics.filler_rows, 1);
    assert!(!metrics.overflow);
    assert!(!canvas.rects.is_empty());

    assert!(canvas.has_text("44.00"));
    assert!(canvas.has_text("55.00"));
    assert!(canvas.has_text("99.00"));
    assert!(canvas.has_text("玖拾玖元整  ¥：99.00"));
    assert!(canvas.has_text("合    计"));
    assert!(canvas.has_text("差 旅 报 销 单"));
    assert!(canvas.has_text("金额：99.00元 / 99.00元"));
}

#[test]
fn test_headers_and_approvers_are_drawn() {
    let record = ReimbursementRecord::sample();
    let mut canvas = RecordingCanvas::default();

    render_form(&mut canvas, &record, &FormLayout::a4_portrait(), None).unwrap();

    for label in ["出发", "到达", "交通", "出差补贴", "其他费用金额", "小计", "住宿"] {
        assert!(canvas.has_text(label), "missing header {}", label);
    }
    // Stacked labels are drawn one line at a time
    assert!(canvas.has_text("单据"));
    assert!(canvas.has_text("张数"));
    for approver in ["领导批审", "部门负责人", "财务负责人", "会计", "出纳", "领款人"] {
        assert!(canvas.has_text(approver), "missing approver {}", approver);
    }
    // Advance and refund are unset
    assert!(canvas.has_text("_________"));
}

#[test]
fn test_binding_caption_is_rotated() {
    let record = ReimbursementRecord::sample();
    let mut canvas = RecordingCanvas::default();

    render_form(&mut canvas, &record, &FormLayout::a4_portrait(), None).unwrap();

    assert_eq!(canvas.rotations, vec![-90.0]);
    assert!(canvas.lines >= 1);
    assert!(
        canvas
            .texts
            .iter()
            .any(|(t, _, _)| t.contains("淮安新业电力建设有限公司") && t.contains("装订线"))
    );
}

#[test]
fn test_qr_is_placed_at_table_left() {
    let record = ReimbursementRecord::sample();
    let layout = FormLayout::a4_portrait();
    let qr = qr_rgb(&record.header.code, 4).unwrap();
    let mut canvas = RecordingCanvas::default();

    render_form(&mut canvas, &record, &layout, Some(&qr)).unwrap();

    assert_eq!(canvas.images.len(), 1);
    let frame = canvas.images[0];
    assert_eq!(frame.x, layout.table_left());
    assert_eq!(frame.y, layout.margins.top);
    assert_eq!(frame.width, layout.qr_size);
}

#[test]
fn test_more_legs_than_minimum_add_rows() {
    let mut record = ReimbursementRecord::sample();
    let extra = record.legs[0].clone();
    record.legs.extend(std::iter::repeat_n(extra, 3));
    let layout = FormLayout::a4_portrait();

    let mut short = RecordingCanvas::default();
    let base = render_form(&mut short, &ReimbursementRecord::sample(), &layout, None).unwrap();
    let mut long = RecordingCanvas::default();
    let metrics = render_form(&mut long, &record, &layout, None).unwrap();

    assert_eq!(metrics.data_rows, 5);
    assert_eq!(metrics.filler_rows, 0);
    let added = metrics.table_bottom - base.table_bottom;
    assert!((added - 2.0 * layout.rows.data).abs() < 1e-3);
}

#[test]
fn test_overflow_is_reported() {
    let mut record = ReimbursementRecord::sample();
    let extra = record.legs[0].clone();
    record.legs.extend(std::iter::repeat_n(extra, 40));
    let mut canvas = RecordingCanvas::default();

    let metrics = render_form(&mut canvas, &record, &FormLayout::a4_portrait(), None).unwrap();

    assert!(metrics.overflow);
    assert!(metrics.table_bottom > 841.89);
}

#[tokio::test]
async fn test_generate_pdf_writes_one_a4_page() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("form.pdf");

    let metrics = generate_pdf(
        &ReimbursementRecord::sample(),
        &FormLayout::a4_portrait(),
        &config_without_fonts(),
        &output,
    )
    .await
    .unwrap();
    assert_eq!(metrics.data_rows, 2);

    let doc = lopdf::Document::load(&output).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);

    let page = doc.get_dictionary(pages[&1]).unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = media_box[2].as_float().unwrap();
    let height = media_box[3].as_float().unwrap();
    assert!((width - 595.28).abs() < 0.5);
    assert!((height - 841.89).abs() < 0.5);
}

#[tokio::test]
async fn test_generate_pdf_landscape_page() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("landscape.pdf");

    generate_pdf(
        &ReimbursementRecord::sample(),
        &FormLayout::a5_landscape(),
        &config_without_fonts(),
        &output,
    )
    .await
    .unwrap();

    let doc = lopdf::Document::load(&output).unwrap();
    let pages = doc.get_pages();
    let page = doc.get_dictionary(pages[&1]).unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = media_box[2].as_float().unwrap();
    let height = media_box[3].as_float().unwrap();
    assert!(width > height);
}

#[tokio::test]
async fn test_generate_html_contains_form_text() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("form.html");

    generate_html(
        &ReimbursementRecord::sample(),
        &FormLayout::a4_portrait(),
        &GeneratorConfig::default(),
        &output,
    )
    .await
    .unwrap();

    let html = tokio::fs::read_to_string(&output).await.unwrap();
    assert!(html.contains("@page { size: 595.28pt 841.89pt; margin: 0; }"));
    assert!(html.contains("玖拾玖元整  ¥：99.00"));
    assert!(html.contains("data:image/png;base64,"));
}

#[tokio::test]
async fn test_missing_background_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = GeneratorConfig {
        background: Some(temp_dir.path().join("missing.png")),
        ..config_without_fonts()
    };

    let result = generate_pdf(
        &ReimbursementRecord::sample(),
        &FormLayout::a4_portrait(),
        &config,
        temp_dir.path().join("form.pdf"),
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_record_and_config_from_json() {
    let temp_dir = TempDir::new().unwrap();
    let record_path = temp_dir.path().join("record.json");
    let config_path = temp_dir.path().join("config.json");

    ReimbursementRecord::sample().save(&record_path).await.unwrap();
    tokio::fs::write(&config_path, r#"{"qr_module_px": 2}"#)
        .await
        .unwrap();

    let record = ReimbursementRecord::load(&record_path).await.unwrap();
    let config = GeneratorConfig::load(&config_path).await.unwrap();

    assert_eq!(record, ReimbursementRecord::sample());
    assert_eq!(config.qr_module_px, 2);
    assert_eq!(config.fonts, FontSource::default());
}

#[tokio::test]
async fn test_demo_record_matches_sample() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/sample-record.json");

    let record = ReimbursementRecord::load(path).await.unwrap();

    assert_eq!(record, ReimbursementRecord::sample());
    assert!(record.audit().is_empty());
}
