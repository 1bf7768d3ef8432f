//! The reimbursement form, drawn once against `PageCanvas`

use crate::canvas::{
    Color, DEFAULT_BROWSER_TIMEOUT, Frame, HAlign, HtmlCanvas, PageCanvas, PdfCanvas, StrokeStyle,
    TextStyle, print_html_to_pdf,
};
use crate::fonts::FontSource;
use crate::layout::{COLUMN_COUNT, FormLayout};
use crate::qr::qr_rgb;
use crate::record::{Amount, ReimbursementRecord, TripLeg};
use crate::types::*;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BORDER: StrokeStyle = StrokeStyle::solid(0.5);

const BINDING_LINE: StrokeStyle = StrokeStyle {
    width: 0.5,
    color: Color::GREY,
    dash: Some((3.0, 3.0)),
};

/// Relative widths of the six information-row cells
const INFO_WEIGHTS: [f32; 6] = [1.0, 1.6, 1.2, 2.0, 1.2, 2.0];

const APPROVERS: [&str; 6] = ["领导批审", "部门负责人", "财务负责人", "会计", "出纳", "领款人"];

/// Placeholder for empty amount cells
const BLANK: &str = "_________";

/// Settings for turning a record into a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub fonts: FontSource,
    /// Template image drawn full-page beneath the form
    pub background: Option<PathBuf>,
    /// Pixels per QR module
    pub qr_module_px: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            fonts: FontSource::default(),
            background: None,
            qr_module_px: 4,
        }
    }
}

impl GeneratorConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// What `render_form` drew
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormMetrics {
    pub data_rows: usize,
    /// Blank rows added to reach the layout's minimum
    pub filler_rows: usize,
    /// y of the table's lower edge
    pub table_bottom: f32,
    /// The table runs past the bottom margin
    pub overflow: bool,
}

/// Column x positions and widths
struct Columns {
    xs: [f32; COLUMN_COUNT],
    widths: [f32; COLUMN_COUNT],
}

impl Columns {
    fn new(layout: &FormLayout) -> Self {
        let widths = layout.column_widths(layout.table_width());
        let mut xs = [0.0; COLUMN_COUNT];
        let mut x = layout.table_left();
        for (slot, width) in xs.iter_mut().zip(widths) {
            *slot = x;
            x += width;
        }
        Self { xs, widths }
    }

    /// Frame covering columns `start..end`
    fn span(&self, start: usize, end: usize, y: f32, height: f32) -> Frame {
        let width = self.widths[start..end].iter().sum();
        Frame::new(self.xs[start], y, width, height)
    }
}

/// Draw the complete form.
///
/// More legs than `layout.min_rows` add rows without paging; a table that
/// crosses the bottom margin is reported through `FormMetrics::overflow`.
pub fn render_form<C: PageCanvas + ?Sized>(
    canvas: &mut C,
    record: &ReimbursementRecord,
    layout: &FormLayout,
    qr: Option<&RgbImage>,
) -> Result<FormMetrics> {
    draw_binding_line(canvas, record, layout);
    draw_header(canvas, record, layout, qr)?;

    let columns = Columns::new(layout);
    let mut y = layout.table_top();

    y = draw_info_row(canvas, record, layout, y);
    y = draw_column_headers(canvas, layout, &columns, y);

    let style = TextStyle::centered(layout.fonts.detail);
    for leg in &record.legs {
        for (i, text) in leg_cells(leg).iter().enumerate() {
            canvas.cell(columns.span(i, i + 1, y, layout.rows.data), text, &style, &BORDER);
        }
        y += layout.rows.data;
    }

    let filler_rows = layout.min_rows.saturating_sub(record.legs.len());
    for _ in 0..filler_rows {
        for i in 0..COLUMN_COUNT {
            canvas.stroke_rect(columns.span(i, i + 1, y, layout.rows.data), &BORDER);
        }
        y += layout.rows.data;
    }

    y = draw_totals_row(canvas, record, layout, &columns, y);
    y = draw_amount_row(canvas, record, layout, &columns, y);
    y = draw_approval_row(canvas, layout, y);

    let overflow = y > layout.content_bottom();
    if overflow {
        log::warn!(
            "Form table ends at {:.1}pt, past the bottom margin at {:.1}pt ({} legs)",
            y,
            layout.content_bottom(),
            record.legs.len()
        );
    }

    Ok(FormMetrics {
        data_rows: record.legs.len(),
        filler_rows,
        table_bottom: y,
        overflow,
    })
}

fn draw_binding_line<C: PageCanvas + ?Sized>(
    canvas: &mut C,
    record: &ReimbursementRecord,
    layout: &FormLayout,
) {
    let (_, height) = canvas.page_size();
    let x = layout.binding_offset;
    let inset = height * 0.12;
    canvas.line((x, inset), (x, height - inset), &BINDING_LINE);

    let caption = format!(
        "----- -------{} ---- 装订线----------",
        record.header.company_name
    );
    let size = layout.fonts.binding;
    let origin = (x / 2.0, height / 2.0);
    let width = canvas.measure_text(&caption, size);

    canvas.save_state();
    canvas.rotate(-90.0, origin);
    canvas.fill_text(
        &caption,
        origin.0 - width / 2.0,
        origin.1 - size / 2.0,
        size,
        Color::DARK_GREY,
    );
    canvas.restore_state();
}

fn draw_header<C: PageCanvas + ?Sized>(
    canvas: &mut C,
    record: &ReimbursementRecord,
    layout: &FormLayout,
    qr: Option<&RgbImage>,
) -> Result<()> {
    let (page_width, _) = canvas.page_size();
    let top = layout.margins.top;
    let at = |fraction: f32| top + layout.header_height * fraction;

    if let Some(qr) = qr {
        canvas.image(
            qr,
            Frame::new(layout.table_left(), top, layout.qr_size, layout.qr_size),
        )?;
    }

    // Title and date are centered on the area right of the binding line
    let center = (page_width + layout.binding_offset) / 2.0;
    let title_width = canvas.measure_text(&layout.title, layout.fonts.title);
    canvas.fill_text(
        &layout.title,
        center - title_width / 2.0,
        at(0.13),
        layout.fonts.title,
        Color::BLACK,
    );
    let date_width = canvas.measure_text(&record.header.date, layout.fonts.date);
    canvas.fill_text(
        &record.header.date,
        center - date_width / 2.0,
        at(0.5),
        layout.fonts.date,
        Color::BLACK,
    );

    let total = record.totals.grand_total;
    let info = [
        format!("部门：{}", record.header.department),
        format!("页码：{}", record.header.page_label),
        format!("金额：{}元 / {}元", total, total),
    ];
    let size = layout.fonts.info;
    let block_width = info
        .iter()
        .map(|line| canvas.measure_text(line, size))
        .fold(0.0, f32::max);
    let right = page_width - layout.margins.right;
    for (line, fraction) in info.iter().zip([0.13, 0.33, 0.53]) {
        canvas.fill_text(line, right - block_width, at(fraction), size, Color::BLACK);
    }

    Ok(())
}

fn draw_info_row<C: PageCanvas + ?Sized>(
    canvas: &mut C,
    record: &ReimbursementRecord,
    layout: &FormLayout,
    y: f32,
) -> f32 {
    let header = &record.header;
    let texts = [
        "出差人",
        header.traveler.as_str(),
        "出差事由",
        header.reason.as_str(),
        "项目名称",
        header.project_name.as_deref().unwrap_or(""),
    ];

    let total: f32 = INFO_WEIGHTS.iter().sum();
    let style = TextStyle::centered(layout.fonts.cell);
    let mut x = layout.table_left();
    for (text, weight) in texts.iter().zip(INFO_WEIGHTS) {
        let width = weight / total * layout.table_width();
        canvas.cell(Frame::new(x, y, width, layout.rows.info), text, &style, &BORDER);
        x += width;
    }

    y + layout.rows.info
}

fn draw_column_headers<C: PageCanvas + ?Sized>(
    canvas: &mut C,
    layout: &FormLayout,
    columns: &Columns,
    y: f32,
) -> f32 {
    let row = layout.rows.header;
    let group_style = TextStyle::centered(layout.fonts.cell);
    let stacked_style = TextStyle::centered(layout.fonts.detail);

    // (first column, end column, label, spans both header rows)
    let groups: [(usize, usize, &str, bool); 8] = [
        (0, 2, "出发", false),
        (2, 4, "到达", false),
        (4, 6, "交通", false),
        (6, 7, "天\n数", true),
        (7, 9, "出差补贴", false),
        (9, 12, "其他费用金额", false),
        (12, 13, "小计", true),
        (13, 14, "单据\n张数", true),
    ];
    for (start, end, label, tall) in groups {
        let height = if tall { row * 2.0 } else { row };
        let style = if label.contains('\n') {
            &stacked_style
        } else {
            &group_style
        };
        canvas.cell(columns.span(start, end, y, height), label, style, &BORDER);
    }

    let detail_style = TextStyle::centered(layout.fonts.detail);
    let small_style = TextStyle::centered(layout.fonts.small);
    let sub_labels = [
        (0, "日期"),
        (1, "地点"),
        (2, "日期"),
        (3, "地点"),
        (4, "工具"),
        (5, "金额"),
        (7, "标准"),
        (8, "金额"),
        (9, "住宿"),
        (10, "市内\n交通"),
        (11, "其他"),
    ];
    for (column, label) in sub_labels {
        let style = if label.contains('\n') {
            &small_style
        } else {
            &detail_style
        };
        canvas.cell(columns.span(column, column + 1, y + row, row), label, style, &BORDER);
    }

    y + row * 2.0
}

/// Cell text for one leg, in column order
fn leg_cells(leg: &TripLeg) -> [String; COLUMN_COUNT] {
    [
        leg.departure_date.clone(),
        leg.departure_place.clone(),
        leg.arrival_date.clone(),
        leg.arrival_place.clone(),
        leg.transport.clone(),
        leg.transport_fee.to_string(),
        format!("{:.1}", leg.days),
        leg.per_diem_rate.to_string(),
        leg.per_diem_amount.to_string(),
        leg.accommodation.to_string(),
        leg.local_transport.to_string(),
        leg.other_fee.to_string(),
        leg.subtotal.to_string(),
        leg.receipts.clone().unwrap_or_default(),
    ]
}

fn draw_totals_row<C: PageCanvas + ?Sized>(
    canvas: &mut C,
    record: &ReimbursementRecord,
    layout: &FormLayout,
    columns: &Columns,
    y: f32,
) -> f32 {
    let height = layout.rows.totals;
    let totals = &record.totals;

    canvas.cell(
        columns.span(0, 4, y, height),
        "合    计",
        &TextStyle::centered(layout.fonts.cell),
        &BORDER,
    );

    let cells = [
        String::new(),
        totals.transport.to_string(),
        format!("{:.1}", totals.days),
        "--".to_string(),
        totals.per_diem.to_string(),
        totals.accommodation.to_string(),
        totals.local_transport.to_string(),
        totals.other.to_string(),
        totals.grand_total.to_string(),
        String::new(),
    ];
    let style = TextStyle::centered(layout.fonts.detail);
    for (offset, text) in cells.iter().enumerate() {
        let column = 4 + offset;
        canvas.cell(columns.span(column, column + 1, y, height), text, &style, &BORDER);
    }

    y + height
}

fn draw_amount_row<C: PageCanvas + ?Sized>(
    canvas: &mut C,
    record: &ReimbursementRecord,
    layout: &FormLayout,
    columns: &Columns,
    y: f32,
) -> f32 {
    let height = layout.rows.amount_in_words;
    let totals = &record.totals;
    let centered = TextStyle::centered(layout.fonts.cell);
    let filled = |amount: Option<Amount>| amount.map_or_else(|| BLANK.to_string(), |a| a.to_string());

    canvas.cell(columns.span(0, 2, y, height), "金额合计\n（大写）", &centered, &BORDER);
    canvas.cell(
        columns.span(2, 8, y, height),
        &format!("{}  ¥：{}", totals.amount_in_words, totals.grand_total),
        &TextStyle {
            align: HAlign::Left,
            ..centered
        },
        &BORDER,
    );
    canvas.cell(columns.span(8, 10, y, height), "预借金额", &centered, &BORDER);
    canvas.cell(
        columns.span(10, 12, y, height),
        &filled(totals.advance_amount),
        &centered,
        &BORDER,
    );
    canvas.cell(
        columns.span(12, 14, y, height),
        &format!("退/补金额\n{}", filled(totals.refund_amount)),
        &TextStyle::centered(layout.fonts.detail),
        &BORDER,
    );

    y + height
}

fn draw_approval_row<C: PageCanvas + ?Sized>(canvas: &mut C, layout: &FormLayout, y: f32) -> f32 {
    let height = layout.rows.approval;
    let width = layout.table_width() / APPROVERS.len() as f32;
    let style = TextStyle::centered(layout.fonts.cell);

    for (i, approver) in APPROVERS.iter().enumerate() {
        let x = layout.table_left() + i as f32 * width;
        canvas.cell(Frame::new(x, y, width, height), approver, &style, &BORDER);
    }

    y + height
}

// =============================================================================
// Output
// =============================================================================

fn draw_background<C: PageCanvas + ?Sized>(canvas: &mut C, config: &GeneratorConfig) -> Result<()> {
    if let Some(path) = &config.background {
        let template = image::open(path)?.to_rgb8();
        let (width, height) = canvas.page_size();
        canvas.image(&template, Frame::new(0.0, 0.0, width, height))?;
    }
    Ok(())
}

/// Render the form into PDF bytes
pub fn render_pdf_bytes(
    record: &ReimbursementRecord,
    layout: &FormLayout,
    config: &GeneratorConfig,
) -> Result<(Vec<u8>, FormMetrics)> {
    let (width, height) = layout.page_size();
    let mut canvas = PdfCanvas::new(&layout.title, width, height, config.fonts.load());

    draw_background(&mut canvas, config)?;
    let qr = qr_rgb(&record.header.code, config.qr_module_px)?;
    let metrics = render_form(&mut canvas, record, layout, Some(&qr))?;

    Ok((canvas.finish(), metrics))
}

/// Render the form into a standalone HTML document
pub fn render_html(
    record: &ReimbursementRecord,
    layout: &FormLayout,
    config: &GeneratorConfig,
) -> Result<(String, FormMetrics)> {
    let (width, height) = layout.page_size();
    let mut canvas = HtmlCanvas::new(&layout.title, width, height);

    draw_background(&mut canvas, config)?;
    let qr = qr_rgb(&record.header.code, config.qr_module_px)?;
    let metrics = render_form(&mut canvas, record, layout, Some(&qr))?;

    Ok((canvas.finish(), metrics))
}

/// Generate a single-page PDF form at `output`
pub async fn generate_pdf(
    record: &ReimbursementRecord,
    layout: &FormLayout,
    config: &GeneratorConfig,
    output: impl AsRef<Path>,
) -> Result<FormMetrics> {
    let record = record.clone();
    let layout = layout.clone();
    let config = config.clone();
    let output = output.as_ref().to_owned();

    let (bytes, metrics) =
        tokio::task::spawn_blocking(move || render_pdf_bytes(&record, &layout, &config)).await??;

    tokio::fs::write(&output, bytes).await?;
    log::info!("Wrote form to {}", output.display());

    Ok(metrics)
}

/// Generate the form as HTML at `output`
pub async fn generate_html(
    record: &ReimbursementRecord,
    layout: &FormLayout,
    config: &GeneratorConfig,
    output: impl AsRef<Path>,
) -> Result<FormMetrics> {
    let record = record.clone();
    let layout = layout.clone();
    let config = config.clone();
    let output = output.as_ref().to_owned();

    let (html, metrics) =
        tokio::task::spawn_blocking(move || render_html(&record, &layout, &config)).await??;

    tokio::fs::write(&output, html).await?;
    log::info!("Wrote HTML form to {}", output.display());

    Ok(metrics)
}

/// Generate HTML next to `output` and print it to PDF with a headless browser
pub async fn generate_browser_pdf(
    record: &ReimbursementRecord,
    layout: &FormLayout,
    config: &GeneratorConfig,
    output: impl AsRef<Path>,
    browser: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<FormMetrics> {
    let output = output.as_ref();
    let html_path = output.with_extension("html");

    let metrics = generate_html(record, layout, config, &html_path).await?;
    print_html_to_pdf(
        &html_path,
        output,
        browser,
        timeout.unwrap_or(DEFAULT_BROWSER_TIMEOUT),
    )
    .await?;
    log::info!("Printed form to {}", output.display());

    Ok(metrics)
}
