pub mod canvas;
mod fonts;
mod form;
mod grid;
mod layout;
mod numerals;
mod qr;
mod record;
mod types;

pub use fonts::FontSource;
pub use form::{
    FormMetrics, GeneratorConfig, generate_browser_pdf, generate_html, generate_pdf, render_form,
    render_html, render_pdf_bytes,
};
pub use grid::{grid_pdf_bytes, render_grid};
pub use layout::*;
pub use numerals::amount_in_words;
pub use qr::{qr_image, qr_rgb};
pub use record::*;
pub use types::*;
