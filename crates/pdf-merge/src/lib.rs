pub mod constants;
mod copy;
pub mod inspect;
mod io;
mod merge;
mod normalize;
mod options;
pub mod page;
pub mod repair;
mod types;

pub use inspect::{PdfComparison, PdfReport, compare_files, inspect_document, inspect_file};
pub use io::{document_to_bytes, load_pdf, save_pdf};
pub use merge::{merge_documents, merge_pdfs};
pub use normalize::compute_placement;
pub use options::*;
pub use repair::{RepairReport, RepairStrategy, ReloadProbe, reload_probe, repair_document};
pub use types::*;
