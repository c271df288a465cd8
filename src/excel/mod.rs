//! Excel persistence for the in-memory workbook
//!
//! - Import: Excel (.xlsx) → [`Workbook`](crate::workbook::Workbook) via calamine,
//!   with cell styles read from the package parts
//! - Export: [`Workbook`](crate::workbook::Workbook) → Excel (.xlsx) via rust_xlsxwriter

mod exporter;
mod importer;
mod styles;

pub use exporter::ExcelExporter;
pub use importer::ExcelImporter;
pub use styles::{PackageStyles, FIRST_CUSTOM_FORMAT_ID};
