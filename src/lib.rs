//! # Employee Sheet
//!
//! Normalizes spreadsheets that stack several company-specific employee tables in
//! one sheet, then filters the result by city of work and job title.
//!
//! ## Features
//!
//! - **Spreadsheet reading**: first sheet of Office Open XML (`.xlsx`, `.xlsm`) and
//!   OpenDocument (`.ods`) documents, from a path or an uploaded byte buffer
//! - **Block extraction**: company, header and total marker rows delimit blocks that
//!   are relabelled with their header and tagged with the company name
//! - **Filtering**: case-insensitive city set match and job title substring match,
//!   plus the option lists for both filters
//! - **Export**: CSV or single-sheet `.xlsx` with fixed download names
//!
//! ## Example
//!
//! ```no_run
//! use employee_sheet::{run, ExtractOptions, FilterCriteria, Outcome, SheetSource};
//!
//! let source = SheetSource::from_path("empregados.xlsx");
//! let criteria = FilterCriteria::new().with_city("Recife").with_job_title("analista");
//! match run(&source, &criteria, &ExtractOptions::default())? {
//!     Outcome::Records { table, .. } => println!("{} registros", table.len()),
//!     Outcome::NoData(_) => println!("Nenhum dado encontrado na planilha."),
//! }
//! # Ok::<(), employee_sheet::EmployeeSheetError>(())
//! ```
pub mod error;
pub mod export;
pub mod extract;
pub mod filter;
mod helpers;
pub mod pipeline;
pub mod spreadsheet;

pub use error::EmployeeSheetError;
pub use export::ExportFormat;
pub use extract::extract_blocks;
pub use extract::Diagnostics;
pub use extract::ExtractOptions;
pub use extract::Extraction;
pub use extract::Markers;
pub use extract::Record;
pub use extract::Table;
pub use filter::FilterCriteria;
pub use helpers::reader::SheetSource;
pub use pipeline::load;
pub use pipeline::run;
pub use pipeline::select;
pub use pipeline::Outcome;
pub use spreadsheet::cell::CellValue;
pub use spreadsheet::read_first_sheet;
pub use spreadsheet::sheet::Sheet;
