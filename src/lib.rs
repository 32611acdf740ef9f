//! xlsxcsv - Pure-Rust Excel workbook to per-worksheet CSV exporter
//!
//! This crate reads Excel workbooks (XLSX) and writes every worksheet to its own
//! CSV file. A single workbook or a whole directory tree of workbooks can be
//! exported in one run. A single workbook is written directly into the export
//! root; in directory mode each workbook gets its own directory under it.
//!
//! ```text
//! Exports/            <- Budget.xlsx
//! ├── Summary.csv
//! └── Q1.csv
//!
//! Exports/            <- reports/ containing 2024/Budget.xlsx
//! └── 2024/
//!     └── Budget/
//!         ├── Summary.csv
//!         └── Q1.csv
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsxcsv::{ExportJob, ExporterBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create an exporter with default settings
//!     let exporter = ExporterBuilder::new().build()?;
//!
//!     // Resolve the input (a .xlsx file or a directory) against the export root
//!     let job = ExportJob::resolve("Budget.xlsx", xlsxcsv::DEFAULT_EXPORT_ROOT)?;
//!
//!     // Write one CSV per worksheet
//!     let report = exporter.export(&job)?;
//!     println!("{} CSV files written", report.written_count());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use xlsxcsv::{DateFormat, ExportJob, ExporterBuilder, OverwritePolicy, SheetSelector};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = ExporterBuilder::new()
//!         .with_sheet_selector(SheetSelector::Names(vec!["Summary".to_string()]))
//!         .with_date_format(DateFormat::Custom("%d/%m/%Y".to_string()))
//!         .with_overwrite_policy(OverwritePolicy::Skip)
//!         .with_delimiter(';')
//!         .trim_empty(true)
//!         .build()?;
//!
//!     let job = ExportJob::resolve("reports", "out")?;
//!     let report = exporter.export(&job)?;
//!     for failure in &report.failures {
//!         eprintln!("{}: {}", failure.source.display(), failure.error);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Convert to Strings
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxcsv::ExporterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = ExporterBuilder::new().build()?;
//!     let input = File::open("Budget.xlsx")?;
//!
//!     for (sheet, csv) in exporter.convert_to_strings(input)? {
//!         println!("# {}\n{}", sheet, csv);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
pub mod cli;
mod error;
mod formatter;
mod grid;
mod job;
mod output;
mod parser;
mod report;
mod security;
mod types;

// 公開API
pub use api::{DateFormat, FormulaMode, OverwritePolicy, SheetSelector};
pub use builder::{Exporter, ExporterBuilder};
pub use error::Xlsx2CsvError;
pub use job::{is_workbook_path, ExportJob, JobKind, WorkbookTarget, DEFAULT_EXPORT_ROOT};
pub use report::{ExportReport, SheetReport, SheetStatus, WorkbookFailure, WorkbookReport};
