//! XLSX (Office Open XML) tabular source for slide-deck mail merge.
//!
//! Reads the first worksheet of a workbook: row 1 is the header row, every
//! row below it is data.

pub mod reader;

pub use reader::{read_table, XlsxReader};
