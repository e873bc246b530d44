//! Minimal xlsx (OOXML spreadsheet) support on top of `zip` and
//! `quick-xml`: a writer for exports and templates, and a reader for the
//! first worksheet of an uploaded workbook.

pub mod reader;
pub mod writer;

pub use reader::{read_first_sheet, SheetRow};
pub use writer::{Cell, Workbook, Worksheet};

pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
