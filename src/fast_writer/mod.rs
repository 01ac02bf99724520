//! Fast XLSX encoding optimized for streaming
//!
//! This module turns rows into a finished XLSX package:
//! - Direct XML generation into a reusable buffer
//! - On-the-fly deflate into the ZIP container, ZIP64 for large sheets
//! - Any `Write + Seek` as output, so the package can live in memory

pub mod workbook;
pub mod worksheet;

pub use workbook::{WorkbookWriter, MAX_COLS, MAX_ROWS};
pub use worksheet::RowEncoder;
