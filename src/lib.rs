//! # excelpipe
//!
//! Stream large result sets into an XLSX workbook with bounded memory.
//!
//! ## Features
//!
//! - **Bounded handoff**: the producer blocks when the consumer falls behind,
//!   so memory never grows with the row count
//! - **Single writer**: one consumer task owns the document, no locking
//! - **Row window**: only the last N rows stay resident as row objects
//! - **Lifecycle checks**: misuse (append before start, building twice) fails
//!   fast with a usage error
//! - **Explicit execution context**: bring your own rayon pool or use the
//!   default one sized to the host
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use excelpipe::{CellValue, Column, ExcelConfig, ExcelRecord, FieldError, StreamExcelBuilder};
//!
//! struct Employee {
//!     name: String,
//!     salary: f64,
//! }
//!
//! impl ExcelRecord for Employee {
//!     fn columns() -> Vec<Column> {
//!         vec![
//!             Column::new("name", "Name"),
//!             Column::new("salary", "Salary").with_groups(&["finance"]),
//!         ]
//!     }
//!
//!     fn value(&self, key: &str) -> Result<CellValue, FieldError> {
//!         match key {
//!             "name" => Ok(self.name.clone().into()),
//!             "salary" => Ok(self.salary.into()),
//!             _ => Err(FieldError::unknown(key)),
//!         }
//!     }
//! }
//!
//! # fn fetch_page(_: usize) -> Vec<Employee> { Vec::new() }
//! # fn main() -> excelpipe::Result<()> {
//! let config = ExcelConfig::builder()
//!     .with_window_size(200)
//!     .with_queue_capacity(4)
//!     .build()?;
//!
//! let mut builder = StreamExcelBuilder::<Employee>::of(config);
//! builder.start(&["finance"])?;
//! for page in 0..50 {
//!     builder.append(&fetch_page(page))?;
//! }
//! let workbook = builder.build()?;
//! workbook.save("employees.xlsx")?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod fast_writer;
pub mod render;
pub mod sink;
pub mod stream;
pub mod types;

pub use builder::{DefaultExcelBuilder, ExcelBuilder, StreamExcelBuilder};
pub use config::{ExcelConfig, ExcelConfigBuilder, ExecutionContext, WindowProfile, WorkbookType};
pub use error::{ExcelError, Result};
pub use render::{Column, ExcelRecord, FieldError, FieldSelection, RecordRenderer, RowRenderer};
pub use sink::{DocumentSink, Workbook, XlsxSink};
pub use stream::{Completion, DriverState, StreamDriver};
pub use types::{CellStyle, CellValue, Row, RowBatch, StyledCell};
