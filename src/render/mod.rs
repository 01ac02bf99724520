//! Turning records into rows
//!
//! Rendering runs on the producer's thread, inside `append`, so a renderer
//! must be usable from whichever thread calls it (`Send + Sync`) and must not
//! keep state between calls.

mod record;

pub use record::{Column, ExcelRecord, FieldError, FieldSelection};

use crate::error::{ExcelError, Result};
use crate::types::{CellStyle, Row, StyledCell};
use std::marker::PhantomData;

/// Pure transform from a batch of records to ordered rows
pub trait RowRenderer<T>: Send + Sync {
    /// Header row for the selection; `None` when there is nothing to show
    fn header(&self, selection: &FieldSelection) -> Option<Row>;

    /// One row per record, in input order
    fn render(&self, records: &[T], selection: &FieldSelection) -> Result<Vec<Row>>;
}

/// Default renderer for [`ExcelRecord`] types
///
/// Header cells are bold; body cells take the style of their column.
pub struct RecordRenderer<T> {
    header_style: CellStyle,
    _record: PhantomData<fn(&T)>,
}

impl<T> RecordRenderer<T> {
    pub fn new() -> Self {
        RecordRenderer {
            header_style: CellStyle::HeaderBold,
            _record: PhantomData,
        }
    }

    pub fn with_header_style(mut self, style: CellStyle) -> Self {
        self.header_style = style;
        self
    }
}

impl<T> Default for RecordRenderer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ExcelRecord> RowRenderer<T> for RecordRenderer<T> {
    fn header(&self, selection: &FieldSelection) -> Option<Row> {
        if selection.is_empty() {
            return None;
        }
        Some(Row::with_style(selection.titles(), self.header_style))
    }

    fn render(&self, records: &[T], selection: &FieldSelection) -> Result<Vec<Row>> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                selection
                    .columns()
                    .iter()
                    .map(|column| {
                        record
                            .value(&column.key)
                            .map(|value| StyledCell::new(value, selection.style_of(&column.key)))
                            .map_err(|e| ExcelError::RenderError {
                                record: index,
                                field: column.key.clone(),
                                message: e.to_string(),
                            })
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Row::new)
            })
            .collect()
    }
}
