//! Bulk builder for collections already in memory

use super::ExcelBuilder;
use crate::config::ExcelConfig;
use crate::error::{ExcelError, Result};
use crate::render::{ExcelRecord, FieldSelection, RecordRenderer, RowRenderer};
use crate::sink::{DocumentSink, Workbook, XlsxSink};
use crate::types::RowBatch;
use tracing::debug;

/// Records rendered per sink call when the sink has no window
const BULK_CHUNK: usize = 1024;

/// Builds a workbook from a complete collection, on the calling thread
///
/// No queue and no consumer task are involved; use
/// [`StreamExcelBuilder`](super::StreamExcelBuilder) when the data arrives
/// in pages.
///
/// # Examples
///
/// ```no_run
/// # use excelpipe::{CellValue, Column, ExcelRecord, FieldError};
/// # struct Point { x: i64 }
/// # impl ExcelRecord for Point {
/// #     fn columns() -> Vec<Column> { vec![Column::new("x", "X")] }
/// #     fn value(&self, _: &str) -> Result<CellValue, FieldError> { Ok(self.x.into()) }
/// # }
/// use excelpipe::{DefaultExcelBuilder, ExcelBuilder, ExcelConfig};
///
/// # fn main() -> excelpipe::Result<()> {
/// let points = vec![Point { x: 1 }, Point { x: 2 }];
/// let workbook = DefaultExcelBuilder::of(ExcelConfig::default(), points).build()?;
/// assert_eq!(workbook.row_count(), 3);
/// # Ok(())
/// # }
/// ```
pub struct DefaultExcelBuilder<T, R = RecordRenderer<T>>
where
    R: RowRenderer<T>,
{
    config: ExcelConfig,
    renderer: R,
    records: Option<Vec<T>>,
    groups: Vec<String>,
}

impl<T: ExcelRecord> DefaultExcelBuilder<T> {
    pub fn of(config: ExcelConfig, records: Vec<T>) -> Self {
        Self::with_renderer(config, records, RecordRenderer::new())
    }
}

impl<T: ExcelRecord, R: RowRenderer<T>> DefaultExcelBuilder<T, R> {
    pub fn with_renderer(config: ExcelConfig, records: Vec<T>, renderer: R) -> Self {
        DefaultExcelBuilder {
            config,
            renderer,
            records: Some(records),
            groups: Vec::new(),
        }
    }

    /// Export only the columns of these groups
    pub fn groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    fn write_all(&self, records: Vec<T>) -> Result<Workbook> {
        self.config.validate()?;
        let groups: Vec<&str> = self.groups.iter().map(String::as_str).collect();
        let selection = FieldSelection::of::<T>(&groups);
        let mut sink = XlsxSink::new(&self.config)?;

        if self.config.header() {
            if let Some(header) = self.renderer.header(&selection) {
                sink.append(RowBatch::new(vec![header]))?;
            }
        }

        let chunk = self.config.window_size().unwrap_or(BULK_CHUNK).max(1);
        for records in records.chunks(chunk) {
            let rows = self.renderer.render(records, &selection)?;
            sink.append(RowBatch::new(rows))?;
        }

        let workbook = sink.finalize()?;
        debug!(rows = workbook.row_count(), "bulk export finished");
        Ok(workbook)
    }
}

impl<T: ExcelRecord, R: RowRenderer<T>> ExcelBuilder for DefaultExcelBuilder<T, R> {
    type Artifact = Workbook;

    fn config(&self) -> &ExcelConfig {
        &self.config
    }

    fn build(&mut self) -> Result<Workbook> {
        let records = self
            .records
            .take()
            .ok_or_else(|| ExcelError::usage("build called twice"))?;
        self.write_all(records)
    }
}
