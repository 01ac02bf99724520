//! XLSX sink with an optional resident-row window

use super::{DocumentSink, Workbook};
use crate::config::ExcelConfig;
use crate::error::Result;
use crate::fast_writer::WorkbookWriter;
use crate::types::{Row, RowBatch};
use std::collections::VecDeque;
use std::io::Cursor;
use tracing::trace;

/// Sink that materializes rows into a single-sheet XLSX workbook
///
/// With a window of K rows, only the last K appended rows stay resident as
/// `Row` values; older rows are encoded and compressed immediately. Without
/// a window every row stays resident until `finalize`.
pub struct XlsxSink {
    writer: WorkbookWriter<Cursor<Vec<u8>>>,
    resident: VecDeque<Row>,
    window_size: Option<usize>,
}

impl XlsxSink {
    /// Create the document shell for the configured format
    pub fn new(config: &ExcelConfig) -> Result<Self> {
        let writer = WorkbookWriter::new(
            Cursor::new(Vec::with_capacity(64 * 1024)),
            config.sheet_name(),
            config.compression_level(),
        )?;
        let window_size = config.window_size();

        Ok(XlsxSink {
            writer,
            resident: VecDeque::with_capacity(window_size.unwrap_or(1024)),
            window_size,
        })
    }

    /// Rows currently held as row objects
    pub fn resident_rows(&self) -> usize {
        self.resident.len()
    }

    /// Rows already encoded into the document
    pub fn flushed_rows(&self) -> u32 {
        self.writer.rows_written()
    }

    fn flush_overflow(&mut self) -> Result<()> {
        let Some(window) = self.window_size else {
            return Ok(());
        };
        while self.resident.len() > window {
            if let Some(row) = self.resident.pop_front() {
                self.writer.write_row(&row)?;
            }
        }
        Ok(())
    }
}

impl DocumentSink for XlsxSink {
    type Artifact = Workbook;

    fn append(&mut self, batch: RowBatch) -> Result<()> {
        self.resident.extend(batch);
        self.flush_overflow()?;
        trace!(
            resident = self.resident.len(),
            flushed = self.writer.rows_written(),
            "rows committed"
        );
        Ok(())
    }

    fn finalize(mut self) -> Result<Workbook> {
        while let Some(row) = self.resident.pop_front() {
            self.writer.write_row(&row)?;
        }
        let row_count = self.writer.rows_written();
        let sheet_name = self.writer.sheet_name().to_string();
        let bytes = self.writer.close()?.into_inner();
        Ok(Workbook::new(bytes, sheet_name, row_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkbookType;

    fn batch(n: usize) -> RowBatch {
        (0..n)
            .map(|i| vec![i as i64].into_iter().collect::<Row>())
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_window_bounds_resident_rows() -> Result<()> {
        let config = ExcelConfig::builder().with_window_size(3).build()?;
        let mut sink = XlsxSink::new(&config)?;

        sink.append(batch(2))?;
        assert_eq!(sink.resident_rows(), 2);
        assert_eq!(sink.flushed_rows(), 0);

        sink.append(batch(5))?;
        assert_eq!(sink.resident_rows(), 3);
        assert_eq!(sink.flushed_rows(), 4);

        let workbook = sink.finalize()?;
        assert_eq!(workbook.row_count(), 7);
        Ok(())
    }

    #[test]
    fn test_too_wide_row_is_rejected() -> Result<()> {
        let wide = || -> RowBatch {
            vec![(0..=crate::fast_writer::MAX_COLS as i64).collect::<Row>()].into()
        };

        // Windowed: fails when the row leaves the window
        let config = ExcelConfig::builder().with_window_size(1).build()?;
        let mut sink = XlsxSink::new(&config)?;
        sink.append(wide())?;
        let err = sink.append(batch(1)).unwrap_err();
        assert!(err.is_sink());

        // In memory: fails at finalize
        let config = ExcelConfig::builder()
            .with_workbook_type(WorkbookType::InMemoryXlsx)
            .build()?;
        let mut sink = XlsxSink::new(&config)?;
        sink.append(wide())?;
        assert!(sink.finalize().unwrap_err().is_sink());
        Ok(())
    }

    #[test]
    fn test_in_memory_keeps_every_row() -> Result<()> {
        let config = ExcelConfig::builder()
            .with_workbook_type(WorkbookType::InMemoryXlsx)
            .build()?;
        let mut sink = XlsxSink::new(&config)?;

        sink.append(batch(250))?;
        assert_eq!(sink.resident_rows(), 250);
        assert_eq!(sink.flushed_rows(), 0);

        let workbook = sink.finalize()?;
        assert_eq!(workbook.row_count(), 250);
        assert_eq!(workbook.sheet_name(), "Sheet1");
        Ok(())
    }
}
