//! Streaming record builder

use super::ExcelBuilder;
use crate::config::ExcelConfig;
use crate::error::Result;
use crate::render::{ExcelRecord, FieldSelection, RecordRenderer, RowRenderer};
use crate::sink::{Workbook, XlsxSink};
use crate::stream::{DriverState, StreamDriver};
use crate::types::RowBatch;
use tracing::debug;

/// Streams records of type `T` into an XLSX workbook
///
/// Records are rendered on the calling thread; a single consumer task
/// commits the rows to the workbook. Memory stays bounded by the queue
/// capacity plus the sink's row window.
///
/// # Examples
///
/// ```no_run
/// use excelpipe::{CellValue, Column, ExcelConfig, ExcelRecord, FieldError, StreamExcelBuilder};
///
/// struct Order { id: i64, total: f64 }
///
/// impl ExcelRecord for Order {
///     fn columns() -> Vec<Column> {
///         vec![Column::new("id", "Order"), Column::new("total", "Total")]
///     }
///     fn value(&self, key: &str) -> Result<CellValue, FieldError> {
///         match key {
///             "id" => Ok(self.id.into()),
///             "total" => Ok(self.total.into()),
///             _ => Err(FieldError::unknown(key)),
///         }
///     }
/// }
///
/// # fn main() -> excelpipe::Result<()> {
/// let mut builder = StreamExcelBuilder::<Order>::of(ExcelConfig::default());
/// builder.start(&[])?;
/// for page in 0..100 {
///     let orders: Vec<Order> = (0..1000)
///         .map(|i| Order { id: page * 1000 + i, total: 9.99 })
///         .collect();
///     builder.append(&orders)?;
/// }
/// let workbook = builder.build()?;
/// workbook.save("orders.xlsx")?;
/// # Ok(())
/// # }
/// ```
pub struct StreamExcelBuilder<T, R = RecordRenderer<T>>
where
    R: RowRenderer<T>,
{
    config: ExcelConfig,
    renderer: R,
    selection: FieldSelection,
    driver: StreamDriver<XlsxSink>,
    _record: std::marker::PhantomData<fn(&T)>,
}

impl<T, R: RowRenderer<T>> std::fmt::Debug for StreamExcelBuilder<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamExcelBuilder")
            .field("config", &self.config)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl<T: ExcelRecord> StreamExcelBuilder<T> {
    /// Builder for `T` using the default record renderer
    pub fn of(config: ExcelConfig) -> Self {
        Self::with_renderer(config, RecordRenderer::new())
    }
}

impl<T: ExcelRecord, R: RowRenderer<T>> StreamExcelBuilder<T, R> {
    /// Builder for `T` with a custom renderer
    pub fn with_renderer(config: ExcelConfig, renderer: R) -> Self {
        StreamExcelBuilder {
            driver: StreamDriver::new(config.clone()),
            config,
            renderer,
            selection: FieldSelection::default(),
            _record: std::marker::PhantomData,
        }
    }

    /// Start streaming with the configured queue capacity
    ///
    /// Selects the columns of `groups`, creates the workbook shell, spawns
    /// the consumer and enqueues the header row.
    pub fn start(&mut self, groups: &[&str]) -> Result<&mut Self> {
        self.driver.ensure_unstarted()?;
        self.config.validate()?;
        let selection = FieldSelection::of::<T>(groups);
        let sink = XlsxSink::new(&self.config)?;
        let header = if self.config.header() {
            self.renderer
                .header(&selection)
                .map(|row| RowBatch::new(vec![row]))
        } else {
            None
        };

        debug!(
            columns = selection.len(),
            groups = ?groups,
            header = header.is_some(),
            "starting stream export"
        );
        self.driver.start(sink, header)?;
        self.selection = selection;
        Ok(self)
    }

    /// Start streaming with an explicit queue capacity
    pub fn start_with_capacity(&mut self, capacity: usize, groups: &[&str]) -> Result<&mut Self> {
        self.driver.ensure_unstarted()?;
        self.config = self.config.with_queue_capacity(capacity);
        self.driver = StreamDriver::new(self.config.clone());
        self.start(groups)
    }

    /// Render `records` and queue them for writing
    ///
    /// An empty slice is a no-op. Blocks while the queue is full. A render
    /// failure is returned here and nothing from this call is queued.
    pub fn append(&mut self, records: &[T]) -> Result<()> {
        self.driver.ensure_running("append")?;
        if records.is_empty() {
            return Ok(());
        }
        let rows = self.renderer.render(records, &self.selection)?;
        self.driver.append(RowBatch::new(rows))
    }

    /// Wait for every queued row to be written and return the workbook
    pub fn build(&mut self) -> Result<Workbook> {
        self.driver.build()
    }

    pub fn state(&self) -> DriverState {
        self.driver.state()
    }

    /// Columns chosen at start
    pub fn selection(&self) -> &FieldSelection {
        &self.selection
    }

    /// Rows queued so far, header included
    pub fn rows_appended(&self) -> u64 {
        self.driver.rows_enqueued()
    }
}

impl<T: ExcelRecord, R: RowRenderer<T>> ExcelBuilder for StreamExcelBuilder<T, R> {
    type Artifact = Workbook;

    fn config(&self) -> &ExcelConfig {
        &self.config
    }

    fn build(&mut self) -> Result<Workbook> {
        self.driver.build()
    }
}
