//! Document sinks: where committed rows end up
//!
//! A sink is owned by exactly one consumer task, so implementations need no
//! internal synchronization. `append` is called once per batch in commit
//! order and `finalize` exactly once, last.

mod artifact;
mod xlsx;

pub use artifact::Workbook;
pub use xlsx::XlsxSink;

use crate::error::Result;
use crate::types::RowBatch;

/// Append-only destination for row batches
pub trait DocumentSink: Send + 'static {
    /// Finished document handed back by `finalize`
    type Artifact: Send + 'static;

    /// Commit one batch of rows, in order
    fn append(&mut self, batch: RowBatch) -> Result<()>;

    /// Complete the document and release its resources
    fn finalize(self) -> Result<Self::Artifact>;
}
