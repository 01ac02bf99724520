//! Record-level builders
//!
//! [`StreamExcelBuilder`] accepts records in batches while a consumer task
//! writes them; [`DefaultExcelBuilder`] takes a complete collection up front.
//! Both are single use and share the [`ExcelBuilder`] capability.

mod default;
mod stream;

pub use default::DefaultExcelBuilder;
pub use stream::StreamExcelBuilder;

use crate::config::ExcelConfig;
use crate::error::Result;

/// Something that produces a finished document exactly once
pub trait ExcelBuilder {
    type Artifact;

    /// Configuration the document is built with
    fn config(&self) -> &ExcelConfig;

    /// Produce the artifact; a second call is a usage error
    fn build(&mut self) -> Result<Self::Artifact>;
}
