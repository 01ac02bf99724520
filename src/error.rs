//! Error types for the excelpipe library

use std::time::Duration;
use thiserror::Error;

/// Result type alias for excelpipe operations
pub type Result<T> = std::result::Result<T, ExcelError>;

/// Main error type for all pipeline operations
#[derive(Error, Debug)]
pub enum ExcelError {
    /// API misuse: wrong lifecycle order, second build, and the like
    #[error("Invalid usage: {0}")]
    Usage(String),

    /// Configuration rejected when the pipeline started
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A record could not be turned into a row
    #[error("Failed to render record {record}, field '{field}': {message}")]
    RenderError {
        record: usize,
        field: String,
        message: String,
    },

    /// The document sink failed to accept rows or to finalize
    #[error("Failed to write workbook: {0}")]
    WriteError(String),

    /// Error raised while committing a specific batch
    #[error("Failed to commit batch {batch}: {source}")]
    BatchError {
        batch: u64,
        #[source]
        source: Box<ExcelError>,
    },

    /// The consumer did not finish before the configured deadline
    #[error("Build did not complete within {0:?}")]
    BuildTimeout(Duration),

    /// The consumer task went away without reporting a result
    #[error("Consumer task unavailable: {0}")]
    WorkerUnavailable(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ExcelError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        ExcelError::Usage(message.into())
    }

    /// True for lifecycle misuse and rejected configuration
    pub fn is_usage(&self) -> bool {
        matches!(self, ExcelError::Usage(_) | ExcelError::InvalidConfig(_))
    }

    /// True when a record failed to render on the producer side
    pub fn is_render(&self) -> bool {
        matches!(self, ExcelError::RenderError { .. })
    }

    /// True when the failure happened inside the document sink
    pub fn is_sink(&self) -> bool {
        match self {
            ExcelError::WriteError(_) | ExcelError::IoError(_) => true,
            ExcelError::BatchError { source, .. } => source.is_sink(),
            _ => false,
        }
    }
}

impl From<zip::result::ZipError> for ExcelError {
    fn from(err: zip::result::ZipError) -> Self {
        ExcelError::WriteError(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for ExcelError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        ExcelError::WorkerUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ExcelError::usage("append before start").is_usage());
        let config = ExcelError::InvalidConfig("queue capacity must be at least 1".to_string());
        assert!(config.is_usage());
        assert!(!config.is_sink());

        let render = ExcelError::RenderError {
            record: 3,
            field: "age".to_string(),
            message: "not a number".to_string(),
        };
        assert!(render.is_render());
        assert!(!render.is_sink());

        let nested = ExcelError::BatchError {
            batch: 2,
            source: Box::new(ExcelError::WriteError("disk full".to_string())),
        };
        assert!(nested.is_sink());
        assert_eq!(
            nested.to_string(),
            "Failed to commit batch 2: Failed to write workbook: disk full"
        );
    }
}
