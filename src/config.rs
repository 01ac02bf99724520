//! Pipeline configuration
//!
//! An [`ExcelConfig`] is assembled once with [`ExcelConfigBuilder`] and is
//! immutable afterwards. It is validated when a pipeline starts.

use crate::error::{ExcelError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Rows kept resident by the streaming sink when nothing else is configured
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Default sheet name for the generated worksheet
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Characters Excel rejects in sheet names
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Number of parallel execution units on this host, at least 1
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Document format produced by the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WorkbookType {
    /// Row-windowed XLSX: only the last `window_size` rows stay in memory
    #[default]
    StreamingXlsx,
    /// Every row is held in memory until the workbook is finalized
    InMemoryXlsx,
}

/// Window size presets for different memory budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowProfile {
    /// Small pods (< 512MB): 50 resident rows
    Low,
    /// Medium pods (512MB-1GB): 100 resident rows
    Medium,
    /// Large pods (> 1GB): 500 resident rows
    High,
    /// Explicit window size
    Custom(usize),
}

impl WindowProfile {
    /// Pick a profile from a memory limit in MB
    pub fn from_memory_mb(memory_mb: usize) -> Self {
        if memory_mb < 512 {
            WindowProfile::Low
        } else if memory_mb < 1024 {
            WindowProfile::Medium
        } else {
            WindowProfile::High
        }
    }

    /// Detect from the `EXCELPIPE_MEMORY_LIMIT_MB` environment variable
    pub fn from_env() -> Self {
        std::env::var("EXCELPIPE_MEMORY_LIMIT_MB")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .map(Self::from_memory_mb)
            .unwrap_or(WindowProfile::Medium)
    }

    /// Rows kept resident for this profile
    pub fn window_size(&self) -> usize {
        match self {
            WindowProfile::Low => 50,
            WindowProfile::Medium => DEFAULT_WINDOW_SIZE,
            WindowProfile::High => 500,
            WindowProfile::Custom(size) => *size,
        }
    }
}

/// Where the consumer task runs
///
/// `Default` creates a dedicated rayon pool sized to the available
/// parallelism of the host when the pipeline starts. `Pool` runs the
/// consumer on a pool owned by the caller.
#[derive(Debug, Clone, Default)]
pub enum ExecutionContext {
    #[default]
    Default,
    Pool(Arc<ThreadPool>),
}

impl ExecutionContext {
    pub(crate) fn resolve(&self) -> Result<Arc<ThreadPool>> {
        match self {
            ExecutionContext::Pool(pool) => Ok(Arc::clone(pool)),
            ExecutionContext::Default => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(available_parallelism())
                    .thread_name(|i| format!("excelpipe-consumer-{}", i))
                    .build()?;
                Ok(Arc::new(pool))
            }
        }
    }
}

/// Immutable pipeline configuration
#[derive(Debug, Clone)]
pub struct ExcelConfig {
    workbook_type: WorkbookType,
    window_size: usize,
    queue_capacity: usize,
    sheet_name: String,
    compression_level: u32,
    build_timeout: Option<Duration>,
    header: bool,
    execution: ExecutionContext,
}

impl Default for ExcelConfig {
    fn default() -> Self {
        ExcelConfig {
            workbook_type: WorkbookType::default(),
            window_size: DEFAULT_WINDOW_SIZE,
            queue_capacity: available_parallelism(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            compression_level: 6,
            build_timeout: None,
            header: true,
            execution: ExecutionContext::default(),
        }
    }
}

impl ExcelConfig {
    /// Start a builder from the defaults
    pub fn builder() -> ExcelConfigBuilder {
        ExcelConfigBuilder::default()
    }

    pub fn workbook_type(&self) -> WorkbookType {
        self.workbook_type
    }

    /// Rows kept resident by the streaming sink; `None` for in-memory workbooks
    pub fn window_size(&self) -> Option<usize> {
        match self.workbook_type {
            WorkbookType::StreamingXlsx => Some(self.window_size),
            WorkbookType::InMemoryXlsx => None,
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    /// Deadline for `build()`; `None` waits indefinitely
    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout
    }

    /// Whether a header row is rendered at start
    pub fn header(&self) -> bool {
        self.header
    }

    pub fn execution(&self) -> &ExecutionContext {
        &self.execution
    }

    /// Copy of this configuration with another queue capacity
    pub(crate) fn with_queue_capacity(&self, capacity: usize) -> Self {
        ExcelConfig {
            queue_capacity: capacity,
            ..self.clone()
        }
    }

    /// Check every setting once, before any work is done
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(ExcelError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        if self.workbook_type == WorkbookType::StreamingXlsx && self.window_size == 0 {
            return Err(ExcelError::InvalidConfig(
                "window size must be at least 1 for streaming workbooks".to_string(),
            ));
        }
        if self.compression_level > 9 {
            return Err(ExcelError::InvalidConfig(format!(
                "compression level {} is out of range 0..=9",
                self.compression_level
            )));
        }
        validate_sheet_name(&self.sheet_name)?;
        if self.build_timeout == Some(Duration::ZERO) {
            return Err(ExcelError::InvalidConfig(
                "build timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_sheet_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len == 0 || len > 31 {
        return Err(ExcelError::InvalidConfig(format!(
            "sheet name '{}' must be 1 to 31 characters",
            name
        )));
    }
    if let Some(c) = name.chars().find(|c| INVALID_SHEET_CHARS.contains(c)) {
        return Err(ExcelError::InvalidConfig(format!(
            "sheet name '{}' contains invalid character '{}'",
            name, c
        )));
    }
    Ok(())
}

/// Builder for [`ExcelConfig`]
#[derive(Debug, Clone, Default)]
pub struct ExcelConfigBuilder {
    config: ExcelConfig,
}

impl ExcelConfigBuilder {
    /// Select the document format
    pub fn with_workbook_type(mut self, workbook_type: WorkbookType) -> Self {
        self.config.workbook_type = workbook_type;
        self
    }

    /// Set the number of rows the streaming sink keeps in memory
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.config.window_size = window_size;
        self
    }

    /// Set the window size from a memory profile
    pub fn with_window_profile(self, profile: WindowProfile) -> Self {
        self.with_window_size(profile.window_size())
    }

    /// Set the number of batches allowed in flight
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the worksheet name
    pub fn with_sheet_name(mut self, name: &str) -> Self {
        self.config.sheet_name = name.to_string();
        self
    }

    /// Set deflate level (0-9)
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Fail `build()` if the consumer has not finished within `timeout`
    pub fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.config.build_timeout = Some(timeout);
        self
    }

    /// Enable or disable the header row
    pub fn with_header(mut self, header: bool) -> Self {
        self.config.header = header;
        self
    }

    /// Run the consumer on a caller-owned pool
    pub fn with_thread_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.config.execution = ExecutionContext::Pool(pool);
        self
    }

    /// Build the configuration, validating it
    pub fn build(self) -> Result<ExcelConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExcelConfig::default();
        assert_eq!(config.workbook_type(), WorkbookType::StreamingXlsx);
        assert_eq!(config.window_size(), Some(DEFAULT_WINDOW_SIZE));
        assert_eq!(config.queue_capacity(), available_parallelism());
        assert_eq!(config.sheet_name(), "Sheet1");
        assert!(config.header());
        assert!(config.build_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_in_memory_has_no_window() {
        let config = ExcelConfig::builder()
            .with_workbook_type(WorkbookType::InMemoryXlsx)
            .with_window_size(0)
            .build()
            .unwrap();
        assert_eq!(config.window_size(), None);
    }

    #[test]
    fn test_validation() {
        let err = ExcelConfig::builder()
            .with_queue_capacity(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExcelError::InvalidConfig(_)));

        assert!(ExcelConfig::builder().with_window_size(0).build().is_err());
        assert!(ExcelConfig::builder()
            .with_compression_level(10)
            .build()
            .is_err());
        assert!(ExcelConfig::builder().with_sheet_name("a/b").build().is_err());
        assert!(ExcelConfig::builder().with_sheet_name("").build().is_err());
        assert!(ExcelConfig::builder()
            .with_sheet_name(&"x".repeat(32))
            .build()
            .is_err());
        assert!(ExcelConfig::builder()
            .with_build_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_window_profile_from_mb() {
        assert_eq!(WindowProfile::from_memory_mb(256), WindowProfile::Low);
        assert_eq!(WindowProfile::from_memory_mb(768), WindowProfile::Medium);
        assert_eq!(WindowProfile::from_memory_mb(2048), WindowProfile::High);
        assert_eq!(WindowProfile::Custom(7).window_size(), 7);
    }

    // The only test touching EXCELPIPE_MEMORY_LIMIT_MB
    #[test]
    fn test_window_profile_from_env() {
        std::env::set_var("EXCELPIPE_MEMORY_LIMIT_MB", "256");
        assert_eq!(WindowProfile::from_env(), WindowProfile::Low);

        std::env::set_var("EXCELPIPE_MEMORY_LIMIT_MB", " 4096 ");
        assert_eq!(WindowProfile::from_env(), WindowProfile::High);

        std::env::set_var("EXCELPIPE_MEMORY_LIMIT_MB", "lots");
        assert_eq!(WindowProfile::from_env(), WindowProfile::Medium);

        std::env::remove_var("EXCELPIPE_MEMORY_LIMIT_MB");
        assert_eq!(WindowProfile::from_env(), WindowProfile::Medium);
    }

    #[test]
    fn test_window_profile_sets_window() {
        let config = ExcelConfig::builder()
            .with_window_profile(WindowProfile::High)
            .build()
            .unwrap();
        assert_eq!(config.window_size(), Some(500));

        let config = ExcelConfig::builder()
            .with_window_profile(WindowProfile::from_memory_mb(300))
            .build()
            .unwrap();
        assert_eq!(config.window_size(), Some(50));
    }

    #[test]
    fn test_caller_pool_is_reused() {
        let pool = Arc::new(ThreadPoolBuilder::new().num_threads(1).build().unwrap());
        let config = ExcelConfig::builder()
            .with_thread_pool(Arc::clone(&pool))
            .build()
            .unwrap();
        let resolved = config.execution().resolve().unwrap();
        assert!(Arc::ptr_eq(&pool, &resolved));
    }
}
