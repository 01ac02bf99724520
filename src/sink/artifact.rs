//! Finished workbook returned to the caller

use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A complete XLSX document held in memory
///
/// # Examples
///
/// ```no_run
/// # fn demo(workbook: excelpipe::Workbook) -> excelpipe::Result<()> {
/// println!("{} rows on '{}'", workbook.row_count(), workbook.sheet_name());
/// workbook.save("export.xlsx")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Workbook {
    bytes: Vec<u8>,
    sheet_name: String,
    row_count: u32,
}

impl Workbook {
    pub(crate) fn new(bytes: Vec<u8>, sheet_name: String, row_count: u32) -> Self {
        Workbook {
            bytes,
            sheet_name,
            row_count,
        }
    }

    /// Raw XLSX bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Rows written to the worksheet, header included
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Write the document to any writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Persist the document to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::with_capacity(64 * 1024, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.xlsx");
        let workbook = Workbook::new(b"PK-bytes".to_vec(), "Sheet1".to_string(), 0);

        workbook.save(&path)?;
        assert_eq!(std::fs::read(&path)?, b"PK-bytes");

        let mut copy = Vec::new();
        workbook.write_to(&mut copy)?;
        assert_eq!(copy, workbook.into_bytes());
        Ok(())
    }
}
