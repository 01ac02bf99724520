//! Single-sheet XLSX package writer
//!
//! The worksheet entry is opened first and rows stream straight into its
//! compressor. The remaining package parts are written on close.

use super::worksheet::{write_escaped, RowEncoder, WORKSHEET_FOOTER, WORKSHEET_HEADER};
use crate::error::{ExcelError, Result};
use crate::types::Row;
use chrono::Utc;
use std::io::{Seek, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

const SHEET_ENTRY: &str = "xl/worksheets/sheet1.xml";

/// Rows per worksheet allowed by the XLSX format
pub const MAX_ROWS: u32 = 1_048_576;

/// Columns per worksheet allowed by the XLSX format
pub const MAX_COLS: usize = 16_384;

pub struct WorkbookWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    encoder: RowEncoder,
    sheet_name: String,
}

impl<W: Write + Seek> WorkbookWriter<W> {
    /// Open the package and the worksheet entry
    ///
    /// Level 0 stores entries uncompressed; 1-9 deflate them.
    pub fn new(output: W, sheet_name: &str, compression_level: u32) -> Result<Self> {
        let options = if compression_level == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(compression_level.min(9) as i64))
        };

        let mut zip = ZipWriter::new(output);
        // The sheet can outgrow 4GB uncompressed
        zip.start_file(SHEET_ENTRY, options.large_file(true))?;
        zip.write_all(WORKSHEET_HEADER.as_bytes())?;

        Ok(WorkbookWriter {
            zip,
            options,
            encoder: RowEncoder::new(),
            sheet_name: sheet_name.to_string(),
        })
    }

    /// Encode one row into the worksheet
    ///
    /// Fails once the sheet holds `MAX_ROWS` rows, or when the row is wider
    /// than `MAX_COLS` cells.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        if self.encoder.rows_encoded() >= MAX_ROWS {
            return Err(ExcelError::WriteError(format!(
                "worksheet is full: at most {} rows",
                MAX_ROWS
            )));
        }
        if row.len() > MAX_COLS {
            return Err(ExcelError::WriteError(format!(
                "row {} has {} cells, at most {} columns allowed",
                self.encoder.rows_encoded() + 1,
                row.len(),
                MAX_COLS
            )));
        }
        let xml = self.encoder.encode(row);
        self.zip.write_all(xml)?;
        Ok(())
    }

    pub fn rows_written(&self) -> u32 {
        self.encoder.rows_encoded()
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Close the worksheet, write the other parts and return the output
    pub fn close(mut self) -> Result<W> {
        self.zip.write_all(WORKSHEET_FOOTER.as_bytes())?;

        self.write_part("[Content_Types].xml", CONTENT_TYPES.as_bytes())?;
        self.write_part("_rels/.rels", ROOT_RELS.as_bytes())?;
        let workbook = self.workbook_xml();
        self.write_part("xl/workbook.xml", &workbook)?;
        self.write_part("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes())?;
        self.write_part("xl/styles.xml", STYLES.as_bytes())?;
        self.write_part("docProps/app.xml", APP_PROPS.as_bytes())?;
        let core = core_props_xml();
        self.write_part("docProps/core.xml", core.as_bytes())?;

        Ok(self.zip.finish()?)
    }

    fn write_part(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    fn workbook_xml(&self) -> Vec<u8> {
        let mut xml = Vec::with_capacity(512);
        xml.extend_from_slice(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
<sheet name=""#,
        );
        write_escaped(&mut xml, &self.sheet_name);
        xml.extend_from_slice(b"\" sheetId=\"1\" r:id=\"rId1\"/>\n</sheets>\n</workbook>");
        xml
    }
}

fn core_props_xml() -> String {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:creator>excelpipe</dc:creator>
<dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created>
<dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified>
</cp:coreProperties>"#
    )
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const APP_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>excelpipe</Application>
</Properties>"#;

// cellXfs order follows CellStyle discriminants
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1">
<numFmt numFmtId="164" formatCode="&quot;$&quot;#,##0.00"/>
</numFmts>
<fonts count="3">
<font><sz val="11"/><name val="Calibri"/></font>
<font><b/><sz val="11"/><name val="Calibri"/></font>
<font><i/><sz val="11"/><name val="Calibri"/></font>
</fonts>
<fills count="5">
<fill><patternFill patternType="none"/></fill>
<fill><patternFill patternType="gray125"/></fill>
<fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/></patternFill></fill>
<fill><patternFill patternType="solid"><fgColor rgb="FF00FF00"/></patternFill></fill>
<fill><patternFill patternType="solid"><fgColor rgb="FFFF0000"/></patternFill></fill>
</fills>
<borders count="2">
<border><left/><right/><top/><bottom/><diagonal/></border>
<border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border>
</borders>
<cellStyleXfs count="1">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
</cellStyleXfs>
<cellXfs count="14">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>
<xf numFmtId="3" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="4" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="10" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>
<xf numFmtId="0" fontId="2" fillId="0" borderId="0" xfId="0" applyFont="1"/>
<xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/>
<xf numFmtId="0" fontId="0" fillId="3" borderId="0" xfId="0" applyFill="1"/>
<xf numFmtId="0" fontId="0" fillId="4" borderId="0" xfId="0" applyFill="1"/>
<xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1"/>
</cellXfs>
<cellStyles count="1">
<cellStyle name="Normal" xfId="0" builtinId="0"/>
</cellStyles>
</styleSheet>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn sheet_xml(bytes: Vec<u8>) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut sheet = archive.by_name(SHEET_ENTRY).unwrap();
        let mut xml = String::new();
        sheet.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn test_workbook_writer() -> Result<()> {
        let mut writer = WorkbookWriter::new(Cursor::new(Vec::new()), "Report <Q1>", 6)?;
        writer.write_row(&vec!["Name", "Age"].into_iter().collect())?;
        writer.write_row(&vec!["Alice", "30"].into_iter().collect())?;
        assert_eq!(writer.rows_written(), 2);
        assert_eq!(writer.sheet_name(), "Report <Q1>");

        let workbook = writer.workbook_xml();
        let workbook = String::from_utf8(workbook).unwrap();
        assert!(workbook.contains("name=\"Report &lt;Q1&gt;\""));

        let bytes = writer.close()?.into_inner();
        assert_eq!(&bytes[..2], b"PK");
        assert!(sheet_xml(bytes).ends_with("<t>30</t></is></c></row></sheetData>\n</worksheet>"));
        Ok(())
    }

    #[test]
    fn test_stored_when_level_is_zero() -> Result<()> {
        let mut writer = WorkbookWriter::new(Cursor::new(Vec::new()), "Sheet1", 0)?;
        writer.write_row(&vec![1i64, 2, 3].into_iter().collect())?;
        let bytes = writer.close()?.into_inner();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let sheet = archive.by_name(SHEET_ENTRY).unwrap();
        assert_eq!(sheet.compression(), CompressionMethod::Stored);
        Ok(())
    }

    #[test]
    fn test_row_limit() -> Result<()> {
        let mut writer = WorkbookWriter::new(Cursor::new(Vec::new()), "Sheet1", 0)?;
        let row = Row::default();
        for _ in 0..MAX_ROWS {
            writer.write_row(&row)?;
        }
        assert_eq!(writer.rows_written(), MAX_ROWS);

        let err = writer.write_row(&row).unwrap_err();
        assert!(matches!(err, ExcelError::WriteError(_)));
        assert_eq!(writer.rows_written(), MAX_ROWS);
        Ok(())
    }

    #[test]
    fn test_column_limit() -> Result<()> {
        let mut writer = WorkbookWriter::new(Cursor::new(Vec::new()), "Sheet1", 6)?;
        writer.write_row(&vec![0i64; MAX_COLS].into_iter().collect())?;

        let wide: Row = vec![0i64; MAX_COLS + 1].into_iter().collect();
        assert!(matches!(
            writer.write_row(&wide).unwrap_err(),
            ExcelError::WriteError(_)
        ));
        assert_eq!(writer.rows_written(), 1);

        let xml = sheet_xml(writer.close()?.into_inner());
        assert!(xml.contains("<c r=\"XFD1\""));
        assert!(!xml.contains("XFE"));
        Ok(())
    }
}
