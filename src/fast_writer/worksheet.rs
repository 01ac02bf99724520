//! Worksheet XML encoding
//!
//! Rows are encoded into a reusable byte buffer and handed to the ZIP entry
//! as soon as they are complete.

use crate::types::{CellValue, Row};

pub(crate) const WORKSHEET_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheetData>"#;

pub(crate) const WORKSHEET_FOOTER: &str = "</sheetData>\n</worksheet>";

/// Encodes rows of one worksheet, numbering them from 1
pub struct RowEncoder {
    buffer: Vec<u8>,
    rows_encoded: u32,
}

impl RowEncoder {
    pub fn new() -> Self {
        RowEncoder {
            buffer: Vec::with_capacity(4096),
            rows_encoded: 0,
        }
    }

    /// Number of rows encoded so far
    pub fn rows_encoded(&self) -> u32 {
        self.rows_encoded
    }

    /// Encode the next row; the returned slice is valid until the next call
    pub fn encode(&mut self, row: &Row) -> &[u8] {
        self.rows_encoded += 1;
        let row_num = self.rows_encoded;

        let mut num = itoa::Buffer::new();
        self.buffer.clear();
        self.buffer.extend_from_slice(b"<row r=\"");
        self.buffer.extend_from_slice(num.format(row_num).as_bytes());
        self.buffer.extend_from_slice(b"\">");

        for (col_idx, cell) in row.cells.iter().enumerate() {
            self.buffer.extend_from_slice(b"<c r=\"");
            push_column_letter(&mut self.buffer, col_idx as u32 + 1);
            self.buffer.extend_from_slice(num.format(row_num).as_bytes());
            self.buffer.push(b'"');

            let style_id = cell.style.index();
            if style_id > 0 {
                self.buffer.extend_from_slice(b" s=\"");
                self.buffer.extend_from_slice(num.format(style_id).as_bytes());
                self.buffer.push(b'"');
            }

            match &cell.value {
                CellValue::Empty => self.buffer.extend_from_slice(b"/>"),
                CellValue::Int(i) => {
                    self.buffer.extend_from_slice(b" t=\"n\"><v>");
                    self.buffer.extend_from_slice(num.format(*i).as_bytes());
                    self.buffer.extend_from_slice(b"</v></c>");
                }
                CellValue::Float(f) | CellValue::DateTime(f) => {
                    if f.is_finite() {
                        self.buffer.extend_from_slice(b" t=\"n\"><v>");
                        self.buffer.extend_from_slice(f.to_string().as_bytes());
                        self.buffer.extend_from_slice(b"</v></c>");
                    } else {
                        self.buffer.extend_from_slice(b" t=\"e\"><v>#NUM!</v></c>");
                    }
                }
                CellValue::Bool(b) => {
                    self.buffer.extend_from_slice(b" t=\"b\"><v>");
                    self.buffer.push(if *b { b'1' } else { b'0' });
                    self.buffer.extend_from_slice(b"</v></c>");
                }
                CellValue::String(s) => {
                    self.buffer.extend_from_slice(b" t=\"inlineStr\"><is><t");
                    if needs_space_preserve(s) {
                        self.buffer.extend_from_slice(b" xml:space=\"preserve\"");
                    }
                    self.buffer.push(b'>');
                    write_escaped(&mut self.buffer, s);
                    self.buffer.extend_from_slice(b"</t></is></c>");
                }
                CellValue::Formula(f) => {
                    self.buffer.extend_from_slice(b"><f>");
                    write_escaped(&mut self.buffer, f.strip_prefix('=').unwrap_or(f));
                    self.buffer.extend_from_slice(b"</f></c>");
                }
                CellValue::Error(e) => {
                    self.buffer.extend_from_slice(b" t=\"e\"><v>");
                    write_escaped(&mut self.buffer, e);
                    self.buffer.extend_from_slice(b"</v></c>");
                }
            }
        }

        self.buffer.extend_from_slice(b"</row>");
        &self.buffer
    }
}

impl Default for RowEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}

/// Append the column letters for a 1-based column index (1 -> A, 27 -> AA)
pub(crate) fn push_column_letter(buffer: &mut Vec<u8>, mut n: u32) {
    let mut tmp = [0u8; 8];
    let mut len = 0;
    while n > 0 {
        let rem = (n - 1) % 26;
        tmp[len] = b'A' + rem as u8;
        len += 1;
        n = (n - 1) / 26;
    }
    buffer.extend(tmp[..len].iter().rev());
}

/// Append text with XML escaping; drops control characters XML 1.0 forbids
pub(crate) fn write_escaped(buffer: &mut Vec<u8>, s: &str) {
    for c in s.chars() {
        match c {
            '&' => buffer.extend_from_slice(b"&amp;"),
            '<' => buffer.extend_from_slice(b"&lt;"),
            '>' => buffer.extend_from_slice(b"&gt;"),
            '"' => buffer.extend_from_slice(b"&quot;"),
            '\'' => buffer.extend_from_slice(b"&apos;"),
            '\t' | '\n' | '\r' => buffer.push(c as u8),
            c if (c as u32) < 0x20 => {}
            _ => {
                let mut buf = [0; 4];
                buffer.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellStyle, StyledCell};

    fn letters(n: u32) -> String {
        let mut buf = Vec::new();
        push_column_letter(&mut buf, n);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(letters(1), "A");
        assert_eq!(letters(26), "Z");
        assert_eq!(letters(27), "AA");
        assert_eq!(letters(702), "ZZ");
        assert_eq!(letters(703), "AAA");
    }

    #[test]
    fn test_encode_row() {
        let mut encoder = RowEncoder::new();
        let row = Row::new(vec![
            StyledCell::new("Name & Co".into(), CellStyle::HeaderBold),
            StyledCell::default_style(CellValue::Int(42)),
            StyledCell::default_style(CellValue::Bool(false)),
            StyledCell::default_style(CellValue::Empty),
            StyledCell::default_style(CellValue::Formula("=SUM(B1:B1)".to_string())),
        ]);
        let xml = String::from_utf8(encoder.encode(&row).to_vec()).unwrap();
        assert_eq!(
            xml,
            "<row r=\"1\">\
             <c r=\"A1\" s=\"1\" t=\"inlineStr\"><is><t>Name &amp; Co</t></is></c>\
             <c r=\"B1\" t=\"n\"><v>42</v></c>\
             <c r=\"C1\" t=\"b\"><v>0</v></c>\
             <c r=\"D1\"/>\
             <c r=\"E1\"><f>SUM(B1:B1)</f></c>\
             </row>"
        );
        assert_eq!(encoder.rows_encoded(), 1);
    }

    #[test]
    fn test_rows_are_numbered_in_order() {
        let mut encoder = RowEncoder::new();
        let row: Row = vec!["x"].into_iter().collect();
        encoder.encode(&row);
        let second = String::from_utf8(encoder.encode(&row).to_vec()).unwrap();
        assert!(second.starts_with("<row r=\"2\"><c r=\"A2\""));
    }

    #[test]
    fn test_non_finite_float_is_error_cell() {
        let mut encoder = RowEncoder::new();
        let row: Row = vec![CellValue::Float(f64::NAN)].into_iter().collect();
        let xml = String::from_utf8(encoder.encode(&row).to_vec()).unwrap();
        assert!(xml.contains("t=\"e\"><v>#NUM!</v>"));
    }
}
