//! Record schema and field selection

use crate::types::{CellStyle, CellValue};
use indexmap::IndexMap;
use thiserror::Error;

/// A field that could not be read from a record
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct FieldError(pub String);

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        FieldError(message.into())
    }

    /// The record has no field with this key
    pub fn unknown(key: &str) -> Self {
        FieldError(format!("unknown field '{}'", key))
    }
}

/// One exported field of a record type
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub title: String,
    /// Groups this column belongs to; empty means "always exported"
    pub groups: Vec<String>,
    pub style: CellStyle,
}

impl Column {
    pub fn new(key: &str, title: &str) -> Self {
        Column {
            key: key.to_string(),
            title: title.to_string(),
            groups: Vec::new(),
            style: CellStyle::Default,
        }
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }

    fn in_any_group(&self, groups: &[&str]) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|g| groups.contains(&g.as_str()))
    }
}

/// A record type that can be exported row by row
///
/// # Examples
///
/// ```
/// use excelpipe::{CellValue, Column, ExcelRecord, FieldError};
///
/// struct User {
///     id: i64,
///     email: String,
/// }
///
/// impl ExcelRecord for User {
///     fn columns() -> Vec<Column> {
///         vec![
///             Column::new("id", "ID"),
///             Column::new("email", "Email").with_groups(&["contact"]),
///         ]
///     }
///
///     fn value(&self, key: &str) -> Result<CellValue, FieldError> {
///         match key {
///             "id" => Ok(self.id.into()),
///             "email" => Ok(self.email.clone().into()),
///             _ => Err(FieldError::unknown(key)),
///         }
///     }
/// }
/// ```
pub trait ExcelRecord {
    /// Every exportable column, in output order
    fn columns() -> Vec<Column>;

    /// Read one field
    fn value(&self, key: &str) -> Result<CellValue, FieldError>;
}

/// Columns chosen for one export, plus their style table
///
/// A column without groups is always selected. A grouped column is selected
/// when any requested group matches it; requesting no groups selects every
/// column. Column order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSelection {
    columns: Vec<Column>,
    styles: IndexMap<String, CellStyle>,
}

impl FieldSelection {
    pub fn for_groups(columns: Vec<Column>, groups: &[&str]) -> Self {
        let columns: Vec<Column> = columns
            .into_iter()
            .filter(|c| groups.is_empty() || c.in_any_group(groups))
            .collect();
        let styles = columns
            .iter()
            .map(|c| (c.key.clone(), c.style))
            .collect();
        FieldSelection { columns, styles }
    }

    /// Select every column of `T` belonging to `groups`
    pub fn of<T: ExcelRecord>(groups: &[&str]) -> Self {
        Self::for_groups(T::columns(), groups)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.title.as_str())
    }

    /// Style for a selected column key
    pub fn style_of(&self, key: &str) -> CellStyle {
        self.styles.get(key).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
