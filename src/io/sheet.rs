//! Format-independent tabular model of an import template.
//!
//! Row layout (1-based, as users see it in a spreadsheet):
//!
//! | Row | Content |
//! |-----|---------|
//! | 1 | Column headers (child names), annotated |
//! | 2 | Empty, left for user notes |
//! | 3 | The [`DATA_EXAMPLE_MARKER`] in every column |
//! | 4-6 | Synthesized example values |

use std::fmt;

/// Literal written in every column of the marker row.
pub const DATA_EXAMPLE_MARKER: &str = "DATA EXAMPLE";

/// Number of example rows per column.
pub const EXAMPLE_ROW_COUNT: usize = 3;

/// Zero-based index of the marker row.
pub const MARKER_ROW: u32 = 2;

/// Zero-based index of the first example row.
pub const FIRST_EXAMPLE_ROW: u32 = 3;

/// Extra character width added to auto-sized columns.
const COLUMN_PADDING: usize = 2;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell.
    Empty,
    /// Text cell.
    Text(String),
    /// Whole number cell.
    Integer(i32),
    /// Decimal number cell.
    Float(f64),
}

impl CellValue {
    /// Returns true for [`CellValue::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Number of characters the value occupies when rendered.
    #[must_use]
    pub fn char_width(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Text(text) => text.chars().count(),
            Self::Integer(_) | Self::Float(_) => self.to_string().chars().count(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// One emitted template column.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateColumn {
    /// Header text (the child name).
    pub header: String,
    /// Annotation attached to the header cell.
    pub annotation: String,
    /// Example values, one per example row.
    pub examples: Vec<CellValue>,
}

impl TemplateColumn {
    /// Creates a column.
    #[must_use]
    pub fn new(
        header: impl Into<String>,
        annotation: impl Into<String>,
        examples: Vec<CellValue>,
    ) -> Self {
        Self {
            header: header.into(),
            annotation: annotation.into(),
            examples,
        }
    }

    /// Auto-sized width in characters: the widest rendered cell plus padding.
    #[must_use]
    pub fn width(&self) -> usize {
        let widest = self
            .examples
            .iter()
            .map(CellValue::char_width)
            .chain([
                self.header.chars().count(),
                DATA_EXAMPLE_MARKER.chars().count(),
            ])
            .max()
            .unwrap_or(0);
        widest + COLUMN_PADDING
    }
}

/// A complete template sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateSheet {
    /// Emitted columns, in output order.
    pub columns: Vec<TemplateColumn>,
}

impl TemplateSheet {
    /// Worksheet name used by the spreadsheet formats.
    pub const NAME: &'static str = "Worksheet";

    /// Creates an empty sheet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Appends a column.
    pub fn push(&mut self, column: TemplateColumn) {
        self.columns.push(column);
    }

    /// Returns the column headers in output order.
    #[must_use]
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    /// Returns example row `index` (0-based) across all columns.
    ///
    /// Columns with fewer examples yield [`CellValue::Empty`].
    #[must_use]
    pub fn example_row(&self, index: usize) -> Vec<&CellValue> {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.columns
            .iter()
            .map(|c| c.examples.get(index).unwrap_or(EMPTY))
            .collect()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true when no column was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TemplateSheet {
        let mut sheet = TemplateSheet::new();
        sheet.push(TemplateColumn::new(
            "id",
            "id\n[Field Type: guid]",
            vec!["a".into(), "b".into()],
        ));
        sheet.push(TemplateColumn::new(
            "quantity",
            "Quantity\n[Field Type: integer]",
            vec![CellValue::Integer(7), CellValue::Integer(12), CellValue::Integer(9000)],
        ));
        sheet
    }

    #[test]
    fn test_example_row_pads_missing_values() {
        let sheet = sample();
        let third = sheet.example_row(2);
        assert_eq!(third, vec![&CellValue::Empty, &CellValue::Integer(9000)]);
    }

    #[test]
    fn test_width_accounts_for_marker() {
        let column = TemplateColumn::new("id", "", vec![CellValue::Integer(1)]);
        assert_eq!(column.width(), DATA_EXAMPLE_MARKER.len() + 2);

        let wide = TemplateColumn::new("id", "", vec!["Text abcdefghijklmnopqrst".into()]);
        assert_eq!(wide.width(), 27);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Float(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Integer(42).to_string(), "42");
        assert_eq!(sample().headers(), vec!["id", "quantity"]);
    }
}
