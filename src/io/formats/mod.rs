//! Template output formats.
//!
//! Each format implements [`SheetWriter`]. Writers render into an in-memory
//! buffer so a failure never leaves a partial file behind.

pub mod csv;
pub mod ods;
pub mod xls;
pub mod xlsx;
mod xml;

use crate::io::sheet::TemplateSheet;
use crate::{Error, Result};
use std::path::Path;
use std::str::FromStr;

/// Renders a [`TemplateSheet`] to bytes.
pub trait SheetWriter: Send + Sync {
    /// Serializes the sheet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if serialization fails.
    fn write(&self, sheet: &TemplateSheet) -> Result<Vec<u8>>;
}

/// Supported template formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Comma-separated values, no annotations.
    Csv,
    /// `OpenDocument` spreadsheet.
    Ods,
    /// Excel 2003 XML spreadsheet.
    Xls,
    /// Office Open XML workbook.
    Xlsx,
}

impl Format {
    /// Returns all supported formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Csv, Self::Ods, Self::Xls, Self::Xlsx]
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Ods => "ods",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
        }
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Ods => "application/vnd.oasis.opendocument.spreadsheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Returns the writer for this format.
    #[must_use]
    pub fn writer(&self) -> Box<dyn SheetWriter> {
        match self {
            Self::Csv => Box::new(csv::CsvSheetWriter),
            Self::Ods => Box::new(ods::OdsSheetWriter),
            Self::Xls => Box::new(xls::XlsSheetWriter),
            Self::Xlsx => Box::new(xlsx::XlsxSheetWriter),
        }
    }

    /// Detects format from file extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if the extension is missing or
    /// not one of the supported formats.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?
            .parse()
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "ods" => Ok(Self::Ods),
            "xls" => Ok(Self::Xls),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("csv", Format::Csv; "csv")]
    #[test_case("ODS", Format::Ods; "ods uppercase")]
    #[test_case("xls", Format::Xls; "xls")]
    #[test_case("Xlsx", Format::Xlsx; "xlsx mixed case")]
    fn test_format_from_str(input: &str, expected: Format) {
        assert_eq!(input.parse::<Format>().expect("supported"), expected);
    }

    #[test_case("pdf"; "pdf")]
    #[test_case("json"; "json")]
    #[test_case(""; "empty")]
    fn test_unsupported_format(input: &str) {
        let err = input.parse::<Format>().expect_err("unsupported");
        assert!(matches!(err, Error::UnsupportedFormat(ref f) if f == input));
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            Format::from_path(Path::new("import/3f2a.XLSX")).expect("xlsx"),
            Format::Xlsx
        );
        assert!(Format::from_path(Path::new("README")).is_err());
    }

    #[test]
    fn test_every_format_has_a_writer() {
        let sheet = TemplateSheet::new();
        for format in Format::all() {
            let bytes = format.writer().write(&sheet).expect("empty sheet renders");
            if *format != Format::Csv {
                assert!(!bytes.is_empty(), "{format} produced no bytes");
            }
        }
    }
}
