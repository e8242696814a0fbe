//! Template I/O subsystem.
//!
//! Templates are built as a format-independent [`TemplateSheet`] and then
//! rendered by one [`SheetWriter`] per output format.
//!
//! # Supported Formats
//!
//! | Format | Annotations | Column widths | Notes |
//! |--------|-------------|---------------|-------|
//! | CSV | - | - | Header, marker and example rows only |
//! | ODS | ✓ | ✓ | Minimal ODF package |
//! | XLS | ✓ | ✓ | Excel 2003 XML (`SpreadsheetML`) |
//! | XLSX | ✓ | ✓ | Written with `rust_xlsxwriter` |
//!
//! # Example
//!
//! ```rust,ignore
//! use metaport::io::{Format, TemplateSheet};
//!
//! let format: Format = "xlsx".parse()?;
//! let bytes = format.writer().write(&sheet)?;
//! ```

pub mod formats;
pub mod sheet;

// Re-exports for convenience
pub use formats::{Format, SheetWriter};
pub use sheet::{CellValue, DATA_EXAMPLE_MARKER, TemplateColumn, TemplateSheet};
