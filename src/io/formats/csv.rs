//! CSV template writer.
//!
//! CSV has no cell annotations, so only the header, marker and example rows
//! are written.

use super::SheetWriter;
use crate::io::sheet::{DATA_EXAMPLE_MARKER, EXAMPLE_ROW_COUNT, TemplateSheet};
use crate::{Error, Result};

/// Writes templates as comma-separated values.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSheetWriter;

impl SheetWriter for CsvSheetWriter {
    fn write(&self, sheet: &TemplateSheet) -> Result<Vec<u8>> {
        let mut writer = ::csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        let width = sheet.len();
        writer.write_record(sheet.headers()).map_err(csv_error)?;
        writer
            .write_record(std::iter::repeat_n("", width))
            .map_err(csv_error)?;
        writer
            .write_record(std::iter::repeat_n(DATA_EXAMPLE_MARKER, width))
            .map_err(csv_error)?;
        for index in 0..EXAMPLE_ROW_COUNT {
            let row: Vec<String> = sheet
                .example_row(index)
                .into_iter()
                .map(ToString::to_string)
                .collect();
            writer.write_record(&row).map_err(csv_error)?;
        }

        writer
            .into_inner()
            .map_err(|e| Error::internal("write_csv_template", e.error()))
    }
}

#[allow(clippy::needless_pass_by_value)]
fn csv_error(e: ::csv::Error) -> Error {
    Error::internal("write_csv_template", e)
}
