//! XLSX template writer backed by `rust_xlsxwriter`.

use super::SheetWriter;
use crate::io::sheet::{
    CellValue, DATA_EXAMPLE_MARKER, FIRST_EXAMPLE_ROW, MARKER_ROW, TemplateSheet,
};
use crate::{Error, Result};
use rust_xlsxwriter::{Note, Workbook, Worksheet, XlsxError};

/// Writes templates as Office Open XML workbooks with header notes.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxSheetWriter;

impl SheetWriter for XlsxSheetWriter {
    fn write(&self, sheet: &TemplateSheet) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(TemplateSheet::NAME)
            .map_err(xlsx_error)?;

        for (index, column) in sheet.columns.iter().enumerate() {
            let col = u16::try_from(index)
                .map_err(|_| Error::internal("write_xlsx_template", "too many columns"))?;

            worksheet
                .write_string(0, col, &column.header)
                .map_err(xlsx_error)?;
            let note = Note::new(&column.annotation).add_author_prefix(false);
            worksheet.insert_note(0, col, &note).map_err(xlsx_error)?;
            worksheet
                .write_string(MARKER_ROW, col, DATA_EXAMPLE_MARKER)
                .map_err(xlsx_error)?;

            for (row, value) in (FIRST_EXAMPLE_ROW..).zip(&column.examples) {
                write_cell(worksheet, row, col, value)?;
            }

            let width = u16::try_from(column.width()).unwrap_or(u16::MAX);
            worksheet
                .set_column_width(col, f64::from(width))
                .map_err(xlsx_error)?;
        }

        workbook.save_to_buffer().map_err(xlsx_error)
    }
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<()> {
    let written = match value {
        CellValue::Empty => return Ok(()),
        CellValue::Text(text) => worksheet.write_string(row, col, text),
        CellValue::Integer(number) => worksheet.write_number(row, col, f64::from(*number)),
        CellValue::Float(number) => worksheet.write_number(row, col, *number),
    };
    written.map_err(xlsx_error)?;
    Ok(())
}

#[allow(clippy::needless_pass_by_value)]
fn xlsx_error(e: XlsxError) -> Error {
    Error::internal("write_xlsx_template", e)
}
