//! Legacy Excel template writer.
//!
//! Emits Excel 2003 XML (`SpreadsheetML`), which Excel and `LibreOffice` open
//! as `.xls`. Header annotations become cell comments.

use super::SheetWriter;
use super::xml::XmlDocument;
use crate::Result;
use crate::io::sheet::{CellValue, DATA_EXAMPLE_MARKER, EXAMPLE_ROW_COUNT, TemplateSheet};

const CONTEXT: &str = "write_xls_template";
const SPREADSHEET_NS: &str = "urn:schemas-microsoft-com:office:spreadsheet";

/// Approximate width of one character, in points.
const POINTS_PER_CHAR: f64 = 7.0;

/// Writes templates as `SpreadsheetML` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsSheetWriter;

impl SheetWriter for XlsSheetWriter {
    fn write(&self, sheet: &TemplateSheet) -> Result<Vec<u8>> {
        let mut doc = XmlDocument::new(CONTEXT)?;
        doc.raw("\n<?mso-application progid=\"Excel.Sheet\"?>\n")?;
        doc.start(
            "Workbook",
            &[
                ("xmlns", SPREADSHEET_NS),
                ("xmlns:o", "urn:schemas-microsoft-com:office:office"),
                ("xmlns:x", "urn:schemas-microsoft-com:office:excel"),
                ("xmlns:ss", SPREADSHEET_NS),
            ],
        )?;
        doc.start("Worksheet", &[("ss:Name", TemplateSheet::NAME)])?;
        doc.start("Table", &[])?;

        for column in &sheet.columns {
            let chars = f64::from(u32::try_from(column.width()).unwrap_or(u32::MAX));
            let width = format!("{:.1}", chars * POINTS_PER_CHAR);
            doc.empty(
                "Column",
                &[("ss:AutoFitWidth", "0"), ("ss:Width", width.as_str())],
            )?;
        }

        doc.start("Row", &[])?;
        for column in &sheet.columns {
            doc.start("Cell", &[])?;
            doc.text_element("Data", &[("ss:Type", "String")], &column.header)?;
            doc.start("Comment", &[])?;
            doc.text_element("ss:Data", &[], &column.annotation)?;
            doc.end("Comment")?;
            doc.end("Cell")?;
        }
        doc.end("Row")?;

        doc.empty("Row", &[])?;

        doc.start("Row", &[])?;
        for _ in &sheet.columns {
            write_cell(&mut doc, &CellValue::from(DATA_EXAMPLE_MARKER))?;
        }
        doc.end("Row")?;

        for row in 0..EXAMPLE_ROW_COUNT {
            doc.start("Row", &[])?;
            for value in sheet.example_row(row) {
                write_cell(&mut doc, value)?;
            }
            doc.end("Row")?;
        }

        doc.end("Table")?;
        doc.end("Worksheet")?;
        doc.end("Workbook")?;
        Ok(doc.finish())
    }
}

fn write_cell(doc: &mut XmlDocument, value: &CellValue) -> Result<()> {
    let kind = match value {
        CellValue::Empty => return doc.empty("Cell", &[]),
        CellValue::Text(_) => "String",
        CellValue::Integer(_) | CellValue::Float(_) => "Number",
    };
    doc.start("Cell", &[])?;
    doc.text_element("Data", &[("ss:Type", kind)], &value.to_string())?;
    doc.end("Cell")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::sheet::TemplateColumn;

    #[test]
    fn test_spreadsheet_ml_layout() {
        let mut sheet = TemplateSheet::new();
        sheet.push(TemplateColumn::new(
            "quantity",
            "Quantity\n[Field Type: integer]",
            vec![CellValue::Integer(5), CellValue::Integer(6), CellValue::Empty],
        ));

        let bytes = XlsSheetWriter.write(&sheet).expect("write xls");
        let xml = String::from_utf8(bytes).expect("utf8");

        assert!(xml.contains("<?mso-application progid=\"Excel.Sheet\"?>"));
        assert!(xml.contains("<Worksheet ss:Name=\"Worksheet\">"));
        assert!(
            xml.contains("<Comment><ss:Data>Quantity\n[Field Type: integer]</ss:Data></Comment>")
        );
        assert!(xml.contains("<Data ss:Type=\"String\">DATA EXAMPLE</Data>"));
        assert!(xml.contains("<Data ss:Type=\"Number\">5</Data>"));
        assert!(xml.contains("<Row/>"));
        assert!(xml.contains("<Cell/>"));
    }
}
