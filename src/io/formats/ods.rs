//! `OpenDocument` spreadsheet template writer.
//!
//! Produces a minimal ODF package: an uncompressed `mimetype` entry first,
//! then `META-INF/manifest.xml` and `content.xml`. Header annotations are
//! written as `office:annotation` elements.

use super::SheetWriter;
use super::xml::XmlDocument;
use crate::io::sheet::{CellValue, DATA_EXAMPLE_MARKER, EXAMPLE_ROW_COUNT, TemplateSheet};
use crate::{Error, Result};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";
const CONTEXT: &str = "write_ods_template";

/// Approximate width of one character, in centimetres.
const CM_PER_CHAR: f64 = 0.2;

/// Writes templates as `.ods` packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdsSheetWriter;

impl SheetWriter for OdsSheetWriter {
    fn write(&self, sheet: &TemplateSheet) -> Result<Vec<u8>> {
        let manifest = manifest_xml()?;
        let content = content_xml(sheet)?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).map_err(zip_error)?;
        zip.write_all(MIMETYPE.as_bytes()).map_err(zip_error)?;
        zip.start_file("META-INF/manifest.xml", deflated)
            .map_err(zip_error)?;
        zip.write_all(&manifest).map_err(zip_error)?;
        zip.start_file("content.xml", deflated).map_err(zip_error)?;
        zip.write_all(&content).map_err(zip_error)?;

        let cursor = zip.finish().map_err(zip_error)?;
        Ok(cursor.into_inner())
    }
}

fn manifest_xml() -> Result<Vec<u8>> {
    let mut doc = XmlDocument::new(CONTEXT)?;
    doc.start(
        "manifest:manifest",
        &[
            (
                "xmlns:manifest",
                "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0",
            ),
            ("manifest:version", "1.2"),
        ],
    )?;
    doc.empty(
        "manifest:file-entry",
        &[
            ("manifest:full-path", "/"),
            ("manifest:version", "1.2"),
            ("manifest:media-type", MIMETYPE),
        ],
    )?;
    doc.empty(
        "manifest:file-entry",
        &[
            ("manifest:full-path", "content.xml"),
            ("manifest:media-type", "text/xml"),
        ],
    )?;
    doc.end("manifest:manifest")?;
    Ok(doc.finish())
}

fn content_xml(sheet: &TemplateSheet) -> Result<Vec<u8>> {
    let mut doc = XmlDocument::new(CONTEXT)?;
    doc.start(
        "office:document-content",
        &[
            (
                "xmlns:office",
                "urn:oasis:names:tc:opendocument:xmlns:office:1.0",
            ),
            (
                "xmlns:style",
                "urn:oasis:names:tc:opendocument:xmlns:style:1.0",
            ),
            ("xmlns:text", "urn:oasis:names:tc:opendocument:xmlns:text:1.0"),
            (
                "xmlns:table",
                "urn:oasis:names:tc:opendocument:xmlns:table:1.0",
            ),
            (
                "xmlns:fo",
                "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0",
            ),
            ("office:version", "1.2"),
        ],
    )?;

    doc.start("office:automatic-styles", &[])?;
    for (index, column) in sheet.columns.iter().enumerate() {
        let style = column_style(index);
        let width = format!("{:.2}cm", char_count(column.width()) * CM_PER_CHAR);
        doc.start(
            "style:style",
            &[("style:name", style.as_str()), ("style:family", "table-column")],
        )?;
        doc.empty(
            "style:table-column-properties",
            &[
                ("fo:break-before", "auto"),
                ("style:column-width", width.as_str()),
            ],
        )?;
        doc.end("style:style")?;
    }
    doc.end("office:automatic-styles")?;

    doc.start("office:body", &[])?;
    doc.start("office:spreadsheet", &[])?;
    doc.start("table:table", &[("table:name", TemplateSheet::NAME)])?;

    for index in 0..sheet.len() {
        let style = column_style(index);
        doc.empty("table:table-column", &[("table:style-name", style.as_str())])?;
    }

    doc.start("table:table-row", &[])?;
    for column in &sheet.columns {
        doc.start("table:table-cell", &[("office:value-type", "string")])?;
        doc.start("office:annotation", &[])?;
        for line in column.annotation.lines() {
            doc.text_element("text:p", &[], line)?;
        }
        doc.end("office:annotation")?;
        doc.text_element("text:p", &[], &column.header)?;
        doc.end("table:table-cell")?;
    }
    doc.end("table:table-row")?;

    doc.start("table:table-row", &[])?;
    if !sheet.is_empty() {
        let repeated = sheet.len().to_string();
        doc.empty(
            "table:table-cell",
            &[("table:number-columns-repeated", repeated.as_str())],
        )?;
    }
    doc.end("table:table-row")?;

    doc.start("table:table-row", &[])?;
    for _ in &sheet.columns {
        write_cell(&mut doc, &CellValue::from(DATA_EXAMPLE_MARKER))?;
    }
    doc.end("table:table-row")?;

    for row in 0..EXAMPLE_ROW_COUNT {
        doc.start("table:table-row", &[])?;
        for value in sheet.example_row(row) {
            write_cell(&mut doc, value)?;
        }
        doc.end("table:table-row")?;
    }

    doc.end("table:table")?;
    doc.end("office:spreadsheet")?;
    doc.end("office:body")?;
    doc.end("office:document-content")?;
    Ok(doc.finish())
}

fn write_cell(doc: &mut XmlDocument, value: &CellValue) -> Result<()> {
    match value {
        CellValue::Empty => doc.empty("table:table-cell", &[]),
        CellValue::Text(text) => {
            doc.start("table:table-cell", &[("office:value-type", "string")])?;
            doc.text_element("text:p", &[], text)?;
            doc.end("table:table-cell")
        },
        CellValue::Integer(_) | CellValue::Float(_) => {
            let rendered = value.to_string();
            doc.start(
                "table:table-cell",
                &[
                    ("office:value-type", "float"),
                    ("office:value", rendered.as_str()),
                ],
            )?;
            doc.text_element("text:p", &[], &rendered)?;
            doc.end("table:table-cell")
        },
    }
}

fn column_style(index: usize) -> String {
    format!("co{}", index + 1)
}

fn char_count(width: usize) -> f64 {
    f64::from(u32::try_from(width).unwrap_or(u32::MAX))
}

#[allow(clippy::needless_pass_by_value)]
fn zip_error(e: impl std::fmt::Display) -> Error {
    Error::internal(CONTEXT, e)
}
