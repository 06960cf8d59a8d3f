//! Minimal Office Open XML workbook: one sheet, bold header, formatted amounts.
//!
//! The package is assembled part by part with the `zip` crate. Entry
//! timestamps are pinned so identical reports produce identical bytes.

use std::fmt::{self, Write as _};
use std::io::{Cursor, Write as _};

use odpady_core::{ArtifactFormat, EncodeError, ReportDocument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::markup::escape;
use crate::{COLUMN_HEADERS, write_error};

/// Number format applied to the amount column.
pub const AMOUNT_FORMAT: &str = r#"0.00" kg""#;

const STYLE_HEADER: u8 = 1;
const STYLE_AMOUNT: u8 = 2;
const COLUMNS: [char; 4] = ['A', 'B', 'C', 'D'];
const COLUMN_WIDTHS: [u8; 4] = [14, 36, 16, 18];

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Render the aggregate as an XLSX workbook.
///
/// # Errors
///
/// Returns an [`EncodeError`] if a part cannot be formatted or zipped.
pub fn encode_xlsx(document: &ReportDocument<'_>) -> Result<Vec<u8>, EncodeError> {
    let fail = |err: &dyn fmt::Display| write_error(ArtifactFormat::Xlsx, err);

    let workbook = workbook_xml(&document.title()).map_err(|err| fail(&err))?;
    let styles = styles_xml().map_err(|err| fail(&err))?;
    let sheet = sheet_xml(document).map_err(|err| fail(&err))?;

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", workbook.as_str()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/styles.xml", styles.as_str()),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ];

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut package = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        package.start_file(name, options).map_err(|err| fail(&err))?;
        package
            .write_all(body.as_bytes())
            .map_err(|err| fail(&err))?;
    }
    let cursor = package.finish().map_err(|err| fail(&err))?;

    Ok(cursor.into_inner())
}

fn workbook_xml(sheet_name: &str) -> Result<String, fmt::Error> {
    let mut xml = String::new();
    write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(sheet_name)
    )?;
    Ok(xml)
}

fn styles_xml() -> Result<String, fmt::Error> {
    let mut xml = String::new();
    write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="{}"/></numFmts><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#,
        escape(AMOUNT_FORMAT)
    )?;
    Ok(xml)
}

fn sheet_xml(document: &ReportDocument<'_>) -> Result<String, fmt::Error> {
    let mut xml = String::with_capacity(2048);
    write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cols>"#
    )?;
    for (index, width) in (1..).zip(COLUMN_WIDTHS) {
        write!(
            xml,
            r#"<col min="{index}" max="{index}" width="{width}" customWidth="1"/>"#
        )?;
    }
    xml.push_str("</cols><sheetData>");

    xml.push_str(r#"<row r="1">"#);
    for (column, header) in COLUMNS.iter().zip(COLUMN_HEADERS) {
        text_cell(&mut xml, *column, 1, header, Some(STYLE_HEADER))?;
    }
    xml.push_str("</row>");

    for (row, line) in (2..).zip(document.aggregate.lines()) {
        write!(xml, r#"<row r="{row}">"#)?;
        text_cell(&mut xml, 'A', row, &line.waste_code, None)?;
        text_cell(&mut xml, 'B', row, &line.label, None)?;
        text_cell(&mut xml, 'C', row, &line.treatment_code, None)?;
        write!(
            xml,
            r#"<c r="D{row}" s="{STYLE_AMOUNT}"><v>{}</v></c>"#,
            line.formatted_kg()
        )?;
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    Ok(xml)
}

fn text_cell(
    xml: &mut String,
    column: char,
    row: usize,
    value: &str,
    style: Option<u8>,
) -> fmt::Result {
    write!(xml, r#"<c r="{column}{row}" t="inlineStr""#)?;
    if let Some(style) = style {
        write!(xml, r#" s="{style}""#)?;
    }
    write!(xml, r#"><is><t xml:space="preserve">{}</t></is></c>"#, escape(value))
}
