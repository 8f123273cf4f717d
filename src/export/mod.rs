//! # Export
//!
//! Serializes a table for download, either as CSV or as a single-sheet `.xlsx`
//! workbook. Both formats carry a header row of column labels followed by one
//! row per record, using the display form of each value.
use crate::error::EmployeeSheetError;
use crate::extract::Table;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::write_archive;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::reference::index_to_reference;
use std::fmt::Display;
use std::io::Seek;
use std::io::Write;
use std::str::FromStr;
use tracing::debug;

/// Name of the only worksheet in exported workbooks
pub const SHEET_NAME: &str = "Empregados";

const MAIN_NAMESPACE: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// Fixed download file name
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "empregados_filtrados.csv",
            ExportFormat::Xlsx => "empregados_filtrados.xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Serializes a table into a byte buffer in this format.
    pub fn to_bytes(&self, table: &Table) -> Result<Vec<u8>, EmployeeSheetError> {
        match self {
            ExportFormat::Csv => write_csv(table, Vec::new()),
            ExportFormat::Xlsx => write_xlsx(table, std::io::Cursor::new(Vec::new())).map(|cursor| cursor.into_inner()),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            _ => Err(format!("Unsupported export format '{}', expected csv or xlsx", value)),
        }
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Xlsx => write!(f, "xlsx"),
        }
    }
}

/// Writes comma separated UTF-8 text without an index column and returns the writer.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<W, EmployeeSheetError> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(table.columns())?;
    for row in table.rows() {
        csv_writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    csv_writer.flush()?;
    debug!(records = table.len(), "wrote csv export");
    csv_writer
        .into_inner()
        .map_err(|error| EmployeeSheetError::IoError(error.into_error()))
}

/// Writes a single-sheet workbook. Numbers become numeric cells, every other value an inline string.
pub fn write_xlsx<W: Write + Seek>(table: &Table, writer: W) -> Result<W, EmployeeSheetError> {
    let parts = vec![
        ("[Content_Types].xml".to_owned(), CONTENT_TYPES.as_bytes().to_vec()),
        ("_rels/.rels".to_owned(), ROOT_RELATIONSHIPS.as_bytes().to_vec()),
        ("xl/workbook.xml".to_owned(), workbook_xml()?),
        ("xl/_rels/workbook.xml.rels".to_owned(), WORKBOOK_RELATIONSHIPS.as_bytes().to_vec()),
        ("xl/worksheets/sheet1.xml".to_owned(), worksheet_xml(table)?),
    ];
    let writer = write_archive(writer, parts)?;
    debug!(records = table.len(), "wrote xlsx export");
    Ok(writer)
}

fn workbook_xml() -> Result<Vec<u8>, EmployeeSheetError> {
    let mut xml = XmlWriter::new(Vec::new());
    xml.declaration()?;
    xml.start("workbook", &[("xmlns", MAIN_NAMESPACE), ("xmlns:r", RELATIONSHIPS_NAMESPACE)])?;
    xml.start("sheets", &[])?;
    xml.empty("sheet", &[("name", SHEET_NAME), ("sheetId", "1"), ("r:id", "rId1")])?;
    xml.end("sheets")?;
    xml.end("workbook")?;
    Ok(xml.into_inner())
}

fn worksheet_xml(table: &Table) -> Result<Vec<u8>, EmployeeSheetError> {
    let mut xml = XmlWriter::new(Vec::new());
    xml.declaration()?;
    xml.start("worksheet", &[("xmlns", MAIN_NAMESPACE)])?;
    xml.start("sheetData", &[])?;

    let header: Vec<CellValue> = table.columns().iter().map(|column| CellValue::from(column.as_str())).collect();
    write_row(&mut xml, 0, header.iter())?;
    for (index, row) in table.rows().enumerate() {
        write_row(&mut xml, index + 1, row.into_iter())?;
    }

    xml.end("sheetData")?;
    xml.end("worksheet")?;
    Ok(xml.into_inner())
}

fn write_row<'a, W: Write>(
    xml: &mut XmlWriter<W>,
    row: usize,
    cells: impl Iterator<Item = &'a CellValue>,
) -> Result<(), EmployeeSheetError> {
    let row_number = (row + 1).to_string();
    xml.start("row", &[("r", row_number.as_str())])?;
    for (col, value) in cells.enumerate() {
        if value.is_empty() {
            continue;
        }
        let reference = index_to_reference(row, col);
        match value {
            CellValue::Number(number) if number.is_finite() => {
                xml.start("c", &[("r", reference.as_str())])?;
                xml.element("v", &[], &number.to_string())?;
                xml.end("c")?;
            }
            value => {
                let text = value.to_string();
                xml.start("c", &[("r", reference.as_str()), ("t", "inlineStr")])?;
                xml.start("is", &[])?;
                if text.trim() != text {
                    xml.element("t", &[("xml:space", "preserve")], &text)?;
                } else {
                    xml.element("t", &[], &text)?;
                }
                xml.end("is")?;
                xml.end("c")?;
            }
        }
    }
    xml.end("row")
}
