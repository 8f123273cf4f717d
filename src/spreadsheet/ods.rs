use crate::error::EmployeeSheetError;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use tracing::debug;
use zip::ZipArchive;

/// ODS file MIME type identifier
pub(crate) const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";

const SPREADSHEET: QName = QName(b"office:spreadsheet");
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
/// Cells hidden under a merged region
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
/// Run of spaces, `text:c` gives the count
const SPACES: QName = QName(b"text:s");

/// OpenDocument spreadsheet (.ods)
pub(crate) struct OdsSpreadsheet {
    name: String,
    zip: ZipArchive<SourceReader>,
}

impl OdsSpreadsheet {
    pub(crate) fn open(name: &str, mut zip: ZipArchive<SourceReader>) -> Result<Self, EmployeeSheetError> {
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(name.to_owned()))?;
        }
        debug!(file = name, "opened ods document");
        Ok(OdsSpreadsheet {
            name: name.to_owned(),
            zip,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn read_sheet(&mut self, index: usize) -> Result<Sheet, EmployeeSheetError> {
        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_string()))?;

        // Skip ahead to the requested table
        let mut table_index = 0usize;
        let mut sheet = None::<Sheet>;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == SPREADSHEET => break,
            Event::Start(event) if event.name() == TABLE => {
                if table_index == index {
                    let table_name = event.get_attribute_value("table:name")?.unwrap_or_default();
                    sheet = Some(Sheet::new(&self.name, &table_name));
                    break;
                }
                table_index += 1;
            }
        });
        let mut sheet = sheet.ok_or_else(|| SpreadsheetError::SheetNotFoundError(self.name.to_owned(), index))?;

        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        // Inside a string cell whose text comes from child paragraphs
        let mut element_context = false;
        let mut comment_context = false;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == TABLE => break,
            Event::Start(event) if event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if event.name() == TABLE_ROW => row += row_count,
            Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                value.clear();
                col_count = event.parse_attribute_value("table:number-columns-repeated")?.unwrap_or(1);
                kind = match event.get_attribute_value("office:value-type")?.as_deref() {
                    Some("boolean") => CellType::Boolean,
                    Some("date") => CellType::IsoDateTime,
                    Some("time") => CellType::IsoDuration,
                    Some("string") => CellType::InlineString,
                    Some(_) => CellType::Number,
                    None => CellType::Empty,
                };
                match kind {
                    CellType::InlineString => element_context = true,
                    CellType::Boolean => {
                        let truthy = event.get_attribute_value("office:boolean-value")?
                            .map(|flag| flag != "false" && flag != "0")
                            .unwrap_or(false);
                        value.push(if truthy { '1' } else { '0' });
                    }
                    CellType::IsoDateTime => if let Some(data) = event.get_attribute_value("office:date-value")? {
                        value.push_str(&data);
                    },
                    CellType::IsoDuration => if let Some(data) = event.get_attribute_value("office:time-value")? {
                        value.push_str(&data);
                    },
                    CellType::Number => if let Some(data) = event.get_attribute_value("office:value")? {
                        value.push_str(&data);
                    },
                    _ => (),
                }
            }
            Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                if kind != CellType::Empty && !value.is_empty() {
                    let cell = Cell {
                        row,
                        col,
                        kind,
                        value: value.to_owned(),
                    };
                    let decoded = cell.to_value(&[]).map_err(|message| {
                        SpreadsheetError::CellValueError(
                            self.name.to_owned(),
                            sheet.name.to_owned(),
                            cell.reference(),
                            message,
                        )
                    })?;
                    for row_offset in 0..row_count {
                        for col_offset in 0..col_count {
                            sheet.push(row + row_offset, col + col_offset, decoded.clone());
                        }
                    }
                }
                col += col_count;
                kind = CellType::Empty;
                element_context = false;
                comment_context = false;
            }
            Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if element_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == SPACES => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                value.push_str(&" ".repeat(count));
            }
            Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
        });
        sheet.finish();
        Ok(sheet)
    }
}

/// Returns true when the archive's `mimetype` entry names an OpenDocument spreadsheet
pub(crate) fn is_ods(zip: &mut ZipArchive<SourceReader>) -> Result<bool, EmployeeSheetError> {
    match zip.file("mimetype")? {
        Some(mut file) => {
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)?;
            Ok(buffer.trim_ascii() == MIME_TYPE)
        }
        None => Ok(false),
    }
}

/// Encrypted documents list `manifest:encryption-data` under a file entry
fn is_password_protected(zip: &mut ZipArchive<SourceReader>) -> Result<bool, EmployeeSheetError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::End(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}
