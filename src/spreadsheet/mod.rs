//! # Spreadsheet Reading
//!
//! Opens an uploaded workbook, detects its container format from content and
//! returns the first sheet as dense, type-tagged raw rows. Office Open XML
//! (`.xlsx`, `.xlsm`) and OpenDocument (`.ods`) documents are supported; both
//! are zip archives of XML parts read with quick-xml.
pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

use crate::error::EmployeeSheetError;
use crate::helpers::reader::SheetSource;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot detect spreadsheet format of '{0}'")]
    UnknownFormatError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Spreadsheet '{0}' contains no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Spreadsheet '{0}' has no sheet at position {1}")]
    SheetNotFoundError(String, usize),

    #[error("Missing part '{0}' in spreadsheet")]
    FileError(String),

    #[error("Invalid cell value in '{0}' sheet '{1}' at {2}: {3}")]
    CellValueError(String, String, String, String),
}

/// A workbook whose sheets can be read by position.
pub(crate) trait Spreadsheet {
    fn name(&self) -> String;

    fn read_sheet(&mut self, index: usize) -> Result<Sheet, EmployeeSheetError>;
}

/// Opens a workbook, choosing the reader from the archive contents rather than the file name.
pub(crate) fn open_spreadsheet(source: &SheetSource) -> Result<Box<dyn Spreadsheet>, EmployeeSheetError> {
    let name = source.name();
    let mut zip = ZipArchive::new(source.open()?)?;
    if ods::is_ods(&mut zip)? {
        debug!(file = %name, format = "ods", "detected spreadsheet format");
        Ok(Box::new(OdsSpreadsheet::open(&name, zip)?))
    } else if zip.contains("xl/workbook.xml") {
        debug!(file = %name, format = "xlsx", "detected spreadsheet format");
        Ok(Box::new(XlsxSpreadsheet::open(&name, zip)?))
    } else {
        Err(SpreadsheetError::UnknownFormatError(name))?
    }
}

/// Reads the first sheet of a document. Any failure surfaces as `MalformedSheetError`.
pub fn read_first_sheet(source: &SheetSource) -> Result<Sheet, EmployeeSheetError> {
    open_spreadsheet(source)
        .and_then(|mut spreadsheet| {
            let sheet = spreadsheet.read_sheet(0)?;
            debug!(file = %spreadsheet.name(), sheet = sheet.name(), rows = sheet.rows().len(), "read first sheet");
            Ok(sheet)
        })
        .map_err(EmployeeSheetError::malformed)
}
