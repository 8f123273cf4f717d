use thiserror::Error;

/// Main error type for the employee sheet crate.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum EmployeeSheetError {
    #[error("{0}")]
    WithContextError(String),

    /// The uploaded document cannot be read as a spreadsheet at all.
    #[error("Malformed spreadsheet: {0}")]
    MalformedSheetError(#[source] Box<EmployeeSheetError>),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    ParseDateTimeError(#[from] chrono::ParseError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    // Extraction and filtering errors
    #[error("{0}")]
    ExtractError(#[from] crate::extract::ExtractError),

    #[error("{0}")]
    FilterError(#[from] crate::filter::FilterError),
}

impl EmployeeSheetError {
    /// Wraps a reading failure as `MalformedSheetError`, leaving already wrapped errors alone.
    pub(crate) fn malformed(error: EmployeeSheetError) -> EmployeeSheetError {
        match error {
            EmployeeSheetError::MalformedSheetError(_) => error,
            error => EmployeeSheetError::MalformedSheetError(Box::new(error)),
        }
    }

    /// Returns true if the document could not be read as a spreadsheet.
    pub fn is_malformed_sheet(&self) -> bool {
        matches!(self, EmployeeSheetError::MalformedSheetError(_))
    }

    /// Returns true if a filter or projection referenced a column the table lacks.
    pub fn is_missing_column(&self) -> bool {
        matches!(
            self,
            EmployeeSheetError::FilterError(crate::filter::FilterError::MissingColumnError(_))
        )
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, EmployeeSheetError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| EmployeeSheetError::WithContextError(format!("{}: {}", message, e)))
    }
}
