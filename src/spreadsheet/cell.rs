use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::fmt::Display;

/// Storage types of cells as they appear in the workbook XML, before decoding.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as "1" / "0"
    Boolean,
    /// Numeric values
    Number,
    /// Date/time serials from the 1900 epoch
    NumberDateTime1900,
    NumberDate1900,
    NumberTime1900,
    /// Date/time serials from the 1904 epoch
    NumberDateTime1904,
    NumberDate1904,
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// ISO 8601 duration strings (ODS time cells)
    IsoDuration,
    /// Inline or formula string values
    InlineString,
    /// Index into the shared string table
    SharedString,
    /// Error literals such as `#N/A`
    Error,
}

impl CellType {
    /// Maps built-in Excel number format IDs to date/time cell types.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Classifies a custom number format code by the date/time tokens outside literals and brackets.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }
}

/// A decoded cell value.
///
/// Spreadsheet cells are heterogeneous; marker detection and filtering only ever
/// look at the `Text` variant, everything else is compared through its display form.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Returns the string content of a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => write!(f, "{}", text),
            // Integral numbers print without ".0": 1001 rather than 1001.0
            CellValue::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => write!(f, "{}", *number as i64),
            CellValue::Number(number) => write!(f, "{}", number),
            CellValue::Bool(value) => write!(f, "{}", value),
            CellValue::Date(datetime) if datetime.time() == NaiveTime::MIN => write!(f, "{}", datetime.format("%Y-%m-%d")),
            CellValue::Date(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Largest date serial accepted, well past the last date chrono represents.
const MAX_DATE_SERIAL: f64 = 1e9;

/// Raw cell as read from the workbook: position, storage type and undecoded text.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Decodes the raw text into a typed value, resolving shared strings.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<CellValue, String> {
        let value = match self.kind {
            CellType::Empty => CellValue::Empty,
            CellType::Boolean => CellValue::Bool(self.value == "1"),
            CellType::Number => CellValue::Number(self.to_double()?),
            CellType::NumberDateTime1900 | CellType::NumberDate1900 => CellValue::Date(self.to_datetime(false)?),
            CellType::NumberDateTime1904 | CellType::NumberDate1904 => CellValue::Date(self.to_datetime(true)?),
            CellType::NumberTime1900 | CellType::NumberTime1904 => CellValue::Text(to_time_string(self.to_double()?)),
            CellType::IsoDateTime => parse_iso_datetime(&self.value)
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::Text(self.value.to_owned())),
            CellType::IsoDuration => CellValue::Text(
                parse_iso_duration(&self.value).unwrap_or_else(|| self.value.to_owned()),
            ),
            CellType::InlineString | CellType::Error => CellValue::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self.value
                    .parse::<usize>()
                    .map_err(|_| format!("invalid shared string index '{}'", self.value))?;
                let string = shared_strings
                    .get(index)
                    .ok_or_else(|| format!("shared string index {} out of range", index))?;
                CellValue::Text(string.to_owned())
            }
        };
        Ok(value)
    }

    fn to_double(&self) -> Result<f64, String> {
        self.value.parse::<f64>().map_err(|_| format!("parse '{}' to double failed", self.value))
    }

    /// Converts a date serial to a timestamp.
    /// The 1900 system counts the phantom 1900-02-29 (Lotus 1-2-3 bug), so serials below 60 shift by a day.
    fn to_datetime(&self, is_1904: bool) -> Result<NaiveDateTime, String> {
        let out_of_range = || format!("date serial '{}' out of range", self.value);
        let serial = self.to_double()?;
        if !serial.is_finite() || serial.abs() > MAX_DATE_SERIAL {
            return Err(out_of_range());
        }
        let days = serial.trunc() as i64;
        let offset = if is_1904 {
            1462
        } else if days < 60 {
            1
        } else {
            0
        };
        let micros = (serial.fract() * 86_400_000_000f64).round() as i64;
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
            .expect("NaiveDate Literal")
            .and_time(NaiveTime::MIN);
        days.checked_add(offset)
            .and_then(Duration::try_days)
            .and_then(|delta| delta.checked_add(&Duration::microseconds(micros)))
            .and_then(|delta| epoch.checked_add_signed(delta))
            .ok_or_else(out_of_range)
    }
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    if value.contains('T') {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN))
    }
}

/// Formats an ODS time value such as `PT08H30M00S` or `-PT1H5M3.5S` as `HH:MM:SS`.
/// Fractional seconds round to the nearest second.
fn parse_iso_duration(value: &str) -> Option<String> {
    let (negative, value) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let mut rest = value.strip_prefix("PT")?;
    let mut seconds = 0f64;
    while !rest.is_empty() {
        let split = rest.find(|character: char| character.is_ascii_alphabetic())?;
        let amount = rest[..split].parse::<f64>().ok()?;
        seconds += amount * match &rest[split..split + 1] {
            "H" => 3600f64,
            "M" => 60f64,
            "S" => 1f64,
            _ => return None,
        };
        rest = &rest[split + 1..];
    }
    if !seconds.is_finite() {
        return None;
    }
    let mut seconds = seconds.round() as i64;
    let second = seconds % 60; seconds /= 60;
    let minute = seconds % 60; seconds /= 60;
    let sign = if negative { "-" } else { "" };
    Some(format!("{sign}{seconds:02}:{minute:02}:{second:02}"))
}

/// Formats a day fraction as `HH:MM:SS`.
fn to_time_string(factor: f64) -> String {
    let mut seconds = (factor * 86_400f64).round() as i64;
    let second = seconds % 60; seconds /= 60;
    let minute = seconds % 60; seconds /= 60;
    format!("{seconds:02}:{minute:02}:{second:02}")
}
