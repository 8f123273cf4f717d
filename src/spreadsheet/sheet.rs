use crate::spreadsheet::cell::CellValue;

/// First-sheet contents as dense raw rows, indexed from row 1 / column A.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    rows: Vec<Vec<CellValue>>,
    /// Highest populated column (0-based)
    col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            rows: Vec::new(),
            col_upper_bound: None,
        }
    }

    /// Builds a sheet from rows already in memory.
    pub fn from_rows(name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        let mut sheet = Sheet::new("", name);
        for (row, cells) in rows.into_iter().enumerate() {
            for (col, value) in cells.into_iter().enumerate() {
                sheet.push(row, col, value);
            }
        }
        sheet.finish();
        sheet
    }

    /// Name of the document the sheet was read from
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Places a value, growing the grid with empty cells as needed. Empty values only reserve space.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Pads every row to the sheet width so positional access never runs short mid-table.
    pub(crate) fn finish(&mut self) {
        if let Some(col_upper_bound) = self.col_upper_bound {
            for cells in &mut self.rows {
                cells.resize(col_upper_bound + 1, CellValue::Empty);
            }
        }
    }
}
