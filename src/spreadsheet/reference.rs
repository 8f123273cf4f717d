//! Conversions between A1-style references and 0-based (row, col) indexes

/// Sheet bounds of the OOXML format, column XFD and row 1048576.
const MAX_COLUMNS: usize = 16_384;
const MAX_ROWS: usize = 1_048_576;

/// Parses a column label ("A", "AB") to a 0-based index.
pub(crate) fn col_to_index(col: &str) -> Option<usize> {
    if col.is_empty() {
        return None;
    }
    col.chars().try_fold(0usize, |index, letter| {
        if !letter.is_ascii_alphabetic() {
            return None;
        }
        index
            .checked_mul(26)?
            .checked_add(letter.to_ascii_uppercase() as usize - 'A' as usize + 1)
    }).map(|index| index - 1).filter(|index| *index < MAX_COLUMNS)
}

/// Parses a 1-based row number to a 0-based index.
pub(crate) fn row_to_index(row: &str) -> Option<usize> {
    row.parse::<usize>().ok().filter(|row| (1..=MAX_ROWS).contains(row)).map(|row| row - 1)
}

/// Splits "C12" into (11, 2).
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|character: char| character.is_ascii_digit())?;
    let (col, row) = reference.split_at(split);
    Some((row_to_index(row)?, col_to_index(col)?))
}

/// Formats (11, 2) as "C12".
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut label = String::new();
    let mut col = col + 1;
    while col > 0 {
        col -= 1;
        label.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    format!("{}{}", label, row + 1)
}
