use crate::spreadsheet::cell::CellValue;

/// One employee row: label to value pairs in header order, company field last.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn push(&mut self, label: &str, value: CellValue) {
        self.fields.push((label.to_owned(), value));
    }

    /// Replaces the value of the field with this label in place, or appends the field.
    pub fn set(&mut self, label: &str, value: CellValue) {
        match self.fields.iter_mut().find(|(name, _)| name == label) {
            Some((_, field)) => *field = value,
            None => self.push(label, value),
        }
    }

    /// Value of the first field with this label
    pub fn get(&self, label: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, CellValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Normalized records plus the union of their labels in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Appends a record, registering labels not seen before.
    pub fn push(&mut self, record: Record) {
        for (label, _) in record.fields() {
            if !self.has_column(label) {
                self.columns.push(label.to_owned());
            }
        }
        self.records.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn has_column(&self, label: &str) -> bool {
        self.columns.iter().any(|column| column == label)
    }

    /// Cell of a record under a table column; absent fields read as empty.
    pub fn value<'a>(&self, record: &'a Record, column: &str) -> &'a CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        record.get(column).unwrap_or(EMPTY)
    }

    /// Records laid out along the table columns
    pub fn rows(&self) -> impl Iterator<Item = Vec<&CellValue>> + '_ {
        self.records
            .iter()
            .map(|record| self.columns.iter().map(|column| self.value(record, column)).collect())
    }

    /// Same columns, another subset of records
    pub(crate) fn with_records(&self, records: Vec<Record>) -> Table {
        Table {
            columns: self.columns.clone(),
            records,
        }
    }

    pub(crate) fn from_parts(columns: Vec<String>, records: Vec<Record>) -> Table {
        Table { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut table = Table::default();
        for record in iter {
            table.push(record);
        }
        table
    }
}
