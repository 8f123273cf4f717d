//! # Block Extraction
//!
//! Recovers one normalized table from a sheet holding several company sections
//! stacked vertically. Each section looks like:
//!
//! ```text
//! Empresa              | ACME
//! Matrícula            | Empregado | Cargo    | Cidade de Atuação
//! 001                  | Ana       | Analista | Recife
//! Total de empregados: 1
//! ```
//!
//! A block is emitted only when its total row is reached. Rows of a block that is
//! never closed are dropped and counted in [`Diagnostics`].
mod record;

pub use record::Record;
pub use record::Table;

use crate::error::EmployeeSheetError;
use crate::spreadsheet::cell::CellValue;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Header at row {row} differs from the first header: expected [{expected}], found [{found}]")]
    HeaderMismatchError {
        row: usize,
        expected: String,
        found: String,
    },
}

/// Literal tokens recognised in the first column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Markers {
    /// Introduces a company section, the name sits in the second column.
    pub company: String,
    /// Prefix of the row closing a block.
    pub total_prefix: String,
    /// First label of the header row.
    pub header: String,
    /// Label of the field injected into every record.
    pub company_field: String,
}

impl Default for Markers {
    fn default() -> Self {
        Markers {
            company: "Empresa".to_owned(),
            total_prefix: "Total de empregados".to_owned(),
            header: "Matrícula".to_owned(),
            company_field: "empresa".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    pub markers: Markers,
    /// Fail when a block header differs from the first one instead of relabelling.
    pub strict_headers: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            markers: Markers::default(),
            strict_headers: true,
        }
    }
}

/// Counters describing how a sheet was segmented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub blocks: usize,
    pub records: usize,
    /// Total rows seen while no block was open
    pub stray_totals: usize,
    /// Non-blank rows of blocks that were never closed
    pub dropped_rows: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Extraction {
    pub table: Table,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, PartialEq, Eq)]
enum RowKind {
    Company,
    Total,
    Header,
    Data,
}

impl Markers {
    fn classify(&self, row: &[CellValue]) -> RowKind {
        match row.first().and_then(CellValue::as_text) {
            Some(text) if text == self.company => RowKind::Company,
            Some(text) if text.starts_with(&self.total_prefix) => RowKind::Total,
            Some(text) if text == self.header => RowKind::Header,
            _ => RowKind::Data,
        }
    }
}

/// Scans rows top to bottom and reassembles every closed block into one table.
///
/// Data rows take their labels positionally from the latest header: missing
/// cells become [`CellValue::Empty`] and cells beyond the header are dropped.
/// Each record ends with the company field holding the latest company name.
pub fn extract_blocks(rows: &[Vec<CellValue>], options: &ExtractOptions) -> Result<Extraction, EmployeeSheetError> {
    let markers = &options.markers;
    let mut table = Table::default();
    let mut diagnostics = Diagnostics::default();

    let mut current_company = None::<CellValue>;
    let mut block_start = None::<usize>;
    let mut first_header = None::<Vec<String>>;
    let mut header_labels = Vec::<String>::new();

    for (index, row) in rows.iter().enumerate() {
        match markers.classify(row) {
            RowKind::Company => {
                let company = row.get(1).cloned().unwrap_or_default();
                debug!(row = index, company = %company, "company section");
                current_company = Some(company);
            }
            RowKind::Total => {
                match block_start.take() {
                    Some(start) => {
                        let company = current_company.clone().unwrap_or_default();
                        let before = table.len();
                        for data in rows[start..index].iter().filter(|data| markers.classify(data) == RowKind::Data) {
                            table.push(label_row(data, &header_labels, &markers.company_field, &company));
                        }
                        diagnostics.blocks += 1;
                        debug!(start, end = index, records = table.len() - before, "closed block");
                    }
                    None => {
                        diagnostics.stray_totals += 1;
                        warn!(row = index, "total row without an open block");
                    }
                }
            }
            RowKind::Header => {
                if let Some(start) = block_start {
                    let dropped = count_non_blank(&rows[start..index]);
                    if dropped > 0 {
                        diagnostics.dropped_rows += dropped;
                        warn!(start, end = index, dropped, "block without total row, rows dropped");
                    }
                }
                let labels = header_to_labels(row);
                let expected = first_header.get_or_insert_with(|| labels.clone());
                if *expected != labels {
                    if options.strict_headers {
                        Err(ExtractError::HeaderMismatchError {
                            row: index + 1,
                            expected: expected.join(", "),
                            found: labels.join(", "),
                        })?;
                    }
                    warn!(row = index + 1, expected = ?expected, found = ?labels, "header differs from the first header");
                }
                header_labels = labels;
                block_start = Some(index + 1);
            }
            RowKind::Data => (),
        }
    }

    if let Some(start) = block_start {
        let dropped = count_non_blank(&rows[start.min(rows.len())..]);
        if dropped > 0 {
            diagnostics.dropped_rows += dropped;
            warn!(start, dropped, "trailing block without total row, rows dropped");
        }
    }

    diagnostics.records = table.len();
    info!(
        blocks = diagnostics.blocks,
        records = diagnostics.records,
        stray_totals = diagnostics.stray_totals,
        dropped_rows = diagnostics.dropped_rows,
        "extraction finished"
    );
    Ok(Extraction { table, diagnostics })
}

/// Header cells as labels. Trailing blank cells come from row padding and are cut;
/// a blank cell in the middle is named after its 1-based position. A repeated label
/// gets a `.N` suffix so every column survives.
fn header_to_labels(row: &[CellValue]) -> Vec<String> {
    let width = row.iter().rposition(|cell| !cell.is_empty()).map_or(0, |last| last + 1);
    let mut labels = Vec::<String>::with_capacity(width);
    for (index, cell) in row[..width].iter().enumerate() {
        let base = match cell {
            cell if cell.is_empty() => format!("column{}", index + 1),
            cell => cell.to_string(),
        };
        let mut label = base.clone();
        let mut suffix = 0;
        while labels.contains(&label) {
            suffix += 1;
            label = format!("{base}.{suffix}");
        }
        labels.push(label);
    }
    labels
}

fn label_row(row: &[CellValue], labels: &[String], company_field: &str, company: &CellValue) -> Record {
    let mut record: Record = labels
        .iter()
        .enumerate()
        .map(|(index, label)| (label.to_owned(), row.get(index).cloned().unwrap_or_default()))
        .collect();
    record.set(company_field, company.clone());
    record
}

fn count_non_blank(rows: &[Vec<CellValue>]) -> usize {
    rows.iter().filter(|row| !row.iter().all(CellValue::is_empty)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<CellValue>> {
        data.iter()
            .map(|row| row.iter().map(|cell| if cell.is_empty() { CellValue::Empty } else { CellValue::from(*cell) }).collect())
            .collect()
    }

    const HEADER: &[&str] = &["Matrícula", "Empregado", "Cargo", "Cidade de Atuação"];

    #[test]
    fn concrete_scenario() {
        let sheet = rows(&[
            &["Empresa", "ACME"],
            HEADER,
            &["001", "Ana", "Analista", "Recife"],
            &["Total de empregados: 1"],
        ]);
        let extraction = extract_blocks(&sheet, &ExtractOptions::default()).unwrap();
        let table = &extraction.table;
        assert_eq!(table.columns(), &["Matrícula", "Empregado", "Cargo", "Cidade de Atuação", "empresa"]);
        assert_eq!(table.len(), 1);
        let record = &table.records()[0];
        assert_eq!(record.get("Matrícula"), Some(&CellValue::from("001")));
        assert_eq!(record.get("Empregado"), Some(&CellValue::from("Ana")));
        assert_eq!(record.get("Cargo"), Some(&CellValue::from("Analista")));
        assert_eq!(record.get("Cidade de Atuação"), Some(&CellValue::from("Recife")));
        assert_eq!(record.get("empresa"), Some(&CellValue::from("ACME")));
        assert_eq!(extraction.diagnostics, Diagnostics { blocks: 1, records: 1, stray_totals: 0, dropped_rows: 0 });
    }

    #[test]
    fn every_record_tagged_with_its_company() {
        let sheet = rows(&[
            &["Relatório de empregados"],
            &["Empresa", "ACME"],
            HEADER,
            &["001", "Ana", "Analista", "Recife"],
            &["002", "Bruno", "Gerente", "Olinda"],
            &["Total de empregados: 2"],
            &[],
            &["Empresa", "Beta"],
            HEADER,
            &["101", "Carla", "Analista de Sistemas", "Recife"],
            &["102", "Davi", "Técnico", "Caruaru"],
            &["103", "Eva", "Analista", "Olinda"],
            &["Total de empregados: 3"],
        ]);
        let extraction = extract_blocks(&sheet, &ExtractOptions::default()).unwrap();
        let table = extraction.table;
        assert_eq!(table.len(), 5);
        let companies: Vec<String> = table.records().iter().map(|record| record.get("empresa").unwrap().to_string()).collect();
        assert_eq!(companies, vec!["ACME", "ACME", "Beta", "Beta", "Beta"]);
        let names: Vec<String> = table.records().iter().map(|record| record.get("Empregado").unwrap().to_string()).collect();
        assert_eq!(names, vec!["Ana", "Bruno", "Carla", "Davi", "Eva"]);
        assert_eq!(extraction.diagnostics.blocks, 2);
    }

    #[test]
    fn sentinels_never_become_data() {
        let sheet = rows(&[
            &["Empresa", "ACME"],
            HEADER,
            &["001", "Ana", "Analista", "Recife"],
            &["Empresa", "ACME Filial"],
            &["002", "Bruno", "Gerente", "Olinda"],
            &["Total de empregados: 2"],
        ]);
        let table = extract_blocks(&sheet, &ExtractOptions::default()).unwrap().table;
        assert_eq!(table.len(), 2);
        for record in table.records() {
            let first = record.get("Matrícula").unwrap().to_string();
            assert_ne!(first, "Empresa");
            assert_ne!(first, "Matrícula");
            assert!(!first.starts_with("Total de empregados"));
        }
        // The company in force when the block closes wins
        assert_eq!(table.records()[0].get("empresa"), Some(&CellValue::from("ACME Filial")));
    }

    #[test]
    fn unterminated_block_is_dropped_and_counted() {
        let sheet = rows(&[
            &["Empresa", "ACME"],
            HEADER,
            &["001", "Ana", "Analista", "Recife"],
            &["Total de empregados: 1"],
            &["Empresa", "Beta"],
            HEADER,
            &["101", "Carla", "Analista", "Recife"],
            &["102", "Davi", "Técnico", "Caruaru"],
            &["", "", "", ""],
        ]);
        let extraction = extract_blocks(&sheet, &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.table.len(), 1);
        assert_eq!(extraction.diagnostics.blocks, 1);
        assert_eq!(extraction.diagnostics.dropped_rows, 2);
    }

    #[test]
    fn header_without_total_restarts_block() {
        let sheet = rows(&[
            &["Empresa", "ACME"],
            HEADER,
            &["001", "Ana", "Analista", "Recife"],
            HEADER,
            &["002", "Bruno", "Gerente", "Olinda"],
            &["Total de empregados: 1"],
        ]);
        let extraction = extract_blocks(&sheet, &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.table.len(), 1);
        assert_eq!(extraction.table.records()[0].get("Empregado"), Some(&CellValue::from("Bruno")));
        assert_eq!(extraction.diagnostics.dropped_rows, 1);
    }

    #[test]
    fn stray_total_is_ignored() {
        let sheet = rows(&[
            &["Total de empregados: 0"],
            &["Empresa", "ACME"],
            HEADER,
            &["Total de empregados: 0"],
            &["Total de empregados: 0"],
        ]);
        let extraction = extract_blocks(&sheet, &ExtractOptions::default()).unwrap();
        assert!(extraction.table.is_empty());
        assert_eq!(extraction.diagnostics.blocks, 1);
        assert_eq!(extraction.diagnostics.stray_totals, 2);
    }

    #[test]
    fn no_markers_yields_empty_table() {
        let sheet = rows(&[&["Nome", "Cidade"], &["Ana", "Recife"], &[]]);
        let extraction = extract_blocks(&sheet, &ExtractOptions::default()).unwrap();
        assert!(extraction.table.is_empty());
        assert!(extraction.table.columns().is_empty());
        assert_eq!(extraction.diagnostics, Diagnostics::default());
        assert!(extract_blocks(&[], &ExtractOptions::default()).unwrap().table.is_empty());
    }

    #[test]
    fn positional_labels_pad_and_truncate() {
        let mut sheet = rows(&[
            &["Matrícula", "Empregado", "", "Cidade de Atuação", "", ""],
            &["001", "Ana"],
            &["002", "Bruno", "x", "Olinda", "sobra", "mais"],
            &["Total de empregados: 2"],
        ]);
        sheet[1].push(CellValue::Empty);
        let table = extract_blocks(&sheet, &ExtractOptions::default()).unwrap().table;
        assert_eq!(table.columns(), &["Matrícula", "Empregado", "column3", "Cidade de Atuação", "empresa"]);
        let first = &table.records()[0];
        assert_eq!(first.get("Cidade de Atuação"), Some(&CellValue::Empty));
        // No company row seen yet
        assert_eq!(first.get("empresa"), Some(&CellValue::Empty));
        let second = &table.records()[1];
        assert_eq!(second.len(), 5);
        assert_eq!(second.get("column3"), Some(&CellValue::from("x")));
    }

    #[test]
    fn total_detection_only_on_text() {
        let sheet = vec![
            vec![CellValue::from("Empresa"), CellValue::Number(42.0)],
            vec![CellValue::from("Matrícula"), CellValue::from("Empregado")],
            vec![CellValue::Number(1.0), CellValue::from("Ana")],
            vec![CellValue::Empty, CellValue::from("Total de empregados")],
            vec![CellValue::from("Total de empregados: 2")],
        ];
        let table = extract_blocks(&sheet, &ExtractOptions::default()).unwrap().table;
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].get("Matrícula"), Some(&CellValue::Number(1.0)));
        assert_eq!(table.records()[0].get("empresa"), Some(&CellValue::Number(42.0)));
    }

    #[test]
    fn header_mismatch_strict() {
        let sheet = rows(&[
            &["Empresa", "ACME"],
            HEADER,
            &["001", "Ana", "Analista", "Recife"],
            &["Total de empregados: 1"],
            &["Empresa", "Beta"],
            &["Matrícula", "Empregado", "Cidade de Atuação", "Cargo"],
            &["101", "Carla", "Recife", "Analista"],
            &["Total de empregados: 1"],
        ]);
        let error = extract_blocks(&sheet, &ExtractOptions::default()).unwrap_err();
        match error {
            EmployeeSheetError::ExtractError(ExtractError::HeaderMismatchError { row, .. }) => assert_eq!(row, 6),
            error => panic!("unexpected error: {error}"),
        }

        let lenient = ExtractOptions { strict_headers: false, ..ExtractOptions::default() };
        let table = extract_blocks(&sheet, &lenient).unwrap().table;
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1].get("Cargo"), Some(&CellValue::from("Analista")));
        assert_eq!(table.records()[1].get("Cidade de Atuação"), Some(&CellValue::from("Recife")));
    }

    #[test]
    fn company_overrides_header_column_of_the_same_name() {
        let sheet = rows(&[
            &["Empresa", "ACME"],
            &["Matrícula", "Empregado", "empresa"],
            &["001", "Ana", "antiga"],
            &["Total de empregados: 1"],
        ]);
        let table = extract_blocks(&sheet, &ExtractOptions::default()).unwrap().table;
        assert_eq!(table.columns(), &["Matrícula", "Empregado", "empresa"]);
        assert_eq!(table.records()[0].len(), 3);
        assert_eq!(table.records()[0].get("empresa"), Some(&CellValue::from("ACME")));
        let csv = String::from_utf8(crate::export::write_csv(&table, Vec::new()).unwrap()).unwrap();
        assert_eq!(csv, "Matrícula,Empregado,empresa\n001,Ana,ACME\n");
    }

    #[test]
    fn repeated_header_labels_are_suffixed() {
        let sheet = rows(&[
            &["Empresa", "ACME"],
            &["Matrícula", "Cargo", "Cargo", "Cargo.1", "Cargo"],
            &["001", "Analista", "Sênior", "x", "Pleno"],
            &["Total de empregados: 1"],
        ]);
        let table = extract_blocks(&sheet, &ExtractOptions::default()).unwrap().table;
        assert_eq!(table.columns(), &["Matrícula", "Cargo", "Cargo.1", "Cargo.1.1", "Cargo.2", "empresa"]);
        let row: Vec<String> = table.rows().next().unwrap().iter().map(|value| value.to_string()).collect();
        assert_eq!(row, vec!["001", "Analista", "Sênior", "x", "Pleno", "ACME"]);
    }

    #[test]
    fn custom_markers() {
        let sheet = rows(&[
            &["Company", "ACME"],
            &["Id", "Name"],
            &["1", "Ana"],
            &["Total: 1"],
        ]);
        let options = ExtractOptions {
            markers: Markers {
                company: "Company".to_owned(),
                total_prefix: "Total".to_owned(),
                header: "Id".to_owned(),
                company_field: "company".to_owned(),
            },
            strict_headers: true,
        };
        let table = extract_blocks(&sheet, &options).unwrap().table;
        assert_eq!(table.columns(), &["Id", "Name", "company"]);
        assert_eq!(table.records()[0].get("company"), Some(&CellValue::from("ACME")));
    }
}
