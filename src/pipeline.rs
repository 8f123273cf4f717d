//! Read, extract and filter in one stateless pass.
use crate::error::EmployeeSheetError;
use crate::extract::extract_blocks;
use crate::extract::Diagnostics;
use crate::extract::ExtractOptions;
use crate::extract::Extraction;
use crate::extract::Table;
use crate::filter;
use crate::filter::FilterCriteria;
use crate::helpers::reader::SheetSource;
use crate::spreadsheet::read_first_sheet;
use tracing::info;
use tracing::warn;

/// Result of a pipeline pass.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// No complete block was found, nothing to filter.
    NoData(Diagnostics),
    Records {
        /// Records matching the criteria
        table: Table,
        /// Distinct cities of the unfiltered table
        cities: Vec<String>,
        /// Distinct job titles of the unfiltered table
        job_titles: Vec<String>,
        diagnostics: Diagnostics,
    },
}

/// Reads the first sheet of a document and extracts its blocks.
pub fn load(source: &SheetSource, options: &ExtractOptions) -> Result<Extraction, EmployeeSheetError> {
    let sheet = read_first_sheet(source)?;
    info!(file = sheet.file_name(), sheet = sheet.name(), rows = sheet.rows().len(), "read sheet");
    extract_blocks(sheet.rows(), options)
}

/// Filters an extraction already in memory, so callers can keep one extraction across filter changes.
pub fn select(extraction: &Extraction, criteria: &FilterCriteria) -> Result<Outcome, EmployeeSheetError> {
    let diagnostics = extraction.diagnostics;
    if extraction.table.is_empty() {
        warn!("no records found in spreadsheet");
        return Ok(Outcome::NoData(diagnostics));
    }
    let cities = filter::distinct_values(&extraction.table, filter::CITY_COLUMN)?;
    let job_titles = filter::distinct_values(&extraction.table, filter::JOB_COLUMN)?;
    let table = filter::apply(&extraction.table, criteria)?;
    Ok(Outcome::Records {
        table,
        cities,
        job_titles,
        diagnostics,
    })
}

/// Loads the document, then filters it.
pub fn run(source: &SheetSource, criteria: &FilterCriteria, options: &ExtractOptions) -> Result<Outcome, EmployeeSheetError> {
    let extraction = load(source, options)?;
    select(&extraction, criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellValue;
    use crate::spreadsheet::tests::ods_bytes;
    use crate::spreadsheet::tests::xlsx_bytes;
    use std::io::Write;

    const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<si><t>Empresa</t></si>
<si><t>ACME</t></si>
<si><t>Matrícula</t></si>
<si><t>Empregado</t></si>
<si><t>Cargo</t></si>
<si><t>Cidade de Atuação</t></si>
<si><t>Ana</t></si>
<si><t>Analista</t></si>
<si><t>Recife</t></si>
<si><t>Total de empregados: 1</t></si>
<si><t>Beta</t></si>
<si><t>Bruno</t></si>
<si><t>Gerente de Vendas</t></si>
<si><t>recife</t></si>
<si><t>Carla</t></si>
<si><t>Analista de Sistemas</t></si>
<si><t>Olinda</t></si>
<si><t>Total de empregados: 2</t></si>
</sst>"#;

    fn cell(reference: &str, shared: usize) -> String {
        format!(r#"<c r="{reference}" t="s"><v>{shared}</v></c>"#)
    }

    fn header(row: usize) -> String {
        format!(
            r#"<row r="{row}">{}{}{}{}</row>"#,
            cell(&format!("A{row}"), 2),
            cell(&format!("B{row}"), 3),
            cell(&format!("C{row}"), 4),
            cell(&format!("D{row}"), 5)
        )
    }

    fn workbook() -> Vec<u8> {
        let worksheet = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1">{}{}</row>
{}
<row r="3"><c r="A3"><v>1</v></c>{}{}{}</row>
<row r="4">{}</row>
<row r="6">{}{}</row>
{}
<row r="8"><c r="A8"><v>2</v></c>{}{}{}</row>
<row r="9"><c r="A9"><v>3</v></c>{}{}{}</row>
<row r="10">{}</row>
<row r="12">{}{}</row>
{}
<row r="14"><c r="A14"><v>4</v></c>{}{}{}</row>
</sheetData></worksheet>"#,
            cell("A1", 0), cell("B1", 1),
            header(2),
            cell("B3", 6), cell("C3", 7), cell("D3", 8),
            cell("A4", 9),
            cell("A6", 0), cell("B6", 10),
            header(7),
            cell("B8", 11), cell("C8", 12), cell("D8", 13),
            cell("B9", 14), cell("C9", 15), cell("D9", 16),
            cell("A10", 17),
            cell("A12", 0), cell("B12", 1),
            header(13),
            cell("B14", 6), cell("C14", 7), cell("D14", 8),
        );
        xlsx_bytes(&[("Plan1", &worksheet)], Some(SHARED_STRINGS), None)
    }

    fn names(table: &Table) -> Vec<String> {
        table.records().iter().map(|record| table.value(record, "Empregado").to_string()).collect()
    }

    #[test]
    fn load_xlsx_upload() {
        let source = SheetSource::from_bytes("empregados.xlsx", workbook());
        let extraction = load(&source, &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.table.len(), 3);
        assert_eq!(extraction.diagnostics.blocks, 2);
        // The last block never reaches a total row
        assert_eq!(extraction.diagnostics.dropped_rows, 1);
        let record = &extraction.table.records()[0];
        assert_eq!(record.get("Matrícula"), Some(&CellValue::Number(1.0)));
        assert_eq!(record.get("empresa"), Some(&CellValue::from("ACME")));
        assert_eq!(extraction.table.records()[2].get("empresa"), Some(&CellValue::from("Beta")));
    }

    #[test]
    fn run_with_criteria() {
        let source = SheetSource::from_bytes("empregados.xlsx", workbook());
        let criteria = FilterCriteria::new().with_city("RECIFE").with_job_title("analista");
        match run(&source, &criteria, &ExtractOptions::default()).unwrap() {
            Outcome::Records { table, cities, job_titles, .. } => {
                assert_eq!(names(&table), vec!["Ana"]);
                assert_eq!(cities, vec!["Olinda", "Recife", "recife"]);
                assert_eq!(job_titles, vec!["Analista", "Analista de Sistemas", "Gerente de Vendas"]);
            }
            outcome => panic!("unexpected outcome: {outcome:?}"),
        }

        let criteria = FilterCriteria::new().with_city("recife");
        match run(&source, &criteria, &ExtractOptions::default()).unwrap() {
            Outcome::Records { table, .. } => assert_eq!(names(&table), vec!["Ana", "Bruno"]),
            outcome => panic!("unexpected outcome: {outcome:?}"),
        }
    }

    #[test]
    fn run_from_file() {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(&workbook()).unwrap();
        let source = SheetSource::from_path(file.path());
        match run(&source, &FilterCriteria::new(), &ExtractOptions::default()).unwrap() {
            Outcome::Records { table, .. } => assert_eq!(table.len(), 3),
            outcome => panic!("unexpected outcome: {outcome:?}"),
        }
    }

    #[test]
    fn sheet_without_blocks_is_no_data() {
        let content = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
<office:body><office:spreadsheet><table:table table:name="Plan1">
<table:table-row><table:table-cell office:value-type="string"><text:p>Nome</text:p></table:table-cell><table:table-cell office:value-type="string"><text:p>Cidade</text:p></table:table-cell></table:table-row>
<table:table-row><table:table-cell office:value-type="string"><text:p>Ana</text:p></table:table-cell><table:table-cell office:value-type="string"><text:p>Recife</text:p></table:table-cell></table:table-row>
</table:table></office:spreadsheet></office:body></office:document-content>"#;
        let source = SheetSource::from_bytes("lista.ods", ods_bytes(content, false));
        let criteria = FilterCriteria::new().with_city("Recife");
        match run(&source, &criteria, &ExtractOptions::default()).unwrap() {
            Outcome::NoData(diagnostics) => assert_eq!(diagnostics.blocks, 0),
            outcome => panic!("unexpected outcome: {outcome:?}"),
        }
    }

    #[test]
    fn missing_city_column_is_an_error() {
        let worksheet = format!(
            r#"<worksheet><sheetData><row r="1">{}{}</row><row r="2">{}{}</row><row r="3"><c r="A3"><v>1</v></c>{}</row><row r="4">{}</row></sheetData></worksheet>"#,
            cell("A1", 0), cell("B1", 1),
            cell("A2", 2), cell("B2", 3),
            cell("B3", 6),
            cell("A4", 9),
        );
        let bytes = xlsx_bytes(&[("Plan1", &worksheet)], Some(SHARED_STRINGS), None);
        let error = run(&SheetSource::from_bytes("curta.xlsx", bytes), &FilterCriteria::new(), &ExtractOptions::default())
            .unwrap_err();
        assert!(error.is_missing_column());
    }

    #[test]
    fn garbage_upload_is_malformed() {
        let source = SheetSource::from_bytes("foto.png", vec![0x89, b'P', b'N', b'G']);
        let error = run(&source, &FilterCriteria::new(), &ExtractOptions::default()).unwrap_err();
        assert!(error.is_malformed_sheet());
    }
}
