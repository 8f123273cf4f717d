//! # Filtering
//!
//! Narrows a normalized table by city of work and job title, derives the option
//! lists offered for both filters, and selects the columns shown to the user.
use crate::error::EmployeeSheetError;
use crate::extract::Record;
use crate::extract::Table;
use std::collections::BTreeSet;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

pub const CITY_COLUMN: &str = "Cidade de Atuação";
pub const JOB_COLUMN: &str = "Cargo";

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Missing column '{0}' in extracted table")]
    MissingColumnError(String),
}

/// Criteria for selecting records. Empty values impose no constraint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Allowed cities, compared case-insensitively as whole values.
    pub cities: Vec<String>,

    /// Fragment searched case-insensitively in the job title.
    pub job_title: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.cities.push(city.to_owned());
        self
    }

    pub fn with_job_title(mut self, job_title: &str) -> Self {
        self.job_title = Some(job_title.to_owned());
        self
    }

    fn active_cities(&self) -> Option<HashSet<String>> {
        let cities: HashSet<String> = self.cities
            .iter()
            .filter(|city| !city.is_empty())
            .map(|city| city.to_uppercase())
            .collect();
        (!cities.is_empty()).then_some(cities)
    }

    fn active_job_title(&self) -> Option<String> {
        self.job_title
            .as_deref()
            .filter(|job_title| !job_title.is_empty())
            .map(str::to_lowercase)
    }

    pub fn is_empty(&self) -> bool {
        self.active_cities().is_none() && self.active_job_title().is_none()
    }
}

/// Keeps the records matching every active criterion, in their original order.
pub fn apply(table: &Table, criteria: &FilterCriteria) -> Result<Table, EmployeeSheetError> {
    if table.columns().is_empty() && table.is_empty() {
        return Ok(table.clone());
    }

    let cities = criteria.active_cities();
    let job_title = criteria.active_job_title();
    if cities.is_some() {
        require_column(table, CITY_COLUMN)?;
    }
    if job_title.is_some() {
        require_column(table, JOB_COLUMN)?;
    }

    let records: Vec<Record> = table
        .records()
        .iter()
        .filter(|record| match &cities {
            Some(cities) => {
                let city = table.value(record, CITY_COLUMN);
                !city.is_empty() && cities.contains(&city.to_string().to_uppercase())
            }
            None => true,
        })
        .filter(|record| match &job_title {
            Some(fragment) => {
                let title = table.value(record, JOB_COLUMN);
                !title.is_empty() && title.to_string().to_lowercase().contains(fragment.as_str())
            }
            None => true,
        })
        .cloned()
        .collect();
    debug!(before = table.len(), after = records.len(), "filtered records");
    Ok(table.with_records(records))
}

/// Sorted distinct non-empty display values of a column.
pub fn distinct_values(table: &Table, column: &str) -> Result<Vec<String>, EmployeeSheetError> {
    require_column(table, column)?;
    let values: BTreeSet<String> = table
        .records()
        .iter()
        .map(|record| table.value(record, column))
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
        .collect();
    Ok(values.into_iter().collect())
}

/// A column of a display projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column<'a> {
    Required(&'a str),
    /// Skipped when the table lacks it
    Optional(&'a str),
}

/// Company, employee, CPF, birth date, job title and city of work.
pub fn default_projection(company_field: &str) -> Vec<Column<'_>> {
    vec![
        Column::Required(company_field),
        Column::Required("Empregado"),
        Column::Optional("CPF"),
        Column::Optional("Data de Nascimento"),
        Column::Required(JOB_COLUMN),
        Column::Required(CITY_COLUMN),
    ]
}

/// Restricts a table to the given columns, in the given order.
pub fn project(table: &Table, columns: &[Column]) -> Result<Table, EmployeeSheetError> {
    if table.columns().is_empty() && table.is_empty() {
        return Ok(table.clone());
    }

    let mut selected = Vec::with_capacity(columns.len());
    for column in columns {
        match column {
            Column::Required(name) => {
                require_column(table, name)?;
                selected.push(name.to_string());
            }
            Column::Optional(name) if table.has_column(name) => selected.push(name.to_string()),
            Column::Optional(_) => (),
        }
    }

    let records = table
        .records()
        .iter()
        .map(|record| {
            selected
                .iter()
                .map(|column| (column.to_owned(), table.value(record, column).clone()))
                .collect()
        })
        .collect();
    Ok(Table::from_parts(selected, records))
}

fn require_column(table: &Table, column: &str) -> Result<(), EmployeeSheetError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(FilterError::MissingColumnError(column.to_owned()))?
    }
}
