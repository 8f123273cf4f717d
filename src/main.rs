use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use employee_sheet::export::write_csv;
use employee_sheet::filter::default_projection;
use employee_sheet::filter::project;
use employee_sheet::load;
use employee_sheet::select;
use employee_sheet::ExportFormat;
use employee_sheet::ExtractOptions;
use employee_sheet::FilterCriteria;
use employee_sheet::Markers;
use employee_sheet::Outcome;
use employee_sheet::SheetSource;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Extract the employee tables of every company in a spreadsheet and filter them
#[derive(Parser, Debug)]
#[command(name = "employee-sheet")]
#[command(about = "Filter employees by city of work and job title", long_about = None)]
struct Cli {
    /// Spreadsheet to read (.xlsx, .xlsm or .ods), only the first sheet is used
    file: PathBuf,

    /// City of work to keep, case-insensitive; repeat for several cities
    #[arg(long = "city", value_name = "CITY")]
    cities: Vec<String>,

    /// Fragment of the job title to keep, case-insensitive
    #[arg(long, value_name = "FRAGMENT")]
    job: Option<String>,

    /// Write the filtered records to this file or directory instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export format used with --output
    #[arg(short, long, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,

    /// Print every column instead of the default projection
    #[arg(long)]
    all_columns: bool,

    /// Print the cities and job titles available for filtering
    #[arg(long)]
    list_options: bool,

    /// Relabel blocks whose header differs from the first one instead of failing
    #[arg(long)]
    lenient_headers: bool,

    /// First cell of the rows introducing a company [default: Empresa]
    #[arg(long)]
    company_marker: Option<String>,

    /// Prefix of the rows closing a block [default: Total de empregados]
    #[arg(long)]
    total_marker: Option<String>,

    /// First cell of the header rows [default: Matrícula]
    #[arg(long)]
    header_marker: Option<String>,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn extract_options(&self) -> ExtractOptions {
        let defaults = Markers::default();
        ExtractOptions {
            markers: Markers {
                company: self.company_marker.clone().unwrap_or(defaults.company),
                total_prefix: self.total_marker.clone().unwrap_or(defaults.total_prefix),
                header: self.header_marker.clone().unwrap_or(defaults.header),
                company_field: defaults.company_field,
            },
            strict_headers: !self.lenient_headers,
        }
    }

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            cities: self.cities.clone(),
            job_title: self.job.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("employee-sheet started with verbosity level: {}", cli.verbose);

    if let Err(e) = execute(&cli, &mut std::io::stdout().lock()) {
        error!("Fatal error: {:#}", e);
        eprintln!("{}", failure_message(&e));
        std::process::exit(1);
    }
}

fn failure_message(error: &anyhow::Error) -> String {
    format!("Erro ao processar o arquivo: {error:#}")
}

fn execute<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let options = cli.extract_options();
    let source = SheetSource::from_path(&cli.file);
    let extraction = load(&source, &options)?;

    let (table, cities, job_titles) = match select(&extraction, &cli.criteria())? {
        Outcome::NoData(diagnostics) => {
            warn!(?diagnostics, "no data in spreadsheet");
            writeln!(out, "Nenhum dado encontrado na planilha.")?;
            return Ok(());
        }
        Outcome::Records { table, cities, job_titles, .. } => (table, cities, job_titles),
    };

    if cli.list_options {
        writeln!(out, "Cidades de Atuação:")?;
        for city in &cities {
            writeln!(out, "  {city}")?;
        }
        writeln!(out, "Cargos:")?;
        for job_title in &job_titles {
            writeln!(out, "  {job_title}")?;
        }
    }

    writeln!(out, "Resultado ({} registros encontrados)", table.len())?;

    match &cli.output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(cli.format.file_name())
            } else {
                path.to_owned()
            };
            let bytes = cli.format.to_bytes(&table)?;
            std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), format = %cli.format, mime_type = cli.format.mime_type(), "exported records");
        }
        None => {
            let shown = if cli.all_columns {
                table
            } else {
                project(&table, &default_projection(&options.markers.company_field))?
            };
            write_csv(&shown, &mut *out)?.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use employee_sheet::CellValue;
    use employee_sheet::Record;
    use employee_sheet::Table;
    use tempfile::TempDir;

    /// Lays rows out as a workbook through the xlsx exporter. The exporter's own
    /// header row reads as data before the first company and is skipped.
    fn workbook(dir: &TempDir, rows: &[&[&str]]) -> PathBuf {
        let table: Table = rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(index, cell)| (format!("c{index}"), CellValue::from(*cell)))
                    .collect::<Record>()
            })
            .collect();
        let path = dir.path().join("empregados.xlsx");
        std::fs::write(&path, ExportFormat::Xlsx.to_bytes(&table).unwrap()).unwrap();
        path
    }

    fn employees(dir: &TempDir) -> PathBuf {
        workbook(dir, &[
            &["Empresa", "ACME"],
            &["Matrícula", "Empregado", "Cargo", "Cidade de Atuação"],
            &["001", "Ana", "Analista", "Recife"],
            &["002", "Bruno", "Gerente", "Olinda"],
            &["Total de empregados: 2"],
            &["Empresa", "Beta"],
            &["Matrícula", "Empregado", "Cargo", "Cidade de Atuação"],
            &["101", "Carla", "Analista de Sistemas", "recife"],
            &["Total de empregados: 1"],
        ])
    }

    fn run_cli(args: &[&str]) -> (Result<()>, String) {
        let cli = Cli::try_parse_from(std::iter::once("employee-sheet").chain(args.iter().copied())).unwrap();
        let mut out = Vec::new();
        let result = execute(&cli, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn prints_count_and_projection() {
        let dir = TempDir::new().unwrap();
        let file = employees(&dir);
        let (result, out) = run_cli(&[file.to_str().unwrap(), "--city", "RECIFE", "--job", "analista"]);
        result.unwrap();
        assert_eq!(
            out,
            "Resultado (2 registros encontrados)\n\
             empresa,Empregado,Cargo,Cidade de Atuação\n\
             ACME,Ana,Analista,Recife\n\
             Beta,Carla,Analista de Sistemas,recife\n"
        );
    }

    #[test]
    fn lists_filter_options() {
        let dir = TempDir::new().unwrap();
        let file = employees(&dir);
        let (result, out) = run_cli(&[file.to_str().unwrap(), "--list-options", "--city", "Caruaru"]);
        result.unwrap();
        assert!(out.starts_with("Cidades de Atuação:\n  Olinda\n  Recife\n  recife\nCargos:\n"), "{out}");
        assert!(out.contains("Resultado (0 registros encontrados)\n"), "{out}");
    }

    #[test]
    fn sheet_without_blocks_reports_no_data() {
        let dir = TempDir::new().unwrap();
        let file = workbook(&dir, &[&["Nome", "Cidade"], &["Ana", "Recife"]]);
        let (result, out) = run_cli(&[file.to_str().unwrap()]);
        result.unwrap();
        assert_eq!(out, "Nenhum dado encontrado na planilha.\n");
    }

    #[test]
    fn output_directory_gets_fixed_file_name() {
        let dir = TempDir::new().unwrap();
        let file = employees(&dir);
        let target = TempDir::new().unwrap();
        let (result, out) = run_cli(&[file.to_str().unwrap(), "--city", "Olinda", "-o", target.path().to_str().unwrap()]);
        result.unwrap();
        assert_eq!(out, "Resultado (1 registros encontrados)\n");
        let written = std::fs::read_to_string(target.path().join("empregados_filtrados.csv")).unwrap();
        assert_eq!(written, "Matrícula,Empregado,Cargo,Cidade de Atuação,empresa\n002,Bruno,Gerente,Olinda,ACME\n");
    }

    #[test]
    fn unreadable_file_fails_with_message() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notas.xlsx");
        std::fs::write(&file, b"Empresa;ACME").unwrap();
        let (result, out) = run_cli(&[file.to_str().unwrap()]);
        let error = result.unwrap_err();
        assert!(out.is_empty());
        assert!(failure_message(&error).starts_with("Erro ao processar o arquivo: "), "{error:#}");
    }
}
