use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, DateSelect, Select, Text};
use prettytable::{format, Cell, Row, Table};
use chrono::Local;
use dotenv::dotenv;
use std::{error::Error, path::PathBuf, process::ExitCode};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod book;
mod config;
mod error;
mod example;
mod export;
mod generator;
mod record;
mod source;

use config::Config;
use error::GenerationError;
use export::{OfficeConverter, PdfConverter};
use generator::{GenerationRequest, GenerationSummary, RowRange, DATE_FORMAT, FIRST_DATA_ROW};
use source::SheetInfo;

// --- CLI Structure ---
#[derive(Parser)]
#[command(name = "Timesheet Wizard")]
#[command(about = "Generate one timesheet per employee from a payroll spreadsheet", long_about = None)]
struct Cli {
    /// Print debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate timesheets, prompting for anything not given
    Generate(GenerateArgs),
    /// List the sheets of a source workbook
    Sheets { source: PathBuf },
    /// Write an example source workbook and a starter template
    Example {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Source workbook (xlsx, xlsm, xls, ods)
    #[arg(long)]
    source: Option<PathBuf>,
    /// Sheet within the source workbook
    #[arg(long)]
    sheet: Option<String>,
    /// First day of the pay period, MM/DD/YYYY
    #[arg(long)]
    start_date: Option<String>,
    /// First source row to process (row 1 holds the headers)
    #[arg(long, default_value_t = FIRST_DATA_ROW)]
    start_row: u32,
    /// Last source row to process, inclusive; defaults to the sheet's last row
    #[arg(long)]
    end_row: Option<u32>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Workbook holding the "Template" sheet
    #[arg(long)]
    template: Option<PathBuf>,
    /// Also convert the output to PDF
    #[arg(long)]
    pdf: bool,
    /// Do not open the output folder afterwards
    #[arg(long)]
    no_reveal: bool,
    /// Skip the review and overwrite prompts
    #[arg(short, long)]
    yes: bool,
}

fn main() -> ExitCode {
    dotenv().ok(); // Reads the .env file
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::from_env();

    let result = match cli.command {
        Commands::Generate(args) => handle_generate(args, &config),
        Commands::Sheets { source } => handle_sheets(source),
        Commands::Example { dir } => handle_example(dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<GenerationError>() {
                Some(g) => eprintln!("{}: {}", g.title(), g),
                None => eprintln!("Error: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("timesheet_wizard=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// --- Generate ---
fn handle_generate(args: GenerateArgs, config: &Config) -> Result<(), Box<dyn Error>> {
    // 1. Source file and sheet
    let source = match args.source {
        Some(p) => p,
        None => PathBuf::from(Text::new("Source file:").prompt()?.trim()),
    };
    let sheets = source::list_sheets(&source)?;
    let sheet = match args.sheet {
        Some(s) => s,
        None => {
            if sheets.is_empty() {
                return Err("the source file has no sheets".into());
            }
            Select::new("Source sheet:", sheets.iter().map(SheetChoice).collect()).prompt()?.0.name.clone()
        }
    };

    // 2. Start date
    let start_date = match args.start_date {
        Some(d) => d,
        None => DateSelect::new("Start date of the pay period:")
            .with_default(Local::now().date_naive())
            .prompt()?
            .format(DATE_FORMAT)
            .to_string(),
    };

    // 3. Output
    let output = match args.output {
        Some(p) => p,
        None => {
            let default = config.output.display().to_string();
            PathBuf::from(Text::new("Save generated timesheets as:").with_default(&default).prompt()?.trim())
        }
    };
    if output.exists() && !args.yes && !Confirm::new(&format!("{} exists. Overwrite?", output.display())).with_default(false).prompt()? {
        return Ok(());
    }

    let request = GenerationRequest {
        source,
        source_sheet: sheet,
        template: args.template.unwrap_or_else(|| config.template.clone()),
        output,
        start_date,
        row_range: RowRange::new(args.start_row, args.end_row),
        reveal_output: config.reveal && !args.no_reveal,
    };

    // 4. Review
    let max_row = sheets.iter().find(|s| s.name == request.source_sheet).map(|s| s.max_row);
    print_review(&request, max_row);
    if !args.yes && !Confirm::new("Generate timesheets?").with_default(true).prompt()? {
        return Ok(());
    }

    // 5. Generate
    let summary = generator::generate(&request)?;
    print_summary(&summary);

    // 6. Optional PDF, never fails the run
    if args.pdf || config.pdf {
        let converter = match &config.pdf_converter {
            Some(program) => OfficeConverter::with_programs(vec![program.clone()]),
            None => OfficeConverter::default(),
        };
        match converter.convert(&summary.output) {
            Ok(pdf) => println!("PDF written: {}", pdf.display()),
            Err(e) => {
                warn!("{}", e);
                println!("Timesheets were created successfully, but converting to PDF failed: {}", e);
            }
        }
    }

    Ok(())
}

fn print_review(request: &GenerationRequest, max_row: Option<u32>) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    let rows = match max_row {
        Some(max) => format!("{} (sheet has {} rows)", request.row_range, max),
        None => request.row_range.to_string(),
    };
    for (label, value) in [
        ("Source File", request.source.display().to_string()),
        ("Sheet Name", request.source_sheet.clone()),
        ("Start Date", request.start_date.clone()),
        ("Rows", rows),
        ("Template", request.template.display().to_string()),
        ("Output", request.output.display().to_string()),
    ] {
        table.add_row(Row::new(vec![Cell::new(label).style_spec("b"), Cell::new(&value)]));
    }
    println!("\n--- Review ---");
    table.printstd();
}

fn print_summary(summary: &GenerationSummary) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(vec![
        Cell::new("Sheet"), Cell::new("Employee"), Cell::new("Days"),
        Cell::new("REG"), Cell::new("OT"), Cell::new("TOTAL"),
    ]));

    let mut grand_total = 0.0;
    for sheet in &summary.sheets {
        grand_total += sheet.totals.total;
        table.add_row(Row::new(vec![
            Cell::new(&sheet.sheet_name),
            Cell::new(&sheet.employee),
            Cell::new(&sheet.days.to_string()).style_spec("c"),
            Cell::new(&format_hours(sheet.totals.regular)),
            Cell::new(&format_hours(sheet.totals.overtime)),
            Cell::new(&format_hours(sheet.totals.total)).style_spec("b"),
        ]));
    }
    table.add_row(Row::new(vec![
        Cell::new("TOTAL").style_spec("b"),
        Cell::new(""), Cell::new(""), Cell::new(""), Cell::new(""),
        Cell::new(&format_hours(grand_total)).style_spec("bub"),
    ]));

    println!("\nRows {}-{}", summary.first_row, summary.last_row);
    table.printstd();
    println!("File successfully generated: {}", summary.output.display());
}

fn format_hours(h: f64) -> String {
    format!("{:.2}", h)
}

// --- Sheets ---
fn handle_sheets(source: PathBuf) -> Result<(), Box<dyn Error>> {
    let sheets = source::list_sheets(&source)?;

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(vec![Cell::new("Sheet"), Cell::new("Rows")]));
    for sheet in &sheets {
        table.add_row(Row::new(vec![Cell::new(&sheet.name), Cell::new(&sheet.max_row.to_string())]));
    }
    table.printstd();
    Ok(())
}

// --- Example ---
fn handle_example(dir: PathBuf) -> Result<(), Box<dyn Error>> {
    let source = dir.join("example_timesheet.xlsx");
    let template = dir.join("timesheet_template.xlsx");
    example::write_example_source(&source)?;
    example::write_template(&template)?;

    println!("Example source written: {}", source.display());
    println!("Template written: {}", template.display());
    Ok(())
}

// Helpers for Display
struct SheetChoice<'a>(&'a SheetInfo);

impl std::fmt::Display for SheetChoice<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} rows)", self.0.name, self.0.max_row)
    }
}
