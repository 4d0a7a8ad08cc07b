//! Tablecrop CLI - extract the data table from messy spreadsheet exports
//!
//! # Main Commands
//!
//! ```bash
//! tablecrop convert export.csv -o table.csv     # Detect the table, write clean CSV
//! tablecrop convert export.csv -m mapping.json  # Locate the table through header aliases
//! tablecrop convert book.xlsx --sheet Prices     # Pick a workbook sheet by name or index
//! tablecrop convert book.xlsx --all-sheets -o out/  # One CSV per sheet
//! tablecrop serve                               # Start HTTP server (port 8080 or $PORT)
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! tablecrop sheets book.xlsx                    # List sheets as JSON
//! tablecrop detect export.csv                   # Show detected bounds as JSON
//! tablecrop headers export.csv -m mapping.json  # Show header resolution as JSON
//! ```

use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tablecrop::api::logs::{log_error, log_info, log_success};
use tablecrop::config::{self, DEFAULT_PORT};
use tablecrop::extract::pipeline::convert_file_to;
use tablecrop::extract::sheets::{convert_all_sheets, output_stem, write_sheets};
use tablecrop::parser::list_sheets_file;
use tablecrop::{
    convert_file, load_mapping, load_options, parse_separator, read_sheet_file, resolve_bounds, resolve_header,
    ConvertOptions, ConvertSummary, ForcedBounds, SheetSelector,
};

#[derive(Parser)]
#[command(name = "tablecrop")]
#[command(about = "Extract the data table from messy spreadsheet exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the table and write it as CSV
    Convert {
        /// Input file (csv, tsv, txt, json, xlsx, xls or ods)
        input: PathBuf,

        /// Output file (default: stdout); a directory with --all-sheets
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Workbook sheet, by name or 0-based index (default: first sheet)
        #[arg(long)]
        sheet: Option<SheetSelector>,

        /// Convert every sheet into its own CSV
        #[arg(long, conflicts_with = "sheet")]
        all_sheets: bool,

        /// Output separator: ',', ';', 'tab' or any single character
        #[arg(short, long)]
        separator: Option<String>,

        /// First table row, 0-based (requires --end-row)
        #[arg(long, requires = "end_row")]
        start_row: Option<usize>,

        /// Last table row, 0-based and inclusive (requires --start-row)
        #[arg(long, requires = "start_row")]
        end_row: Option<usize>,

        /// Header mapping JSON; locates the table through header aliases
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Conversion options JSON
        #[arg(long)]
        options: Option<PathBuf>,

        /// Keep line breaks inside cells
        #[arg(long)]
        keep_line_breaks: bool,
    },

    /// Print the detected table bounds as JSON
    Detect {
        /// Input file
        input: PathBuf,

        /// First table row to try, 0-based (requires --end-row)
        #[arg(long, requires = "end_row")]
        start_row: Option<usize>,

        /// Last table row to try, 0-based and inclusive (requires --start-row)
        #[arg(long, requires = "start_row")]
        end_row: Option<usize>,

        /// Conversion options JSON (for detection tuning)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Workbook sheet, by name or 0-based index
        #[arg(long, default_value = "0")]
        sheet: SheetSelector,
    },

    /// Print the header resolution for a mapping as JSON
    Headers {
        /// Input file
        input: PathBuf,

        /// Header mapping JSON
        #[arg(short, long)]
        mapping: PathBuf,

        /// Workbook sheet, by name or 0-based index
        #[arg(long, default_value = "0")]
        sheet: SheetSelector,
    },

    /// List the sheets of a workbook as JSON
    Sheets {
        /// Input file
        input: PathBuf,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: $PORT, then 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            sheet,
            all_sheets,
            separator,
            start_row,
            end_row,
            mapping,
            options,
            keep_line_breaks,
        } => build_options(
            options.as_deref(),
            separator.as_deref(),
            sheet,
            start_row,
            end_row,
            mapping.as_deref(),
            keep_line_breaks,
        )
        .and_then(|options| {
            if all_sheets {
                cmd_convert_all(&input, output.as_deref(), &options)
            } else {
                cmd_convert(&input, output.as_deref(), &options)
            }
        }),

        Commands::Detect {
            input,
            start_row,
            end_row,
            options,
            sheet,
        } => cmd_detect(&input, start_row, end_row, options.as_deref(), &sheet),

        Commands::Headers { input, mapping, sheet } => cmd_headers(&input, &mapping, &sheet),

        Commands::Sheets { input } => cmd_sheets(&input),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

/// Merge the options file with command-line flags; flags win.
fn build_options(
    options_path: Option<&Path>,
    separator: Option<&str>,
    sheet: Option<SheetSelector>,
    start_row: Option<usize>,
    end_row: Option<usize>,
    mapping_path: Option<&Path>,
    keep_line_breaks: bool,
) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
    let mut options = match options_path {
        Some(path) => load_options(path)?,
        None => ConvertOptions::default(),
    };

    if let Some(separator) = separator {
        options.separator = parse_separator(separator)?;
    }
    if let Some(sheet) = sheet {
        options.sheet = sheet;
    }
    if start_row.is_some() || end_row.is_some() {
        options.start_row = start_row;
        options.end_row = end_row;
    }
    if let Some(path) = mapping_path {
        options.mapping = Some(load_mapping(path)?.to_config());
    }
    if keep_line_breaks {
        options.clean_line_breaks = false;
    }

    Ok(options)
}

fn cmd_convert(input: &Path, output: Option<&Path>, options: &ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("Separator: {}", config::separator_name(options.separator)));

    let summary = match output {
        Some(path) => convert_file(input, path, options)?,
        None => convert_file_to(input, BufWriter::new(io::stdout().lock()), options)?,
    };
    print_summary(&summary);

    Ok(())
}

fn cmd_convert_all(input: &Path, output: Option<&Path>, options: &ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("Reading {}", input.display()));
    let bytes = std::fs::read(input)?;
    let file_name = input.file_name().and_then(|n| n.to_str());

    let conversions = convert_all_sheets(file_name, &bytes, options)?;
    for conversion in &conversions {
        log_info(format!("Sheet {}:", conversion.sheet.name));
        print_summary(&conversion.output.summary);
    }
    write_sheets(&conversions, &output_stem(file_name), output.unwrap_or(Path::new(".")))?;

    Ok(())
}

fn print_summary(summary: &ConvertSummary) {
    log_success(format!(
        "Kept {} of {} input rows ({} skipped)",
        summary.rows_written, summary.input_rows, summary.rows_omitted
    ));
    for warning in &summary.warnings {
        log_info(format!("Note: {}", warning));
    }
}

fn cmd_detect(
    input: &Path,
    start_row: Option<usize>,
    end_row: Option<usize>,
    options_path: Option<&Path>,
    sheet: &SheetSelector,
) -> Result<(), Box<dyn std::error::Error>> {
    let tuning = match options_path {
        Some(path) => load_options(path)?.tuning,
        None => Default::default(),
    };
    let forced = start_row.zip(end_row).map(|(start, end)| ForcedBounds::new(start, end));

    let parsed = read_sheet_file(input, sheet)?;
    let detection = resolve_bounds(&parsed.grid, forced, &tuning);

    let rejected = detection.rejected.as_ref().map(|e| e.to_string());
    let report = json!({
        "input": parsed.info,
        "detection": detection,
        "rejectedBounds": rejected,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn cmd_headers(input: &Path, mapping_path: &Path, sheet: &SheetSelector) -> Result<(), Box<dyn std::error::Error>> {
    let mapping = load_mapping(mapping_path)?;
    let parsed = read_sheet_file(input, sheet)?;
    let resolution = resolve_header(&parsed.grid, &mapping)?;

    println!("{}", serde_json::to_string_pretty(&resolution)?);

    Ok(())
}

fn cmd_sheets(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let sheets = list_sheets_file(input)?;
    println!("{}", serde_json::to_string_pretty(&sheets)?);

    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let port = port.or_else(config::port_from_env).unwrap_or(DEFAULT_PORT);
    tablecrop::server::start_server(port).await
}
