//! High-level conversion API: grid in, delimited text out.
//!
//! Combines reading, table resolution, row filtering, cell cleanup and CSV
//! writing. Rows stream from the lazy extraction straight into the writer,
//! so only one output row is held at a time.
//!
//! # Example
//!
//! ```rust,ignore
//! use tablecrop::{convert_file, ConvertOptions};
//! use std::path::Path;
//!
//! let summary = convert_file(
//!     Path::new("export.csv"),
//!     Path::new("table.csv"),
//!     &ConvertOptions::default(),
//! )?;
//! println!("Wrote {} rows", summary.rows_written);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::bounds::{BoundsSource, DetectionTuning};
use super::cells::clean_cell;
use super::region::{ExtractMode, ExtractionPlan, RegionExtractor};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::parse_separator;
use crate::error::{ConfigError, ConfigResult, ConvertResult};
use crate::models::{CellGrid, ForcedBounds, HeaderMapping, HeaderMappingConfig};
use crate::parser::{read_sheet, read_sheet_file, GridInfo, SheetSelector};

/// Output separator used when none is configured.
pub const DEFAULT_SEPARATOR: char = ',';

/// Options for a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertOptions {
    /// Output field separator (single byte). Files may also name it:
    /// `"comma"`, `"semicolon"`, `"tab"`, `"pipe"`.
    #[serde(deserialize_with = "deserialize_separator")]
    pub separator: char,

    /// Sheet to read from a workbook, by 0-based index or by name.
    pub sheet: SheetSelector,

    /// Replace line breaks inside cells with spaces.
    pub clean_line_breaks: bool,

    /// Forced first row of the table (0-based); needs `end_row`.
    pub start_row: Option<usize>,

    /// Forced last row of the table (0-based, inclusive); needs `start_row`.
    pub end_row: Option<usize>,

    /// Header mapping; switches to header-driven extraction when present.
    pub mapping: Option<HeaderMappingConfig>,

    /// Structural detection thresholds.
    pub tuning: DetectionTuning,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            sheet: SheetSelector::default(),
            clean_line_breaks: true,
            start_row: None,
            end_row: None,
            mapping: None,
            tuning: DetectionTuning::default(),
        }
    }
}

fn deserialize_separator<'de, D: Deserializer<'de>>(deserializer: D) -> Result<char, D::Error> {
    let value = String::deserialize(deserializer)?;
    parse_separator(&value).map_err(serde::de::Error::custom)
}

impl ConvertOptions {
    /// Forced bounds, when both ends are set.
    pub fn forced_bounds(&self) -> ConfigResult<Option<ForcedBounds>> {
        match (self.start_row, self.end_row) {
            (Some(start), Some(end)) => Ok(Some(ForcedBounds::new(start, end))),
            (None, None) => Ok(None),
            _ => Err(ConfigError::IncompleteBounds),
        }
    }

    /// Separator as the single byte the CSV writer needs.
    pub fn separator_byte(&self) -> ConfigResult<u8> {
        if self.separator.is_ascii() {
            Ok(self.separator as u8)
        } else {
            Err(ConfigError::InvalidSeparator(self.separator.to_string()))
        }
    }
}

/// What a conversion did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertSummary {
    /// Rows in the input grid.
    pub input_rows: usize,

    /// Rows written, including the header row in header-driven mode.
    pub rows_written: usize,

    /// Data rows dropped for blank required cells.
    pub rows_omitted: usize,

    /// How the table was located.
    pub extraction: ExtractionKind,

    /// First output row in the input (header row in header-driven mode).
    pub start_row: Option<usize>,

    /// Last row covered, in structural mode.
    pub end_row: Option<usize>,

    /// Input columns kept, in header-driven mode.
    pub columns: Vec<usize>,

    /// Non-fatal problems, e.g. rejected forced bounds.
    pub warnings: Vec<String>,
}

/// Which extraction produced the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "mode", content = "source")]
pub enum ExtractionKind {
    Header,
    Structural(BoundsSource),
}

/// Output of [`convert_bytes`].
#[derive(Debug, Clone)]
pub struct ConvertOutput {
    pub csv: Vec<u8>,
    pub summary: ConvertSummary,
    pub input: GridInfo,
}

/// Extract the table of `grid` and write it as delimited text to `writer`.
pub fn convert_grid<G, W>(grid: &G, options: &ConvertOptions, writer: W) -> ConvertResult<ConvertSummary>
where
    G: CellGrid + ?Sized,
    W: Write,
{
    let separator = options.separator_byte()?;
    let forced = options.forced_bounds()?;
    let mapping = options.mapping.as_ref().map(HeaderMapping::try_from).transpose()?;

    let mode = match &mapping {
        Some(mapping) => ExtractMode::HeaderDriven(mapping),
        None => ExtractMode::StructuralOnly(forced),
    };

    let extractor = RegionExtractor::new(options.tuning);
    let mut extraction = extractor.extract(grid, mode)?;

    let mut summary = ConvertSummary {
        input_rows: grid.row_count(),
        rows_written: 0,
        rows_omitted: 0,
        extraction: ExtractionKind::Header,
        start_row: None,
        end_row: None,
        columns: Vec::new(),
        warnings: Vec::new(),
    };
    if mapping.is_some() && forced.is_some() {
        let warning = "Forced bounds are ignored when a header mapping is given";
        log_warning(warning);
        summary.warnings.push(warning.to_string());
    }
    describe_plan(extraction.plan(), &mut summary);

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(separator)
        .flexible(true)
        .from_writer(writer);

    for row in extraction.by_ref() {
        if options.clean_line_breaks {
            csv_writer.write_record(row.iter().map(|cell| clean_cell(cell)))?;
        } else {
            csv_writer.write_record(&row)?;
        }
        summary.rows_written += 1;
    }
    csv_writer.flush()?;

    summary.rows_omitted = extraction.omitted();
    if summary.rows_omitted > 0 {
        log_info(format!("Skipped {} rows with blank required cells", summary.rows_omitted));
    }
    log_success(format!("Wrote {} rows", summary.rows_written));

    Ok(summary)
}

/// Read `bytes` with the matching grid reader and convert them in memory.
pub fn convert_bytes(file_name: Option<&str>, bytes: &[u8], options: &ConvertOptions) -> ConvertResult<ConvertOutput> {
    let parsed = read_sheet(file_name, bytes, &options.sheet)?;
    log_grid_info(&parsed.info);

    let mut csv = Vec::new();
    let summary = convert_grid(&parsed.grid, options, &mut csv)?;

    Ok(ConvertOutput {
        csv,
        summary,
        input: parsed.info,
    })
}

/// Convert the file at `input` into `output`.
pub fn convert_file(input: &Path, output: &Path, options: &ConvertOptions) -> ConvertResult<ConvertSummary> {
    let file = File::create(output)?;
    let summary = convert_file_to(input, BufWriter::new(file), options)?;
    log_success(format!("Output written to {}", output.display()));

    Ok(summary)
}

/// Convert the file at `input`, writing the table to `writer`.
pub fn convert_file_to<W: Write>(input: &Path, writer: W, options: &ConvertOptions) -> ConvertResult<ConvertSummary> {
    log_info(format!("Reading {}", input.display()));
    let parsed = read_sheet_file(input, &options.sheet)?;
    log_grid_info(&parsed.info);

    convert_grid(&parsed.grid, options, writer)
}

fn log_grid_info(info: &GridInfo) {
    log_success(format!("Detected format: {}", info.format));
    if let Some(sheet) = &info.sheet {
        log_info_indent(format!("Sheet: {}", sheet), 1);
    }
    log_info_indent(format!("Encoding: {}", info.encoding), 1);
    if let Some(delimiter) = info.delimiter {
        log_info_indent(format!("Delimiter: '{}'", format_delimiter(delimiter)), 1);
    }
    log_info_indent(format!("Rows: {}", info.row_count), 1);
}

/// Record the resolved plan in the summary and log it with 1-based rows.
fn describe_plan(plan: &ExtractionPlan, summary: &mut ConvertSummary) {
    match plan {
        ExtractionPlan::Header(resolution) => {
            log_success(format!(
                "Found header row at {} ({} columns kept, {} required)",
                resolution.header_row + 1,
                resolution.matter_indexes.len(),
                resolution.required_indexes.len()
            ));
            summary.extraction = ExtractionKind::Header;
            summary.start_row = Some(resolution.header_row);
            summary.columns = resolution.matter_indexes.clone();
        }
        ExtractionPlan::Structural(detection) => {
            if let Some(rejected) = &detection.rejected {
                log_warning(format!("{}; detecting bounds instead", rejected));
                summary.warnings.push(rejected.to_string());
            }
            summary.extraction = ExtractionKind::Structural(detection.source);
            if detection.is_empty() {
                log_warning("Grid is empty");
                return;
            }

            let (start, end) = (detection.bounds.start, detection.bounds.end);
            match detection.source {
                BoundsSource::Forced => log_info(format!("Using manual boundaries: rows {} to {}", start + 1, end + 1)),
                BoundsSource::Detected => {
                    if let Some(header) = detection.header {
                        log_info(format!(
                            "Found header row at {} with {} non-empty cells",
                            header.row + 1,
                            header.non_empty
                        ));
                    }
                    log_success(format!("Detected table boundaries: rows {} to {}", start + 1, end + 1));
                }
                BoundsSource::FirstDataRow => {
                    log_warning(format!("No header row found, keeping rows {} to {}", start + 1, end + 1));
                }
                BoundsSource::WholeGrid | BoundsSource::Empty => {
                    log_warning("No data found, keeping the whole grid");
                }
            }
            summary.start_row = Some(start);
            summary.end_row = Some(end);
        }
    }
}

/// Printable form of a delimiter.
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
