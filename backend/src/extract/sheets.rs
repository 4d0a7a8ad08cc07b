//! Converting every sheet of a workbook at once.
//!
//! Each sheet is converted on its own with the same options. A sheet that
//! fails is skipped with a warning; the batch only fails when no sheet
//! converts. Results can be packaged as one zip archive or written to a
//! directory, one CSV per sheet.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::pipeline::{convert_bytes, ConvertOptions, ConvertOutput};
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::ConvertResult;
use crate::parser::{list_sheets, SheetInfo, SheetSelector};

/// One converted sheet.
#[derive(Debug, Clone)]
pub struct SheetConversion {
    pub sheet: SheetInfo,
    pub output: ConvertOutput,
}

/// Convert every sheet of the input; `options.sheet` is ignored.
pub fn convert_all_sheets(
    file_name: Option<&str>,
    bytes: &[u8],
    options: &ConvertOptions,
) -> ConvertResult<Vec<SheetConversion>> {
    let sheets = list_sheets(file_name, bytes)?;
    log_info(format!("Converting {} sheets", sheets.len()));

    let mut conversions = Vec::with_capacity(sheets.len());
    let mut last_error = None;

    for sheet in sheets {
        log_info(format!("Sheet {}: {}", sheet.index + 1, sheet.name));
        let sheet_options = ConvertOptions {
            sheet: SheetSelector::Index(sheet.index),
            ..options.clone()
        };
        match convert_bytes(file_name, bytes, &sheet_options) {
            Ok(output) => conversions.push(SheetConversion { sheet, output }),
            Err(e) => {
                log_warning(format!("Skipping sheet '{}': {}", sheet.name, e));
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if conversions.is_empty() => Err(e),
        _ => Ok(conversions),
    }
}

/// File stem used to name outputs, `"converted"` when there is none.
pub fn output_stem(input: Option<&str>) -> String {
    input
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.replace('"', ""))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "converted".to_string())
}

/// `<base>_sheet_<n>_<name>.csv` with a 1-based `n`; spaces and path
/// separators in the sheet name become `_`.
pub fn sheet_file_name(base: &str, sheet: &SheetInfo) -> String {
    let name: String = sheet
        .name
        .chars()
        .map(|c| if matches!(c, ' ' | '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}_sheet_{}_{}.csv", base, sheet.index + 1, name)
}

/// Package the converted sheets as a zip archive.
pub fn zip_sheets(conversions: &[SheetConversion], base: &str) -> ConvertResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for conversion in conversions {
        zip.start_file(sheet_file_name(base, &conversion.sheet), options)?;
        zip.write_all(&conversion.output.csv)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Write one CSV per converted sheet into `dir`.
pub fn write_sheets(conversions: &[SheetConversion], base: &str, dir: &Path) -> ConvertResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(conversions.len());
    for conversion in conversions {
        let path = dir.join(sheet_file_name(base, &conversion.sheet));
        std::fs::write(&path, &conversion.output.csv)?;
        written.push(path);
    }
    log_success(format!("Wrote {} sheets to {}", written.len(), dir.display()));

    Ok(written)
}
