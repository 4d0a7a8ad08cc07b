//! Grid readers with encoding and delimiter auto-detection.
//!
//! Each reader is a variant of the [`GridReader`] capability: it can tell
//! whether it accepts an input and turn accepted bytes into a [`Grid`].
//! [`read_grid`] hands the input to the first reader that accepts it.
//! No table logic lives here; rows come out exactly as the file lays them out.
//!
//! Workbooks (`.xlsx`, `.xls`, `.ods`, ...) hold several sheets; text formats
//! hold exactly one. A [`SheetSelector`] picks the sheet to read.

mod workbook;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{GridError, GridResult};
use crate::models::Grid;

pub use workbook::WorkbookReader;

#[cfg(test)]
pub(crate) use workbook::fixtures;

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Lines sampled for delimiter detection.
const DELIMITER_SAMPLE_LINES: usize = 20;

/// Bytes inspected when sniffing for binary content.
const SNIFF_BYTES: usize = 1024;

/// Name reported for the only sheet of a text format.
pub const SINGLE_SHEET_NAME: &str = "Sheet1";

/// A grid together with what was detected while reading it.
#[derive(Debug, Clone)]
pub struct ParsedGrid {
    pub grid: Grid,
    pub info: GridInfo,
}

/// Reader metadata reported alongside a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridInfo {
    /// Name of the reader that produced the grid.
    pub format: &'static str,
    /// Detected or used encoding.
    pub encoding: String,
    /// Detected delimiter, for delimited text.
    pub delimiter: Option<char>,
    /// Sheet read, for workbooks.
    pub sheet: Option<String>,
    /// Number of rows read.
    pub row_count: usize,
    /// Width of the widest row.
    pub columns: usize,
}

impl GridInfo {
    fn new(format: &'static str, encoding: impl Into<String>, grid: &Grid) -> Self {
        Self {
            format,
            encoding: encoding.into(),
            delimiter: None,
            sheet: None,
            row_count: grid.rows().len(),
            columns: grid.width(),
        }
    }
}

/// One sheet of an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    /// Position in the workbook, 0-based.
    pub index: usize,
    pub name: String,
    pub row_count: usize,
}

/// Which sheet of a workbook to read.
///
/// Deserializes from a number (index) or a string (name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    /// 0-based position.
    Index(usize),
    /// Sheet name; an exact match wins over a case-insensitive one.
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl SheetSelector {
    /// Position of the selected sheet among `names`.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> GridResult<usize> {
        let found = match self {
            SheetSelector::Index(index) => Some(*index).filter(|i| *i < names.len()),
            SheetSelector::Name(name) => {
                let wanted = name.trim();
                names.iter().position(|n| n.as_ref() == wanted).or_else(|| {
                    names
                        .iter()
                        .position(|n| n.as_ref().trim().eq_ignore_ascii_case(wanted))
                })
            }
        };
        found.ok_or_else(|| GridError::SheetNotFound(self.to_string()))
    }
}

impl FromStr for SheetSelector {
    type Err = Infallible;

    /// Digits select by index, anything else by name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<usize>() {
            Ok(index) => SheetSelector::Index(index),
            Err(_) => SheetSelector::Name(s.trim().to_string()),
        })
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(index) => write!(f, "#{}", index),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// A source format able to produce a grid.
pub trait GridReader: Sync {
    /// Short format name, e.g. `"csv"`.
    fn name(&self) -> &'static str;

    /// Whether this reader can handle the input.
    fn accepts(&self, file_name: Option<&str>, bytes: &[u8]) -> bool;

    /// Read the selected sheet.
    fn read(&self, bytes: &[u8], sheet: &SheetSelector) -> GridResult<ParsedGrid>;

    /// Sheets of the input. Text formats hold a single sheet.
    fn sheets(&self, bytes: &[u8]) -> GridResult<Vec<SheetInfo>> {
        let parsed = self.read(bytes, &SheetSelector::default())?;
        Ok(vec![SheetInfo {
            index: 0,
            name: SINGLE_SHEET_NAME.to_string(),
            row_count: parsed.info.row_count,
        }])
    }
}

/// Delimited text (`.csv`, `.tsv`, `.txt`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedReader;

/// JSON array of rows, each an array of scalars.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

/// Registered readers, most specific first.
pub static READERS: &[&dyn GridReader] = &[&WorkbookReader, &JsonReader, &DelimitedReader];

/// Read the first sheet with the first reader that accepts the input.
pub fn read_grid(file_name: Option<&str>, bytes: &[u8]) -> GridResult<ParsedGrid> {
    read_sheet(file_name, bytes, &SheetSelector::default())
}

/// Read the selected sheet with the first reader that accepts the input.
pub fn read_sheet(file_name: Option<&str>, bytes: &[u8], sheet: &SheetSelector) -> GridResult<ParsedGrid> {
    require_reader(file_name, bytes)?.read(bytes, sheet)
}

/// Read the first sheet of a file.
pub fn read_grid_file<P: AsRef<Path>>(path: P) -> GridResult<ParsedGrid> {
    read_sheet_file(path, &SheetSelector::default())
}

/// Read the selected sheet of a file.
pub fn read_sheet_file<P: AsRef<Path>>(path: P, sheet: &SheetSelector) -> GridResult<ParsedGrid> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    read_sheet(file_name_of(path), &bytes, sheet)
}

/// List the sheets of an input.
pub fn list_sheets(file_name: Option<&str>, bytes: &[u8]) -> GridResult<Vec<SheetInfo>> {
    require_reader(file_name, bytes)?.sheets(bytes)
}

/// List the sheets of a file.
pub fn list_sheets_file<P: AsRef<Path>>(path: P) -> GridResult<Vec<SheetInfo>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    list_sheets(file_name_of(path), &bytes)
}

/// First registered reader accepting the input.
pub fn reader_for(file_name: Option<&str>, bytes: &[u8]) -> Option<&'static dyn GridReader> {
    READERS.iter().copied().find(|reader| reader.accepts(file_name, bytes))
}

fn require_reader(file_name: Option<&str>, bytes: &[u8]) -> GridResult<&'static dyn GridReader> {
    reader_for(file_name, bytes)
        .ok_or_else(|| GridError::UnsupportedFormat(file_name.unwrap_or("<unnamed input>").to_string()))
}

/// File extensions accepted by the registered readers.
pub fn supported_extensions() -> &'static [&'static str] {
    &["csv", "tsv", "txt", "json", "xlsx", "xlsm", "xlsb", "xls", "ods"]
}

fn file_name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn looks_like_json(bytes: &[u8]) -> bool {
    let trimmed = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    trimmed
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'[')
}

fn looks_like_text(bytes: &[u8]) -> bool {
    !bytes[..bytes.len().min(SNIFF_BYTES)].contains(&0)
}

/// Text formats only hold the first sheet.
fn single_sheet(sheet: &SheetSelector) -> GridResult<()> {
    sheet.resolve([SINGLE_SHEET_NAME].as_slice()).map(|_| ())
}

// =============================================================================
// Delimited text
// =============================================================================

impl GridReader for DelimitedReader {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn accepts(&self, file_name: Option<&str>, bytes: &[u8]) -> bool {
        match file_name.and_then(extension) {
            Some(ext) => matches!(ext.as_str(), "csv" | "tsv" | "txt"),
            None => !looks_like_json(bytes) && looks_like_text(bytes),
        }
    }

    fn read(&self, bytes: &[u8], sheet: &SheetSelector) -> GridResult<ParsedGrid> {
        single_sheet(sheet)?;
        let encoding = detect_encoding(bytes);
        let content = decode_content(bytes, &encoding)?;
        let delimiter = detect_delimiter(&content);
        let grid = parse_delimited(&content, delimiter)?;

        let mut info = GridInfo::new(self.name(), encoding, &grid);
        info.delimiter = Some(delimiter);
        Ok(ParsedGrid { grid, info })
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> GridResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).to_string(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => {
                let (text, _, had_errors) = enc.decode(bytes);
                if had_errors {
                    return Err(GridError::EncodingError(format!("invalid {} content", other)));
                }
                text.to_string()
            }
            // Fallback: try UTF-8 with lossy conversion
            None => String::from_utf8_lossy(bytes).to_string(),
        },
    };
    Ok(decoded)
}

/// Detect the delimiter by counting occurrences over the first non-empty lines.
///
/// Title rows above a table rarely contain delimiters, so the whole sample
/// is counted rather than only the first line. Defaults to `,`.
pub fn detect_delimiter(content: &str) -> char {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();

    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &DELIMITERS {
        let count: usize = sample.iter().map(|line| line.matches(sep).count()).sum();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited text into a ragged grid; no row is treated as a header.
pub fn parse_delimited(content: &str, delimiter: char) -> GridResult<Grid> {
    let mut delimiter_byte = [0u8; 4];
    let encoded = delimiter.encode_utf8(&mut delimiter_byte);
    if encoded.len() != 1 {
        return Err(GridError::ParseError {
            line: 0,
            message: format!("delimiter '{}' is not a single byte", delimiter),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(encoded.as_bytes()[0])
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Grid::new(rows))
}

// =============================================================================
// JSON
// =============================================================================

impl GridReader for JsonReader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn accepts(&self, file_name: Option<&str>, bytes: &[u8]) -> bool {
        match file_name.and_then(extension) {
            Some(ext) => ext == "json",
            None => looks_like_json(bytes),
        }
    }

    fn read(&self, bytes: &[u8], sheet: &SheetSelector) -> GridResult<ParsedGrid> {
        single_sheet(sheet)?;
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let rows: Vec<Vec<Value>> = serde_json::from_slice(bytes)?;
        let grid = Grid::new(
            rows.into_iter()
                .map(|row| row.iter().map(json_cell_text).collect())
                .collect(),
        );

        let info = GridInfo::new(self.name(), "utf-8", &grid);
        Ok(ParsedGrid { grid, info })
    }
}

/// Text of a JSON scalar as a spreadsheet reader would stringify it.
fn json_cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellGrid;

    #[test]
    fn test_ragged_rows_are_kept() {
        let csv = "Title\n\na;b;c\n1;2;3\nTotal;9\n";
        let grid = parse_delimited(csv, ';').unwrap();

        assert_eq!(grid.row_count(), 4);
        assert_eq!(grid.row(0), ["Title"]);
        assert_eq!(grid.row(1), ["a", "b", "c"]);
        assert_eq!(grid.row(3), ["Total", "9"]);
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name,note\n\"Smith, John\",\"line\nbreak\"\n";
        let grid = parse_delimited(csv, ',').unwrap();

        assert_eq!(grid.row(1), ["Smith, John", "line\nbreak"]);
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_detect_delimiter_pipe() {
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_detect_delimiter_past_title_line() {
        let content = "ACME Inventory Report\n\nsku,name,qty\nA1,hat,3\n";
        assert_eq!(detect_delimiter(content), ',');
    }

    #[test]
    fn test_detect_delimiter_default() {
        assert_eq!(detect_delimiter("single column\nonly"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let bytes = b"\xEF\xBB\xBFa,b\n";
        let parsed = read_grid(Some("data.csv"), bytes).unwrap();
        assert_eq!(parsed.grid.row(0), ["a", "b"]);
    }

    #[test]
    fn test_read_grid_picks_reader_by_extension() {
        let parsed = read_grid(Some("report.CSV"), b"a;b\n1;2\n").unwrap();
        assert_eq!(parsed.info.format, "csv");
        assert_eq!(parsed.info.delimiter, Some(';'));
        assert_eq!(parsed.info.row_count, 2);

        let parsed = read_grid(Some("grid.json"), br#"[["a", 1, null, true]]"#).unwrap();
        assert_eq!(parsed.info.format, "json");
        assert_eq!(parsed.grid.row(0), ["a", "1", "", "true"]);
    }

    #[test]
    fn test_read_grid_sniffs_unnamed_input() {
        assert_eq!(read_grid(None, b" [[\"x\"]]").unwrap().info.format, "json");
        assert_eq!(read_grid(None, b"x,y\n").unwrap().info.format, "csv");
    }

    #[test]
    fn test_unsupported_format() {
        let err = read_grid(Some("slides.pptx"), b"PK\x03\x04").unwrap_err();
        assert!(matches!(err, GridError::UnsupportedFormat(name) if name == "slides.pptx"));

        let err = read_grid(None, b"\x00\x01binary").unwrap_err();
        assert!(matches!(err, GridError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_invalid_json_grid() {
        let err = read_grid(Some("grid.json"), br#"{"not": "rows"}"#).unwrap_err();
        assert!(matches!(err, GridError::JsonError(_)));
    }

    #[test]
    fn test_empty_input_is_an_empty_grid() {
        let parsed = read_grid(Some("empty.csv"), b"").unwrap();
        assert_eq!(parsed.grid.row_count(), 0);
    }

    #[test]
    fn test_text_formats_hold_one_sheet() {
        let sheets = list_sheets(Some("data.csv"), b"a,b\n1,2\n3,4\n").unwrap();
        assert_eq!(
            sheets,
            vec![SheetInfo {
                index: 0,
                name: SINGLE_SHEET_NAME.to_string(),
                row_count: 3
            }]
        );

        let by_name = read_sheet(Some("data.csv"), b"a,b\n", &SheetSelector::Name("sheet1".into())).unwrap();
        assert_eq!(by_name.info.sheet, None);
        assert_eq!(by_name.info.columns, 2);

        let err = read_sheet(Some("data.csv"), b"a,b\n", &SheetSelector::Index(1)).unwrap_err();
        assert!(matches!(err, GridError::SheetNotFound(s) if s == "#1"));
    }

    #[test]
    fn test_sheet_selector_from_str() {
        assert_eq!("2".parse::<SheetSelector>().unwrap(), SheetSelector::Index(2));
        assert_eq!(" Prices ".parse::<SheetSelector>().unwrap(), SheetSelector::Name("Prices".into()));

        let from_json: SheetSelector = serde_json::from_str("1").unwrap();
        assert_eq!(from_json, SheetSelector::Index(1));
        let from_json: SheetSelector = serde_json::from_str(r#""Stock""#).unwrap();
        assert_eq!(from_json, SheetSelector::Name("Stock".into()));
    }

    #[test]
    fn test_sheet_selector_resolve() {
        let names = ["Prices", "prices", "Stock"].as_slice();
        assert_eq!(SheetSelector::Name("prices".into()).resolve(names).unwrap(), 1);
        assert_eq!(SheetSelector::Name("STOCK".into()).resolve(names).unwrap(), 2);
        assert_eq!(SheetSelector::Index(0).resolve(names).unwrap(), 0);
        assert!(SheetSelector::Index(3).resolve(names).is_err());
        assert!(SheetSelector::Name("Notes".into()).resolve(names).is_err());
    }

    #[test]
    fn test_read_grid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.tsv");
        std::fs::write(&path, "make\tprice\nford\t1\n").unwrap();

        let parsed = read_grid_file(&path).unwrap();
        assert_eq!(parsed.info.delimiter, Some('\t'));
        assert_eq!(parsed.grid.row(1), ["ford", "1"]);
    }
}
