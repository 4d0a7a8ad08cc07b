//! Spreadsheet workbooks (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) through calamine.
//!
//! Every sheet becomes a grid whose row and column numbers match the sheet:
//! leading empty rows and columns before the used range are kept as blanks.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{NaiveDateTime, Timelike};
use std::io::Cursor;

use super::{extension, GridInfo, GridReader, ParsedGrid, SheetInfo, SheetSelector};
use crate::error::{GridError, GridResult};
use crate::models::Grid;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Zip container (xlsx, xlsb, ods).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// OLE compound document (xls).
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Excel, OpenDocument and binary workbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookReader;

type Workbook<'a> = Sheets<Cursor<&'a [u8]>>;

fn open(bytes: &[u8]) -> GridResult<Workbook<'_>> {
    Ok(open_workbook_auto_from_rs(Cursor::new(bytes))?)
}

impl GridReader for WorkbookReader {
    fn name(&self) -> &'static str {
        "workbook"
    }

    fn accepts(&self, file_name: Option<&str>, bytes: &[u8]) -> bool {
        match file_name.and_then(extension) {
            Some(ext) => WORKBOOK_EXTENSIONS.contains(&ext.as_str()),
            None => bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC),
        }
    }

    fn read(&self, bytes: &[u8], sheet: &SheetSelector) -> GridResult<ParsedGrid> {
        let mut workbook = open(bytes)?;
        let names = workbook.sheet_names();
        if names.is_empty() {
            return Err(GridError::EmptyWorkbook);
        }

        let index = sheet.resolve(names.as_slice())?;
        let range = workbook.worksheet_range(&names[index])?;
        let grid = range_to_grid(&range);

        let mut info = GridInfo::new(self.name(), "utf-8", &grid);
        info.sheet = Some(names[index].clone());
        Ok(ParsedGrid { grid, info })
    }

    fn sheets(&self, bytes: &[u8]) -> GridResult<Vec<SheetInfo>> {
        let mut workbook = open(bytes)?;
        let names = workbook.sheet_names();
        if names.is_empty() {
            return Err(GridError::EmptyWorkbook);
        }

        let mut sheets = Vec::with_capacity(names.len());
        for (index, name) in names.into_iter().enumerate() {
            let range = workbook.worksheet_range(&name)?;
            sheets.push(SheetInfo {
                index,
                name,
                row_count: sheet_row_count(&range),
            });
        }
        Ok(sheets)
    }
}

/// Rows up to the last used one, counted from the top of the sheet.
fn sheet_row_count(range: &Range<Data>) -> usize {
    match range.start() {
        Some((first_row, _)) if !range.is_empty() => first_row as usize + range.height(),
        _ => 0,
    }
}

fn range_to_grid(range: &Range<Data>) -> Grid {
    let Some((first_row, first_col)) = range.start() else {
        return Grid::default();
    };
    if range.is_empty() {
        return Grid::default();
    }

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); first_row as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); first_col as usize];
        cells.extend(row.iter().map(cell_text));
        rows.push(cells);
    }
    Grid::new(rows)
}

/// Text of a cell as a spreadsheet's CSV export shows it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => format_datetime(datetime),
            None => dt.as_f64().to_string(),
        },
        other => other.to_string(),
    }
}

/// Date only when there is no time of day.
fn format_datetime(datetime: NaiveDateTime) -> String {
    let time = datetime.time();
    if time.hour() == 0 && time.minute() == 0 && time.second() == 0 {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// In-memory xlsx files for tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
    const DOC_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    /// Build an xlsx workbook from `(name, rows)` pairs. Empty cells are
    /// left out, numeric text is stored as a number. Cell text must not need
    /// XML escaping.
    pub fn xlsx(sheets: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut workbook = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NS}" xmlns:r="{DOC_REL}"><sheets>"#);
        let mut workbook_rels = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{REL_NS}">"#);

        for (i, (name, rows)) in sheets.iter().enumerate() {
            let n = i + 1;
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
            workbook.push_str(&format!(r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#));
            workbook_rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="{DOC_REL}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            ));

            zip.start_file(format!("xl/worksheets/sheet{n}.xml"), options).unwrap();
            zip.write_all(worksheet(rows).as_bytes()).unwrap();
        }
        content_types.push_str("</Types>");
        workbook.push_str("</sheets></workbook>");
        workbook_rels.push_str("</Relationships>");

        let root_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{DOC_REL}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
        );
        for (path, body) in [
            ("[Content_Types].xml", content_types),
            ("_rels/.rels", root_rels),
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", workbook_rels),
        ] {
            zip.start_file(path, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    fn worksheet(rows: &[Vec<&str>]) -> String {
        let mut xml = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NS}"><sheetData>"#);
        for (r, row) in rows.iter().enumerate() {
            let cells: Vec<(usize, &str)> = row
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_empty())
                .map(|(c, v)| (c, *v))
                .collect();
            if cells.is_empty() {
                continue;
            }
            xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in cells {
                let reference = format!("{}{}", (b'A' + c as u8) as char, r + 1);
                if value.parse::<f64>().is_ok() {
                    xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
                } else {
                    xml.push_str(&format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#));
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }
}
