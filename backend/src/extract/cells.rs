//! Cell classification helpers shared by the header resolver and the
//! boundary detector.
//!
//! Cells are plain text. A cell is *blank* when its trimmed text is empty,
//! and *numeric* when its trimmed text, with grouping commas and spaces
//! removed, parses as a float.

use once_cell::sync::Lazy;
use regex::Regex;

static REPEATED_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("static regex"));

/// Whether the trimmed cell text is empty.
pub fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

/// Whether the cell reads as a number once grouping separators are stripped.
///
/// `"1,234.50"` and `"1 000"` are numbers; `""`, `"12 kg"` and `"N/A"` are not.
pub fn looks_like_number(cell: &str) -> bool {
    let value = cell.trim();
    if value.is_empty() {
        return false;
    }
    let stripped: String = value.chars().filter(|c| *c != ',' && *c != ' ').collect();
    if stripped.is_empty() {
        return false;
    }
    // "inf", "infinity" and "nan" count as numbers too
    stripped.parse::<f64>().is_ok()
}

/// Number of non-blank cells in a row.
pub fn count_non_empty(row: &[String]) -> usize {
    row.iter().filter(|cell| !is_blank(cell)).count()
}

/// Number of numeric cells in a row.
pub fn count_numeric(row: &[String]) -> usize {
    row.iter().filter(|cell| looks_like_number(cell)).count()
}

/// Whether any cell of the row is non-blank.
pub fn has_data(row: &[String]) -> bool {
    row.iter().any(|cell| !is_blank(cell))
}

/// Cell at `index`, or `""` when the row is shorter.
pub fn cell_at(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Replace line breaks with spaces, collapse repeated spaces and trim.
pub fn clean_cell(text: &str) -> String {
    let flattened = text.replace("\r\n", " ").replace(['\r', '\n'], " ");
    REPEATED_SPACES.replace_all(&flattened, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blank_cells() {
        assert!(is_blank(""));
        assert!(is_blank("   "));
        assert!(is_blank("\t"));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn test_numbers_with_grouping() {
        assert!(looks_like_number("42"));
        assert!(looks_like_number(" -3.5 "));
        assert!(looks_like_number("1,234.50"));
        assert!(looks_like_number("1 000"));
        assert!(looks_like_number("1e3"));
    }

    #[test]
    fn test_float_keywords_are_numbers() {
        assert!(looks_like_number("NaN"));
        assert!(looks_like_number("inf"));
        assert!(looks_like_number(" -Infinity "));
        assert!(!looks_like_number("infinite"));
        assert_eq!(count_numeric(&row(&["Item", "nan", "inf", "Notes"])), 2);
    }

    #[test]
    fn test_non_numbers() {
        assert!(!looks_like_number(""));
        assert!(!looks_like_number(","));
        assert!(!looks_like_number("12 kg"));
        assert!(!looks_like_number("N/A"));
        assert!(!looks_like_number("$5"));
    }

    #[test]
    fn test_row_counts() {
        let r = row(&["Total", "", " ", "12", "1,000", "x"]);
        assert_eq!(count_non_empty(&r), 4);
        assert_eq!(count_numeric(&r), 2);
        assert!(has_data(&r));
        assert!(!has_data(&row(&["", "  "])));
        assert!(!has_data(&[]));
    }

    #[test]
    fn test_cell_at_out_of_range() {
        let r = row(&["a"]);
        assert_eq!(cell_at(&r, 0), "a");
        assert_eq!(cell_at(&r, 5), "");
    }

    #[test]
    fn test_clean_cell() {
        assert_eq!(clean_cell("Price\nUSD"), "Price USD");
        assert_eq!(clean_cell("a\r\nb\rc"), "a b c");
        assert_eq!(clean_cell("  lots   of    space  "), "lots of space");
        assert_eq!(clean_cell("line\n\nbreak"), "line break");
    }
}
