//! Row validity and column projection for header-driven extraction.

use super::cells::{cell_at, is_blank};

/// A row is valid when every required column holds a non-blank cell.
///
/// Columns past the end of a short row count as blank.
pub fn is_valid_row(row: &[String], required_indexes: &[usize]) -> bool {
    required_indexes.iter().all(|&index| !is_blank(cell_at(row, index)))
}

/// Cells of `row` at `matter_indexes`, in that order; missing cells are empty.
pub fn project_row(row: &[String], matter_indexes: &[usize]) -> Vec<String> {
    matter_indexes
        .iter()
        .map(|&index| cell_at(row, index).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_required_columns_is_always_valid() {
        assert!(is_valid_row(&row(&[]), &[]));
        assert!(is_valid_row(&row(&["", ""]), &[]));
    }

    #[test]
    fn test_blank_required_cell_is_invalid() {
        let r = row(&["Ford", "  ", "20000"]);
        assert!(is_valid_row(&r, &[0, 2]));
        assert!(!is_valid_row(&r, &[1]));
    }

    #[test]
    fn test_short_row_is_invalid_not_a_panic() {
        let r = row(&["Ford"]);
        assert!(!is_valid_row(&r, &[0, 2]));
    }

    #[test]
    fn test_projection_keeps_order_and_pads() {
        let r = row(&["a", "b", "c"]);
        assert_eq!(project_row(&r, &[2, 0, 5]), vec!["c", "a", ""]);
        assert!(project_row(&r, &[]).is_empty());
    }

    #[test]
    fn test_projection_keeps_cells_verbatim() {
        let r = row(&[" padded ", "x"]);
        assert_eq!(project_row(&r, &[0]), vec![" padded "]);
    }
}
