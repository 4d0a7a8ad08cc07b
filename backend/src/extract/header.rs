//! Header resolution against a known alias mapping.
//!
//! Rows are scanned top to bottom. Within a row, every cell is lowercased,
//! trimmed and tested for *containment* of each alias. A match binds the
//! alias's canonical field to that column if the field is still outstanding,
//! so each required field is bound to exactly one column (the leftmost match).
//! The first row that leaves no required field outstanding is the header row.
//!
//! Containment is unanchored on purpose: `"name"` matches `"Surname"`.

use std::collections::{BTreeMap, BTreeSet};

use super::cells::is_blank;
use crate::error::{ExtractError, ExtractResult};
use crate::models::{CellGrid, HeaderMapping, HeaderResolution};

/// Locate the header row and the matter/required columns.
///
/// Fails with [`ExtractError::MissingHeaders`] when no row satisfies every
/// required field, including on an empty grid.
pub fn resolve_header<G>(grid: &G, mapping: &HeaderMapping) -> ExtractResult<HeaderResolution>
where
    G: CellGrid + ?Sized,
{
    for index in 0..grid.row_count() {
        let row = grid.row(index);
        if let Some(fields) = bind_required_fields(row, mapping) {
            return Ok(build_resolution(index, row, fields));
        }
    }
    Err(ExtractError::MissingHeaders)
}

/// Bind required fields to columns of `row`. Returns `None` while any
/// required field is left unbound.
fn bind_required_fields(row: &[String], mapping: &HeaderMapping) -> Option<BTreeMap<String, usize>> {
    let mut outstanding: BTreeSet<&str> = mapping.required().iter().map(String::as_str).collect();
    let mut fields = BTreeMap::new();

    for (column, cell) in row.iter().enumerate() {
        if outstanding.is_empty() {
            break;
        }
        let text = cell.trim().to_lowercase();
        if text.is_empty() {
            continue;
        }
        for (alias, field) in mapping.aliases() {
            if text.contains(alias) && outstanding.remove(field) {
                fields.insert(field.to_string(), column);
            }
        }
    }

    outstanding.is_empty().then_some(fields)
}

fn build_resolution(header_row: usize, row: &[String], fields: BTreeMap<String, usize>) -> HeaderResolution {
    let matter_indexes: Vec<usize> = row
        .iter()
        .enumerate()
        .filter(|(_, cell)| !is_blank(cell))
        .map(|(column, _)| column)
        .collect();

    let required_indexes: Vec<usize> = fields
        .values()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    HeaderResolution {
        header_row,
        matter_indexes,
        required_indexes,
        fields,
    }
}
