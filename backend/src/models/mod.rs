//! Domain models for the tablecrop extraction pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`CellGrid`] - Read access to a materialized grid of text cells
//! - [`Grid`] - Owned grid produced by the readers in [`crate::parser`]
//! - [`HeaderMapping`] - Validated alias map plus required field set
//! - [`HeaderResolution`] - Header row and the matter/required column indexes
//! - [`TableBounds`] / [`ForcedBounds`] - Inclusive row spans

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ExtractError, ExtractResult};

// =============================================================================
// Grid
// =============================================================================

/// Indexable, finite sequence of rows of text cells.
///
/// Callers guarantee `index < row_count()` when calling [`CellGrid::row`].
/// Rows may be ragged.
pub trait CellGrid {
    /// Number of rows in the grid.
    fn row_count(&self) -> usize;

    /// Row at `index` (0-based).
    fn row(&self, index: usize) -> &[String];
}

impl CellGrid for [Vec<String>] {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn row(&self, index: usize) -> &[String] {
        &self[index]
    }
}

impl CellGrid for Vec<Vec<String>> {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn row(&self, index: usize) -> &[String] {
        &self[index]
    }
}

impl<G: CellGrid + ?Sized> CellGrid for &G {
    fn row_count(&self) -> usize {
        (**self).row_count()
    }

    fn row(&self, index: usize) -> &[String] {
        (**self).row(index)
    }
}

/// Owned grid of text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build a grid from borrowed string rows; handy for fixtures.
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

impl CellGrid for Grid {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: usize) -> &[String] {
        &self.rows[index]
    }
}

// =============================================================================
// Header Mapping
// =============================================================================

/// Serialized form of a header mapping, as found in mapping files and
/// request payloads.
///
/// ```json
/// { "aliases": { "price usd": "price", "make": "brand" }, "required": ["price"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMappingConfig {
    /// Alias (substring of a header cell) -> canonical field.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    /// Canonical fields that must all be located.
    #[serde(default)]
    pub required: Vec<String>,
}

/// Validated alias map and required field set.
///
/// Aliases are stored trimmed and lowercased; empty aliases are dropped since
/// they would match every cell. Every required field is guaranteed to be the
/// target of at least one alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMapping {
    aliases: BTreeMap<String, String>,
    required: BTreeSet<String>,
}

impl HeaderMapping {
    /// Build a mapping, failing with
    /// [`ExtractError::RequiredFieldsNotResolvable`] when a required field is
    /// not the value of any alias, and with [`ExtractError::ConflictingAlias`]
    /// when two aliases normalize to the same text but name different fields.
    pub fn new<A, K, V, R, F>(aliases: A, required: R) -> ExtractResult<Self>
    where
        A: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
        R: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let mut normalized: BTreeMap<String, String> = BTreeMap::new();
        for (alias, field) in aliases {
            let alias = alias.as_ref().trim().to_lowercase();
            if alias.is_empty() {
                continue;
            }
            let field: String = field.into();
            match normalized.get(&alias) {
                Some(existing) if *existing != field => {
                    return Err(ExtractError::ConflictingAlias {
                        alias,
                        first: existing.clone(),
                        second: field,
                    });
                }
                Some(_) => {}
                None => {
                    normalized.insert(alias, field);
                }
            }
        }
        let aliases = normalized;
        let required: BTreeSet<String> = required.into_iter().map(Into::into).collect();

        let resolvable: BTreeSet<&String> = aliases.values().collect();
        let missing: Vec<String> = required
            .iter()
            .filter(|field| !resolvable.contains(field))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(ExtractError::RequiredFieldsNotResolvable { missing });
        }

        Ok(Self { aliases, required })
    }

    /// Aliases in deterministic (sorted) order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, f)| (a.as_str(), f.as_str()))
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    pub fn to_config(&self) -> HeaderMappingConfig {
        HeaderMappingConfig {
            aliases: self.aliases.clone(),
            required: self.required.iter().cloned().collect(),
        }
    }
}

impl TryFrom<HeaderMappingConfig> for HeaderMapping {
    type Error = ExtractError;

    fn try_from(config: HeaderMappingConfig) -> Result<Self, Self::Error> {
        HeaderMapping::new(config.aliases, config.required)
    }
}

impl TryFrom<&HeaderMappingConfig> for HeaderMapping {
    type Error = ExtractError;

    fn try_from(config: &HeaderMappingConfig) -> Result<Self, Self::Error> {
        HeaderMapping::new(&config.aliases, config.required.iter().cloned())
    }
}

// =============================================================================
// Header Resolution
// =============================================================================

/// Outcome of header resolution on one grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderResolution {
    /// Index of the header row.
    pub header_row: usize,

    /// Columns kept in the output, in column order.
    pub matter_indexes: Vec<usize>,

    /// Columns that must be non-blank in every emitted row (ascending).
    pub required_indexes: Vec<usize>,

    /// Required canonical field -> column that satisfied it.
    pub fields: BTreeMap<String, usize>,
}

// =============================================================================
// Bounds
// =============================================================================

/// Inclusive row span of a data table: `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBounds {
    pub start: usize,
    pub end: usize,
}

impl TableBounds {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }
}

/// Caller-supplied bounds that bypass detection when valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedBounds {
    pub start: usize,
    pub end: usize,
}

impl ForcedBounds {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Check `start <= end < row_count`.
    pub fn validate(&self, row_count: usize) -> ExtractResult<TableBounds> {
        if self.start <= self.end && self.end < row_count {
            Ok(TableBounds::new(self.start, self.end))
        } else {
            Err(ExtractError::InvalidForcedBounds {
                start: self.start,
                end: self.end,
                row_count,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_normalizes_aliases() {
        let mapping = HeaderMapping::new([("  Price USD ", "price"), ("", "brand")], ["price"]).unwrap();
        let aliases: Vec<_> = mapping.aliases().collect();
        assert_eq!(aliases, vec![("price usd", "price")]);
        assert!(mapping.required().contains("price"));
    }

    #[test]
    fn test_mapping_reports_every_missing_field() {
        let err = HeaderMapping::new([("make", "brand")], ["price", "discount", "brand"]).unwrap_err();
        assert_eq!(
            err,
            ExtractError::RequiredFieldsNotResolvable {
                missing: vec!["discount".into(), "price".into()],
            }
        );
    }

    #[test]
    fn test_aliases_differing_in_case_must_agree() {
        let err = HeaderMapping::new([("Price", "price"), ("price", "cost")], ["price"]).unwrap_err();
        assert!(matches!(err, ExtractError::ConflictingAlias { ref alias, .. } if alias == "price"));

        let mapping = HeaderMapping::new([("Price", "price"), (" price ", "price")], ["price"]).unwrap();
        assert_eq!(mapping.aliases().count(), 1);
    }

    #[test]
    fn test_mapping_duplicate_required_fields_form_a_set() {
        let mapping = HeaderMapping::new([("sku", "sku")], ["sku", "sku"]).unwrap();
        assert_eq!(mapping.required().len(), 1);
    }

    #[test]
    fn test_mapping_config_roundtrip() {
        let json = r#"{ "aliases": { "make": "brand", "price usd": "price" }, "required": ["price"] }"#;
        let config: HeaderMappingConfig = serde_json::from_str(json).unwrap();
        let mapping = HeaderMapping::try_from(&config).unwrap();
        assert_eq!(mapping.to_config(), config);
    }

    #[test]
    fn test_forced_bounds_validation() {
        assert_eq!(ForcedBounds::new(1, 3).validate(4).unwrap(), TableBounds::new(1, 3));
        assert!(ForcedBounds::new(3, 1).validate(4).is_err());
        assert!(ForcedBounds::new(0, 4).validate(4).is_err());
        assert!(ForcedBounds::new(0, 0).validate(0).is_err());
    }

    #[test]
    fn test_grid_width_and_ragged_rows() {
        let grid = Grid::from_rows(vec![vec!["a"], vec!["b", "c", "d"]]);
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.row(1), ["b", "c", "d"]);
    }
}
