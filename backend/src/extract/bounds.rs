//! Structural table boundary detection.
//!
//! Used when no header mapping is known. The detector looks for the densest
//! mostly-textual row (the header), then walks down while rows keep a
//! comparable number of filled cells:
//!
//! ```text
//! row                         non-empty   verdict
//! "Co Name"                   1           title, skipped
//! A  B  C  D  E               5           header (>= 5 cells, <= 1 number)
//! 1  x  2  y  3               5           >= 5/2  -> extend
//! 1  x  2  y  3               5           >= 5/2  -> extend
//! Total                       1           < 5/2   -> not extended
//! ```
//!
//! Both ratios are integer divisions of the header's non-empty count and are
//! exposed through [`DetectionTuning`].

use serde::{Deserialize, Serialize};

use super::cells::{count_non_empty, count_numeric, has_data};
use crate::error::ExtractError;
use crate::models::{CellGrid, ForcedBounds, TableBounds};

/// Minimum non-empty cells for a header candidate.
pub const DEFAULT_MIN_HEADER_CELLS: usize = 5;
/// Maximum numeric cells for a header candidate.
pub const DEFAULT_MAX_HEADER_NUMERIC: usize = 1;
/// A row with fewer than `expected / 3` filled cells is a footer.
pub const DEFAULT_FOOTER_STOP_DIVISOR: usize = 3;
/// A row with at least `expected / 2` filled cells extends the table.
pub const DEFAULT_EXTEND_DIVISOR: usize = 2;

/// Thresholds for structural detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionTuning {
    pub min_header_cells: usize,
    pub max_header_numeric: usize,
    pub footer_stop_divisor: usize,
    pub extend_divisor: usize,
}

impl Default for DetectionTuning {
    fn default() -> Self {
        Self {
            min_header_cells: DEFAULT_MIN_HEADER_CELLS,
            max_header_numeric: DEFAULT_MAX_HEADER_NUMERIC,
            footer_stop_divisor: DEFAULT_FOOTER_STOP_DIVISOR,
            extend_divisor: DEFAULT_EXTEND_DIVISOR,
        }
    }
}

impl DetectionTuning {
    fn footer_threshold(&self, expected: usize) -> usize {
        expected / self.footer_stop_divisor.max(1)
    }

    fn extend_threshold(&self, expected: usize) -> usize {
        expected / self.extend_divisor.max(1)
    }
}

/// How the bounds of a structural extraction were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundsSource {
    /// Caller-supplied bounds were valid and used verbatim.
    Forced,
    /// A header candidate was found and the extent scan ran.
    Detected,
    /// No header candidate; first row with data to the last row.
    FirstDataRow,
    /// No row has data; the whole grid is returned.
    WholeGrid,
    /// The grid has no rows.
    Empty,
}

/// The row picked as the table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCandidate {
    pub row: usize,
    pub non_empty: usize,
    pub numeric: usize,
}

/// Result of bounds resolution with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Inclusive bounds; `(0, 0)` for an empty grid.
    pub bounds: TableBounds,
    pub source: BoundsSource,
    pub header: Option<HeaderCandidate>,
    /// Forced bounds that were rejected before falling back to detection.
    #[serde(skip)]
    pub rejected: Option<ExtractError>,
}

impl Detection {
    /// Whether the bounds select no rows at all.
    pub fn is_empty(&self) -> bool {
        self.source == BoundsSource::Empty
    }
}

/// Detect table bounds with the default tuning.
///
/// Never fails; returns `(0, 0)` for an empty grid.
pub fn detect_bounds<G>(grid: &G) -> TableBounds
where
    G: CellGrid + ?Sized,
{
    detect_with(grid, &DetectionTuning::default()).bounds
}

/// Detect table bounds with explicit tuning.
pub fn detect_with<G>(grid: &G, tuning: &DetectionTuning) -> Detection
where
    G: CellGrid + ?Sized,
{
    let row_count = grid.row_count();
    if row_count == 0 {
        return Detection {
            bounds: TableBounds::new(0, 0),
            source: BoundsSource::Empty,
            header: None,
            rejected: None,
        };
    }

    let Some(header) = find_header_candidate(grid, tuning) else {
        return fallback(grid);
    };

    let end = scan_extent(grid, header, tuning);
    Detection {
        bounds: TableBounds::new(header.row, end),
        source: BoundsSource::Detected,
        header: Some(header),
        rejected: None,
    }
}

/// Use `forced` when it is valid for the grid, otherwise detect.
///
/// Invalid forced bounds are not fatal: the rejection is kept in
/// [`Detection::rejected`] so callers can report it.
pub fn resolve_bounds<G>(grid: &G, forced: Option<ForcedBounds>, tuning: &DetectionTuning) -> Detection
where
    G: CellGrid + ?Sized,
{
    let Some(forced) = forced else {
        return detect_with(grid, tuning);
    };

    match forced.validate(grid.row_count()) {
        Ok(bounds) => Detection {
            bounds,
            source: BoundsSource::Forced,
            header: None,
            rejected: None,
        },
        Err(err) => Detection {
            rejected: Some(err),
            ..detect_with(grid, tuning)
        },
    }
}

/// Densest row with at least `min_header_cells` filled cells and at most
/// `max_header_numeric` numbers. Ties go to the earliest row.
fn find_header_candidate<G>(grid: &G, tuning: &DetectionTuning) -> Option<HeaderCandidate>
where
    G: CellGrid + ?Sized,
{
    let mut best: Option<HeaderCandidate> = None;

    for index in 0..grid.row_count() {
        let row = grid.row(index);
        let non_empty = count_non_empty(row);
        if non_empty < tuning.min_header_cells {
            continue;
        }
        let numeric = count_numeric(row);
        if numeric > tuning.max_header_numeric {
            continue;
        }
        if best.map_or(true, |b| non_empty > b.non_empty) {
            best = Some(HeaderCandidate {
                row: index,
                non_empty,
                numeric,
            });
        }
    }

    best
}

/// Last row of the table that starts at `header`.
fn scan_extent<G>(grid: &G, header: HeaderCandidate, tuning: &DetectionTuning) -> usize
where
    G: CellGrid + ?Sized,
{
    let expected = header.non_empty;
    let stop_below = tuning.footer_threshold(expected);
    let extend_from = tuning.extend_threshold(expected);
    let mut last_good = header.row;

    for index in header.row + 1..grid.row_count() {
        let non_empty = count_non_empty(grid.row(index));

        if non_empty > 0 && non_empty < stop_below {
            break; // footer or summary
        }
        if non_empty >= extend_from {
            last_good = index;
        } else if non_empty == 0 {
            break;
        }
    }

    last_good
}

fn fallback<G>(grid: &G) -> Detection
where
    G: CellGrid + ?Sized,
{
    let last = grid.row_count() - 1;
    let first_data = (0..grid.row_count()).find(|&index| has_data(grid.row(index)));

    let (start, source) = match first_data {
        Some(start) => (start, BoundsSource::FirstDataRow),
        None => (0, BoundsSource::WholeGrid),
    };

    Detection {
        bounds: TableBounds::new(start, last),
        source,
        header: None,
        rejected: None,
    }
}
