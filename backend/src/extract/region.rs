//! Region extraction: resolve where the table is, then stream its rows.
//!
//! Resolution happens eagerly in [`RegionExtractor::extract`], so errors
//! surface before any row is produced. Rows are produced lazily by the
//! returned [`Extraction`] iterator, one at a time, straight from the grid.

use super::bounds::{resolve_bounds, Detection, DetectionTuning};
use super::filter::{is_valid_row, project_row};
use super::header::resolve_header;
use crate::error::ExtractResult;
use crate::models::{CellGrid, ForcedBounds, HeaderMapping, HeaderResolution};

/// How the table is located.
#[derive(Debug, Clone, Copy)]
pub enum ExtractMode<'m> {
    /// Find the header row through aliases, project matter columns and drop
    /// rows missing required cells.
    HeaderDriven(&'m HeaderMapping),
    /// Infer bounds from density (or use valid forced bounds) and return the
    /// rows full width.
    StructuralOnly(Option<ForcedBounds>),
}

/// Resolved layout of the table inside the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionPlan {
    Header(HeaderResolution),
    Structural(Detection),
}

/// Extractor configured with detection thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionExtractor {
    tuning: DetectionTuning,
}

impl RegionExtractor {
    pub fn new(tuning: DetectionTuning) -> Self {
        Self { tuning }
    }

    /// Resolve the table and return a lazy row sequence over it.
    pub fn extract<'g, G>(&self, grid: &'g G, mode: ExtractMode<'_>) -> ExtractResult<Extraction<'g, G>>
    where
        G: CellGrid + ?Sized,
    {
        let plan = match mode {
            ExtractMode::HeaderDriven(mapping) => ExtractionPlan::Header(resolve_header(grid, mapping)?),
            ExtractMode::StructuralOnly(forced) => {
                ExtractionPlan::Structural(resolve_bounds(grid, forced, &self.tuning))
            }
        };
        Ok(Extraction::new(grid, plan))
    }
}

/// Extract with the default detection thresholds.
pub fn extract<'g, G>(grid: &'g G, mode: ExtractMode<'_>) -> ExtractResult<Extraction<'g, G>>
where
    G: CellGrid + ?Sized,
{
    RegionExtractor::default().extract(grid, mode)
}

/// Lazy, single-pass sequence of output rows.
///
/// In header-driven mode the first item is the projected header row.
pub struct Extraction<'g, G: ?Sized> {
    grid: &'g G,
    plan: ExtractionPlan,
    cursor: usize,
    header_pending: bool,
    omitted: usize,
}

impl<'g, G> Extraction<'g, G>
where
    G: CellGrid + ?Sized,
{
    fn new(grid: &'g G, plan: ExtractionPlan) -> Self {
        let cursor = match &plan {
            ExtractionPlan::Header(resolution) => resolution.header_row,
            ExtractionPlan::Structural(detection) => detection.bounds.start,
        };
        Self {
            grid,
            header_pending: matches!(plan, ExtractionPlan::Header(_)),
            plan,
            cursor,
            omitted: 0,
        }
    }

    pub fn plan(&self) -> &ExtractionPlan {
        &self.plan
    }

    /// Data rows dropped so far for blank required cells.
    pub fn omitted(&self) -> usize {
        self.omitted
    }

    fn next_projected(&mut self) -> Option<Vec<String>> {
        let ExtractionPlan::Header(resolution) = &self.plan else {
            return None;
        };
        if self.header_pending {
            self.header_pending = false;
            self.cursor = resolution.header_row + 1;
            return Some(project_row(self.grid.row(resolution.header_row), &resolution.matter_indexes));
        }
        while self.cursor < self.grid.row_count() {
            let row = self.grid.row(self.cursor);
            self.cursor += 1;
            if is_valid_row(row, &resolution.required_indexes) {
                return Some(project_row(row, &resolution.matter_indexes));
            }
            self.omitted += 1;
        }
        None
    }

    fn next_verbatim(&mut self) -> Option<Vec<String>> {
        let ExtractionPlan::Structural(detection) = &self.plan else {
            return None;
        };
        if detection.is_empty() || self.cursor > detection.bounds.end {
            return None;
        }
        let row = self.grid.row(self.cursor).to_vec();
        self.cursor += 1;
        Some(row)
    }
}

impl<G> Iterator for Extraction<'_, G>
where
    G: CellGrid + ?Sized,
{
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.plan {
            ExtractionPlan::Header(_) => self.next_projected(),
            ExtractionPlan::Structural(_) => self.next_verbatim(),
        }
    }
}
