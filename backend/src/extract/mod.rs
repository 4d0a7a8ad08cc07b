//! Table extraction module.
//!
//! This module locates the data table inside a raw grid and streams it out:
//! - `cells`: Cell classification (blank, numeric, cleanup)
//! - `header`: Header resolution from an alias mapping
//! - `bounds`: Structural boundary detection
//! - `filter`: Required-cell checks and column projection
//! - `region`: Mode selection and the lazy output sequence
//! - `pipeline`: Reading, extracting and writing delimited text
//! - `sheets`: Converting every sheet of a workbook, zip packaging
//!
//! ## Usage Flow
//!
//! ```text
//! Grid ─┬─ mapping ──▶ header::resolve_header ──┐
//!       │                                       ├─▶ region::Extraction ─▶ filter ─▶ rows
//!       └─ none ─────▶ bounds::resolve_bounds ──┘
//! ```

pub mod bounds;
pub mod cells;
pub mod filter;
pub mod header;
pub mod pipeline;
pub mod region;
pub mod sheets;

pub use bounds::{detect_bounds, detect_with, resolve_bounds, BoundsSource, Detection, DetectionTuning, HeaderCandidate};
pub use filter::{is_valid_row, project_row};
pub use header::resolve_header;
pub use pipeline::*;
pub use region::{extract, ExtractMode, Extraction, ExtractionPlan, RegionExtractor};
pub use sheets::{convert_all_sheets, output_stem, sheet_file_name, write_sheets, zip_sheets, SheetConversion};
