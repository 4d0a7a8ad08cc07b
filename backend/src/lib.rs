//! # Tablecrop - find the data table inside messy spreadsheet exports
//!
//! Exports from spreadsheets and business tools wrap the actual table in
//! titles, contact lines, notes and footers. Tablecrop locates the table
//! either through a header alias mapping or by row density, and writes it
//! out as clean delimited text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV/JSON/XLS│────▶│   Parser    │────▶│   Extract   │────▶│  Clean CSV  │
//! │  (any enc)  │     │(enc, sheets)│     │ (hdr/bounds)│     │ (stream/zip)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tablecrop::{extract, ExtractMode, Grid, HeaderMapping};
//!
//! let grid = Grid::from_rows(vec![
//!     vec!["ACME Motors", "", ""],
//!     vec!["Make", "Description", "Price USD"],
//!     vec!["Ford", "Focus", "20000"],
//! ]);
//! let mapping = HeaderMapping::new([("price usd", "price")], ["price"])?;
//! for row in extract(&grid, ExtractMode::HeaderDriven(&mapping))? {
//!     println!("{}", row.join(","));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Grid, header mapping and bounds types
//! - [`parser`] - Grid readers with encoding and delimiter detection
//! - [`extract`] - Header resolution, boundary detection, filtering and output
//! - [`config`] - Mapping and option files
//! - [`api`] - HTTP API server and log broadcaster

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Extraction
pub mod extract;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, ConvertError, ConvertResult, ExtractError, ExtractResult, GridError, GridResult,
    ServerError, ServerResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellGrid, ForcedBounds, Grid, HeaderMapping, HeaderMappingConfig, HeaderResolution, TableBounds};

// =============================================================================
// Re-exports - Grid reading
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, list_sheets, read_grid, read_grid_file, read_sheet,
    read_sheet_file, GridInfo, GridReader, ParsedGrid, SheetInfo, SheetSelector,
};

// =============================================================================
// Re-exports - Extraction
// =============================================================================

pub use extract::{
    detect_bounds, detect_with, extract, resolve_bounds, resolve_header, BoundsSource, Detection, DetectionTuning,
    ExtractMode, Extraction, ExtractionPlan, HeaderCandidate, RegionExtractor,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use extract::pipeline::{
    convert_bytes, convert_file, convert_grid, ConvertOptions, ConvertOutput, ConvertSummary, ExtractionKind,
};
pub use extract::sheets::{convert_all_sheets, zip_sheets, SheetConversion};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{load_mapping, load_options, parse_separator};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
