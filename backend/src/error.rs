//! Error types for the tablecrop extraction pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`GridError`] - Reading a grid from raw bytes
//! - [`ExtractError`] - Header resolution and forced bounds
//! - [`ConfigError`] - Mapping/option files and CLI values
//! - [`ConvertError`] - Top-level conversion orchestration
//! - [`ServerError`] - HTTP wrapper
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Grid Reading Errors
// =============================================================================

/// Errors while turning raw bytes into a grid of text cells.
#[derive(Debug, Error)]
pub enum GridError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the content.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Malformed delimited text.
    #[error("Line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Malformed JSON grid.
    #[error("Invalid JSON grid: {0}")]
    JsonError(#[from] serde_json::Error),

    /// No reader accepted the input.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The workbook could not be opened or a sheet could not be read.
    #[error("Failed to read workbook: {0}")]
    WorkbookError(String),

    /// The requested sheet does not exist.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// The workbook holds no sheets at all.
    #[error("Workbook has no sheets")]
    EmptyWorkbook,
}

impl From<calamine::Error> for GridError {
    fn from(err: calamine::Error) -> Self {
        GridError::WorkbookError(err.to_string())
    }
}

impl From<csv::Error> for GridError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        GridError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors raised while resolving headers or validating forced bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// A required field has no alias resolving to it.
    #[error("Required fields have no alias mapping to them: {}", missing.join(", "))]
    RequiredFieldsNotResolvable { missing: Vec<String> },

    /// Two aliases that only differ in case or padding name different fields.
    #[error("Alias '{alias}' maps to both '{first}' and '{second}'")]
    ConflictingAlias {
        alias: String,
        first: String,
        second: String,
    },

    /// No row in the grid contains every required field.
    #[error("No row contains all required headers")]
    MissingHeaders,

    /// Forced bounds outside the grid or in the wrong order.
    #[error("Invalid forced bounds {start}..={end} for a grid of {row_count} rows")]
    InvalidForcedBounds {
        start: usize,
        end: usize,
        row_count: usize,
    },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading mapping/option files or parsing CLI values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("Config IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Config JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Header mapping rejected at construction.
    #[error("Invalid header mapping: {0}")]
    Mapping(#[from] ExtractError),

    /// Separator is not a single character or known name.
    #[error("Invalid separator: '{0}'")]
    InvalidSeparator(String),

    /// Only one of start row / end row was supplied.
    #[error("Forced bounds need both a start row and an end row")]
    IncompleteBounds,
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Top-level conversion errors.
///
/// This is the error type returned by [`crate::extract::pipeline::convert_file`].
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Grid reading error.
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// Extraction error.
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// CSV output error.
    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Packaging several sheets into one archive failed.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl ConvertError {
    /// Whether the failure was caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConvertError::Grid(_) | ConvertError::Extract(_) | ConvertError::Config(_)
        )
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Conversion error.
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for grid reading.
pub type GridResult<T> = Result<T, GridError>;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for conversions.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ExtractError -> ConvertError
        let err: ConvertError = ExtractError::MissingHeaders.into();
        assert!(err.to_string().contains("required headers"));
        assert!(err.is_client_error());

        // ExtractError -> ConfigError -> ConvertError
        let mapping_err: ConfigError = ExtractError::RequiredFieldsNotResolvable {
            missing: vec!["discount".into()],
        }
        .into();
        let err: ConvertError = mapping_err.into();
        assert!(err.to_string().contains("discount"));
    }

    #[test]
    fn test_forced_bounds_message() {
        let err = ExtractError::InvalidForcedBounds {
            start: 4,
            end: 2,
            row_count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("4..=2"));
        assert!(msg.contains("3 rows"));
    }

    #[test]
    fn test_io_error_is_not_client_error() {
        let err: ConvertError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(!err.is_client_error());
    }
}
