//! REST API types.

use serde::{Deserialize, Serialize};

use crate::config::parse_separator;
use crate::error::{ServerError, ServerResult};
use crate::extract::pipeline::ConvertOptions;
use crate::parser::{supported_extensions, SheetSelector};

/// Error body of `POST /convert`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConvertResponse {
    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// RFC 3339
    pub timestamp: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub description: String,
}

/// Body of `GET /info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub service: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
    pub supported_formats: Vec<String>,
    pub options: Vec<String>,
}

impl InfoResponse {
    pub fn describe() -> Self {
        let endpoint = |method: &str, path: &str, description: &str| EndpointInfo {
            method: method.to_string(),
            path: path.to_string(),
            description: description.to_string(),
        };

        Self {
            service: "tablecrop".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Extracts the data table from messy spreadsheet exports".to_string(),
            endpoints: vec![
                endpoint("GET", "/health", "Health check"),
                endpoint("GET", "/info", "Service description"),
                endpoint("POST", "/convert", "Upload a file, receive the extracted table as CSV"),
                endpoint("GET", "/api/logs", "SSE stream of conversion logs"),
            ],
            supported_formats: supported_extensions().iter().map(|s| s.to_string()).collect(),
            options: [
                "file: the input file (required)",
                "config: ConvertOptions as JSON",
                "separator: output separator (',', ';', 'tab' or one character)",
                "start_row: forced first table row, 0-based",
                "end_row: forced last table row, 0-based, inclusive",
                "clean_breaks: replace line breaks in cells (true/false)",
                "sheet_name: workbook sheet to read, by name",
                "sheet_index: workbook sheet to read, 0-based",
                "all_sheets: convert every sheet, zip archive when more than one (true/false)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Plain form fields of `POST /convert`, applied over the `config` part.
#[derive(Debug, Clone, Default)]
pub struct ConvertOverrides {
    pub separator: Option<String>,
    pub start_row: Option<String>,
    pub end_row: Option<String>,
    pub clean_breaks: Option<String>,
    pub sheet_name: Option<String>,
    pub sheet_index: Option<String>,
    pub all_sheets: Option<String>,
}

impl ConvertOverrides {
    /// Record a form field; returns false for unknown names.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "separator" => &mut self.separator,
            "start_row" => &mut self.start_row,
            "end_row" => &mut self.end_row,
            "clean_breaks" => &mut self.clean_breaks,
            "sheet_name" => &mut self.sheet_name,
            "sheet_index" => &mut self.sheet_index,
            "all_sheets" => &mut self.all_sheets,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Options with the recorded fields applied; `sheet_name` wins over
    /// `sheet_index`.
    pub fn apply(&self, mut options: ConvertOptions) -> ServerResult<ConvertOptions> {
        if let Some(value) = non_empty(&self.separator) {
            options.separator = parse_separator(value).map_err(|e| ServerError::BadRequest(e.to_string()))?;
        }
        if let Some(value) = non_empty(&self.start_row) {
            options.start_row = Some(parse_row("start_row", value)?);
        }
        if let Some(value) = non_empty(&self.end_row) {
            options.end_row = Some(parse_row("end_row", value)?);
        }
        if let Some(value) = non_empty(&self.clean_breaks) {
            options.clean_line_breaks = parse_flag("clean_breaks", value)?;
        }
        if let Some(value) = non_empty(&self.sheet_name) {
            options.sheet = SheetSelector::Name(value.to_string());
        } else if let Some(value) = non_empty(&self.sheet_index) {
            options.sheet = SheetSelector::Index(parse_row("sheet_index", value)?);
        }
        Ok(options)
    }

    /// Whether every sheet should be converted.
    pub fn all_sheets(&self) -> ServerResult<bool> {
        non_empty(&self.all_sheets).map_or(Ok(false), |value| parse_flag("all_sheets", value))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_row(field: &str, value: &str) -> ServerResult<usize> {
    value
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("{} must be a non-negative integer, got '{}'", field, value)))
}

fn parse_flag(field: &str, value: &str) -> ServerResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ServerError::BadRequest(format!("{} must be true or false, got '{}'", field, value))),
    }
}
