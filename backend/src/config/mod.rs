//! Configuration loading: header mapping files, option files and
//! separator names.
//!
//! # Mapping file
//!
//! ```json
//! {
//!   "aliases": { "make": "brand", "price usd": "price" },
//!   "required": ["price"]
//! }
//! ```
//!
//! # Options file
//!
//! Any subset of [`ConvertOptions`] in camelCase; missing fields keep their
//! defaults.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::extract::pipeline::ConvertOptions;
use crate::models::{HeaderMapping, HeaderMappingConfig};

/// Port used by `serve` when neither `--port` nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 8080;

/// Read a mapping file without validating it.
pub fn load_mapping_config(path: impl AsRef<Path>) -> ConfigResult<HeaderMappingConfig> {
    let content = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&content)?)
}

/// Read and validate a mapping file.
pub fn load_mapping(path: impl AsRef<Path>) -> ConfigResult<HeaderMapping> {
    let config = load_mapping_config(path)?;
    Ok(HeaderMapping::try_from(config)?)
}

/// Read an options file.
pub fn load_options(path: impl AsRef<Path>) -> ConfigResult<ConvertOptions> {
    let content = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse a separator given by name or as a single ASCII character.
///
/// Accepts `,` `;` `tab`, `\t`, `comma`, `semicolon`, `pipe` and any other
/// single ASCII character.
pub fn parse_separator(value: &str) -> ConfigResult<char> {
    match value {
        "comma" => Ok(','),
        "semicolon" => Ok(';'),
        "tab" | "\\t" | "\t" => Ok('\t'),
        "pipe" => Ok('|'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c),
                _ => Err(ConfigError::InvalidSeparator(value.to_string())),
            }
        }
    }
}

/// Printable name of a separator, for logs.
pub fn separator_name(separator: char) -> String {
    match separator {
        ',' => "comma (,)".to_string(),
        ';' => "semicolon (;)".to_string(),
        '\t' => "tab (\\t)".to_string(),
        c => format!("custom ({})", c),
    }
}

/// Server port from the `PORT` environment variable, if set and valid.
pub fn port_from_env() -> Option<u16> {
    std::env::var("PORT").ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use tempfile::tempdir;

    #[test]
    fn test_parse_separator_names() {
        assert_eq!(parse_separator(",").unwrap(), ',');
        assert_eq!(parse_separator("semicolon").unwrap(), ';');
        assert_eq!(parse_separator("tab").unwrap(), '\t');
        assert_eq!(parse_separator("\\t").unwrap(), '\t');
        assert_eq!(parse_separator("|").unwrap(), '|');
    }

    #[test]
    fn test_parse_separator_rejects_garbage() {
        assert!(matches!(parse_separator(""), Err(ConfigError::InvalidSeparator(_))));
        assert!(matches!(parse_separator(";;"), Err(ConfigError::InvalidSeparator(_))));
        assert!(matches!(parse_separator("§"), Err(ConfigError::InvalidSeparator(_))));
    }

    #[test]
    fn test_separator_name() {
        assert_eq!(separator_name('\t'), "tab (\\t)");
        assert_eq!(separator_name('|'), "custom (|)");
    }

    #[test]
    fn test_load_mapping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        fs::write(&path, r#"{ "aliases": { "Price USD": "price" }, "required": ["price"] }"#).unwrap();

        let mapping = load_mapping(&path).unwrap();
        assert_eq!(mapping.aliases().collect::<Vec<_>>(), vec![("price usd", "price")]);
    }

    #[test]
    fn test_load_mapping_with_unresolvable_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        fs::write(&path, r#"{ "aliases": { "make": "brand" }, "required": ["discount"] }"#).unwrap();

        let err = load_mapping(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Mapping(ExtractError::RequiredFieldsNotResolvable { .. })
        ));
    }

    #[test]
    fn test_load_options_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, r#"{ "cleanLineBreaks": false }"#).unwrap();

        let options = load_options(&path).unwrap();
        assert!(!options.clean_line_breaks);
        assert_eq!(options.separator, ',');
        assert!(options.mapping.is_none());
    }

    #[test]
    fn test_load_options_named_separator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("options.json");

        fs::write(&path, r#"{ "separator": "pipe", "sheet": "Stock" }"#).unwrap();
        assert_eq!(load_options(&path).unwrap().separator, '|');

        fs::write(&path, r#"{ "separator": "double-colon" }"#).unwrap();
        assert!(matches!(load_options(&path), Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_options(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
