/// Structured error types for vitrina-core.
///
/// Uses `thiserror` for better API surface and error composition.
/// Binary crates (vitrina-cli) can still use `anyhow` for convenience,
/// but library consumers get structured, composable errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for vitrina-core operations
#[derive(Error, Debug)]
pub enum VitrinaError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// JSON parsing or serialization failed
    #[error("JSON error at {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// CSV parsing failed
    #[error("CSV error in file {path:?}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },

    /// Required field missing
    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// Phone number could not be normalized to a valid subscriber number
    #[error("Invalid phone number '{value}': {reason}")]
    InvalidPhone { value: String, reason: String },

    /// Invalid timestamp format
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// File or directory not found
    #[error("Path not found: {path:?}")]
    PathNotFound { path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for vitrina-core operations
pub type Result<T> = std::result::Result<T, VitrinaError>;

impl VitrinaError {
    /// Create a JSON error with context
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Create a CSV error for a given file
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid phone error
    pub fn invalid_phone(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPhone {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid timestamp error
    pub fn invalid_timestamp(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VitrinaError::missing_field("crm_id", "deal snapshot row");
        assert_eq!(
            err.to_string(),
            "Missing required field 'crm_id' in deal snapshot row"
        );

        let err = VitrinaError::config("DATABASE_URL is not set");
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: VitrinaError = io_err.into();

        assert!(matches!(err, VitrinaError::Io { .. }));
    }
}
