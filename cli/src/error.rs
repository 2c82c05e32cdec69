//! Error types for the objectum administration client.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ConfigError`] - project configuration and missing options
//! - [`StoreError`] - remote store (HTTP session) errors
//! - [`ImportError`] - validation errors raised while mapping rows
//! - [`AttachmentError`] - file attachment copy errors
//! - [`ExportError`] - export pipeline errors
//! - [`PipelineError`] - top-level command errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

use crate::parser::CsvError;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors raised before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `config.json` in the directory or its parent.
    #[error("Configuration of project \"config.json\" not exists in {dir} (or upper \"..\")")]
    NotFound { dir: PathBuf },

    /// Failed to read the configuration file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid or misses a required key.
    #[error("Invalid config.json: {0}")]
    Invalid(#[from] serde_json::Error),

    /// A command-line option required by the command was not given.
    #[error("--{0} not exist")]
    MissingOption(&'static str),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the remote objectum store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport level failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The service answered with an error message.
    #[error("{0}")]
    Remote(String),

    /// Authentication was refused.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The response could not be understood.
    #[error("Invalid store response: {0}")]
    InvalidResponse(String),

    /// No model with this path or id.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Commit or rollback without an open transaction.
    #[error("No open transaction")]
    NoTransaction,

    /// JSON encoding error.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Http(e.to_string())
    }
}

// =============================================================================
// Import (validation) Errors
// =============================================================================

/// Validation errors found while reading or mapping import input.
///
/// `line` is always 1-based: the data row for CSV, the entry index within
/// its section for JSON.
#[derive(Debug, Error)]
pub enum ImportError {
    /// CSV could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// JSON text could not be parsed.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document does not match the expected shape.
    #[error("Invalid document: {}", .0.join("; "))]
    InvalidDocument(Vec<String>),

    /// Required attributes are missing.
    #[error("{0} not exist")]
    MissingAttrs(&'static str),

    /// The input has no data rows.
    #[error("No rows to import")]
    EmptyInput,

    /// A header names a code the model does not have.
    #[error("Unknown property '{code}' in model '{model}'")]
    UnknownProperty { code: String, model: String },

    /// A `{"_ref": ...}` token was consumed before being defined.
    #[error("Line {line}: _ref not exist: {token}")]
    UnknownRef { token: String, line: usize },

    /// A dictionary value matched no entry.
    #[error("Line {line}: unknown dictionary parameter '{value}' (property '{property}')")]
    UnknownDictionaryValue {
        value: String,
        property: String,
        line: usize,
    },

    /// A numeric field did not parse after cleanup.
    #[error("Line {line}: invalid number '{value}' (property '{property}')")]
    InvalidNumber {
        value: String,
        property: String,
        line: usize,
    },

    /// A record entry without `_model`.
    #[error("Line {line}: _model not exist")]
    MissingModel { line: usize },
}

// =============================================================================
// Attachment Errors
// =============================================================================

/// Errors while copying attachment files.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// File-typed values are present but no directory was configured.
    #[error("--file-directory <directory> not exist")]
    MissingDirectory,

    /// Source file could not be read.
    #[error("Cannot read file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Target file could not be written.
    #[error("Cannot write file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors during CSV / JSON export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A record references a record that was not exported before it.
    #[error("unknown ref: {0}")]
    UnknownRef(String),

    /// An `opts` attribute holds text that is not JSON.
    #[error("opts parse error. rsc: \"{rsc}\", id: {id}: {message}")]
    InvalidOpts {
        rsc: &'static str,
        id: i64,
        message: String,
    },

    /// CSV writer error.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level command errors.
///
/// Every command returns this type; `main` prints it and exits non-zero.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Remote store error.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Validation error.
    #[error("{0}")]
    Import(#[from] ImportError),

    /// Attachment copy error.
    #[error("{0}")]
    Attachment(#[from] AttachmentError),

    /// Export error.
    #[error("{0}")]
    Export(#[from] ExportError),

    /// IO error on input or output files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error on output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CsvError> for PipelineError {
    fn from(e: CsvError) -> Self {
        PipelineError::Import(ImportError::Csv(e))
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::Export(ExportError::Csv(e))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for row mapping.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for attachment copies.
pub type AttachmentResult<T> = Result<T, AttachmentError>;

/// Result type for commands.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let import_err = ImportError::EmptyInput;
        let pipeline_err: PipelineError = import_err.into();
        assert!(pipeline_err.to_string().contains("No rows"));

        let store_err = StoreError::Remote("transaction not started".into());
        let pipeline_err: PipelineError = store_err.into();
        assert_eq!(pipeline_err.to_string(), "transaction not started");
    }

    #[test]
    fn test_dictionary_error_names_value_and_line() {
        let err = ImportError::UnknownDictionaryValue {
            value: "Purple".into(),
            property: "color".into(),
            line: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("Line 3"));
        assert!(msg.contains("unknown dictionary parameter"));
        assert!(msg.contains("Purple"));
    }

    #[test]
    fn test_missing_option_format() {
        let err = ConfigError::MissingOption("model <model>");
        assert_eq!(err.to_string(), "--model <model> not exist");
    }
}
