//! # objectum-cli - administration client for objectum projects
//!
//! Creates schema objects in a running objectum project and moves data in
//! and out of it: CSV import/export of one model's records, and JSON
//! documents describing schema and records.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / JSON │────▶│   Parser /  │────▶│  RowMapper  │────▶│    Store    │
//! │    file     │     │  Validation │     │ (refs, dict)│     │ (HTTP, tx)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                                    │
//!                      ┌─────────────┐     ┌─────────────┐           │
//!                      │ public/files│◀────│ Attachments │◀──────────┘
//!                      └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use objectum_cli::{import_csv, HttpStore, ImportCsvOptions, ProjectConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProjectConfig::resolve(None)?;
//!     let mut store = HttpStore::connect(&config).await?;
//!     let options = ImportCsvOptions::new("people.csv".into(), Some("crm.person".into()), None)?;
//!     let summary = import_csv(&mut store, &options, config.files_dir()).await?;
//!     println!("Imported {} records", summary.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Schema models (Model, Property, DictEntry)
//! - [`config`] - Project `config.json`
//! - [`logs`] - Command log and progress output
//! - [`parser`] - CSV parsing with encoding detection
//! - [`validation`] - JSON Schema validation of command input
//! - [`store`] - Remote store session and schema cache
//! - [`import`] - CSV / JSON import pipeline
//! - [`export`] - CSV / JSON export pipeline
//! - [`admin`] - Single-object commands, dictionaries and tables

// Core modules
pub mod error;
pub mod models;

// Project and output
pub mod config;
pub mod logs;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Remote store
pub mod store;

// Pipelines
pub mod admin;
pub mod export;
pub mod import;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AttachmentError,
    ConfigError,
    ExportError,
    ImportError,
    PipelineError,
    PipelineResult,
    StoreError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{DictEntry, Model, Property, PropertyKind, Resource};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::ProjectConfig;

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{parse_bytes, parse_file, parse_str, CsvError, CsvRow, ParseResult};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{Attrs, HttpStore, ModelKey, Store};

// =============================================================================
// Re-exports - Pipelines
// =============================================================================

pub use import::{
    import_csv,
    import_json,
    DictionaryResolver,
    ImportCommand,
    ImportCsvOptions,
    ImportJsonOptions,
    ImportSummary,
    ReferenceMap,
    RowMapper,
};

pub use export::{export_csv, export_json, ExportCsvOptions, ExportJsonOptions};

pub use admin::{
    create_dictionary,
    create_object,
    create_table,
    parse_attrs,
    update_model,
    DictionaryOptions,
    TableOptions,
};
