//! Import pipeline: CSV rows and JSON documents into a running store.
//!
//! Each import is one batch driven inside a single store transaction:
//!
//! ```text
//! input ──► parse ──► RowMapper ──► Store::create ──► FileAttachments
//!                       │   ▲              │
//!                       │   └─ ReferenceMap ◄┘ (token -> created id)
//!                       └──► DictionaryResolver (CSV only)
//! ```
//!
//! The first error stops the batch and rolls the transaction back.
//!
//! # Example
//!
//! ```rust,ignore
//! use objectum_cli::import::{import_csv, ImportCsvOptions};
//!
//! let options = ImportCsvOptions::new("people.csv".into(), Some("crm.person".into()), None)?;
//! let summary = import_csv(&mut store, &options, config.files_dir()).await?;
//! println!("{} records", summary.total());
//! ```

pub mod attachments;
pub mod csv;
pub mod dictionary;
pub mod json;
pub mod mapper;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::{ImportError, ImportResult};

pub use attachments::FileAttachments;
pub use self::csv::{import_csv, import_parsed, ImportCsvOptions};
pub use dictionary::DictionaryResolver;
pub use self::json::{import_document, import_json, ImportCommand, ImportJsonOptions};
pub use mapper::{MappedRow, RowMapper};

/// Attribute key that names a row for later back-references.
pub const REF_KEY: &str = "_ref";

/// Attribute key that names the model of a record.
pub const MODEL_KEY: &str = "_model";

// =============================================================================
// Reference map
// =============================================================================

/// Tokens defined by `_ref`, mapped to the ids the store assigned.
///
/// Scoped to one batch. A token is only visible to rows processed after the
/// row that defined it.
#[derive(Debug, Default)]
pub struct ReferenceMap {
    ids: HashMap<String, i64>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a token to a created id. Redefining a token rebinds it.
    pub fn define(&mut self, token: impl Into<String>, id: i64) {
        self.ids.insert(token.into(), id);
    }

    pub fn get(&self, token: &str) -> Option<i64> {
        self.ids.get(token).copied()
    }

    /// Id of a token, or `UnknownRef` naming the row that asked for it.
    pub fn resolve(&self, token: &str, line: usize) -> ImportResult<i64> {
        self.get(token).ok_or_else(|| ImportError::UnknownRef {
            token: token.to_string(),
            line,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// =============================================================================
// Summary
// =============================================================================

/// What a committed import did.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Objects created or updated, by command (`createRecord`, ...)
    pub created: BTreeMap<String, usize>,
    /// Attachment files copied into the project
    pub attachments: usize,
}

impl ImportSummary {
    pub fn count(&mut self, command: &str) {
        *self.created.entry(command.to_string()).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.created.values().sum()
    }
}
