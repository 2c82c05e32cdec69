//! JSON document import.
//!
//! A document holds up to six command sections, always run in this order:
//! `createModel`, `createProperty`, `createQuery`, `createColumn`,
//! `createRecord`, `updateModel`. Entries may define `_ref` tokens and point
//! at earlier entries, in any section, with `{"_ref": token}`. The whole
//! document is one transaction.

use serde_json::Value;
use std::path::PathBuf;

use super::attachments::FileAttachments;
use super::mapper::RowMapper;
use super::{ImportSummary, ReferenceMap, MODEL_KEY, REF_KEY};
use crate::error::{ImportError, PipelineResult};
use crate::logs::{log_error, log_info, log_success, Progress};
use crate::models::Resource;
use crate::store::{created_id, finish_transaction, Attrs, ModelKey, Store};
use crate::validation::validate_import_document;

/// Transaction description of a JSON import.
pub const TRANSACTION: &str = "Import JSON";

/// Options of `import-json`.
#[derive(Debug, Clone)]
pub struct ImportJsonOptions {
    pub file: PathBuf,
    pub file_directory: Option<PathBuf>,
}

/// A section of the import document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportCommand {
    CreateModel,
    CreateProperty,
    CreateQuery,
    CreateColumn,
    CreateRecord,
    UpdateModel,
}

impl ImportCommand {
    /// Processing order.
    pub const ORDER: [ImportCommand; 6] = [
        Self::CreateModel,
        Self::CreateProperty,
        Self::CreateQuery,
        Self::CreateColumn,
        Self::CreateRecord,
        Self::UpdateModel,
    ];

    /// Section key in the document.
    pub fn key(&self) -> &'static str {
        match self {
            Self::CreateModel => "createModel",
            Self::CreateProperty => "createProperty",
            Self::CreateQuery => "createQuery",
            Self::CreateColumn => "createColumn",
            Self::CreateRecord => "createRecord",
            Self::UpdateModel => "updateModel",
        }
    }

    /// Resource created by the section; `None` for `updateModel`.
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Self::CreateModel => Some(Resource::Model),
            Self::CreateProperty => Some(Resource::Property),
            Self::CreateQuery => Some(Resource::Query),
            Self::CreateColumn => Some(Resource::Column),
            Self::CreateRecord => Some(Resource::Record),
            Self::UpdateModel => None,
        }
    }
}

/// Read, validate and import a JSON document file.
pub async fn import_json<S: Store + ?Sized>(
    store: &mut S,
    options: &ImportJsonOptions,
    files_dir: PathBuf,
) -> PipelineResult<ImportSummary> {
    log_info(format!("📄 Reading {}", options.file.display()));
    let text = tokio::fs::read_to_string(&options.file).await?;
    let document: Value = serde_json::from_str(&text).map_err(ImportError::Json)?;

    let attachments = FileAttachments::new(options.file_directory.clone(), files_dir);
    import_document(store, &document, &attachments).await
}

/// Run every section of a parsed document in one transaction.
pub async fn import_document<S: Store + ?Sized>(
    store: &mut S,
    document: &Value,
    attachments: &FileAttachments,
) -> PipelineResult<ImportSummary> {
    validate_import_document(document).map_err(ImportError::InvalidDocument)?;

    store.start_transaction(TRANSACTION).await?;
    let result = run_sections(store, document, attachments).await;
    let summary = finish_transaction(store, result).await?;

    log_success(format!("Imported {} objects", summary.total()));
    Ok(summary)
}

async fn run_sections<S: Store + ?Sized>(
    store: &mut S,
    document: &Value,
    attachments: &FileAttachments,
) -> PipelineResult<ImportSummary> {
    let mut refs = ReferenceMap::new();
    let mut summary = ImportSummary::default();

    for command in ImportCommand::ORDER {
        let Some(entries) = document.get(command.key()).and_then(Value::as_array) else {
            continue;
        };
        if entries.is_empty() {
            continue;
        }

        log_info(format!("{}: {} entries", command.key(), entries.len()));
        let mut progress = Progress::new(command.key(), entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let Some(entry) = entry.as_object() else {
                continue;
            };
            if let Err(e) = run_entry(store, command, entry, &mut refs, attachments, index + 1, &mut summary).await {
                log_error(format!("{}, entry {}: {}", command.key(), index + 1, e));
                return Err(e);
            }
            summary.count(command.key());
            progress.tick();
        }
    }

    Ok(summary)
}

async fn run_entry<S: Store + ?Sized>(
    store: &mut S,
    command: ImportCommand,
    entry: &Attrs,
    refs: &mut ReferenceMap,
    attachments: &FileAttachments,
    line: usize,
    summary: &mut ImportSummary,
) -> PipelineResult<()> {
    let fields = entry.iter().map(|(k, v)| (k.as_str(), v.clone()));

    let Some(rsc) = command.resource() else {
        let mapped = RowMapper::new(None).map_fields(fields, refs, line)?;
        store.update_model(mapped.attrs).await?;
        return Ok(());
    };

    let created = if rsc == Resource::Record {
        let model_id = record_model(store, entry, refs, line)?;
        let model = store.get_model(&ModelKey::Id(model_id))?.clone();

        let mut mapped = RowMapper::new(Some(&model)).map_fields(fields, refs, line)?;
        let given = entry
            .get(MODEL_KEY)
            .filter(|v| !v.is_object())
            .cloned()
            .unwrap_or(Value::from(model.id));
        mapped.attrs.insert(MODEL_KEY.into(), given);

        let created = store.create_record(mapped.attrs.clone()).await?;
        let id = created_id(&created)?;
        summary.attachments += attachments.attach(id, &mapped.files, &mapped.attrs).await?;
        created
    } else {
        let mapped = RowMapper::new(None).map_fields(fields, refs, line)?;
        store.create(rsc, mapped.attrs).await?
    };

    if let Some(token) = entry.get(REF_KEY).and_then(token_of) {
        refs.define(token, created_id(&created)?);
    }
    Ok(())
}

/// Model id of a record entry: a path, an id, or `{"_ref": token}`.
fn record_model<S: Store + ?Sized>(
    store: &S,
    entry: &Attrs,
    refs: &ReferenceMap,
    line: usize,
) -> PipelineResult<i64> {
    let value = entry
        .get(MODEL_KEY)
        .ok_or(ImportError::MissingModel { line })?;

    if let Some(token) = value.get(REF_KEY).and_then(token_of) {
        return Ok(refs.resolve(&token, line)?);
    }
    let key = ModelKey::from_value(value).ok_or(ImportError::MissingModel { line })?;
    Ok(store.get_model(&key)?.id)
}

fn token_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
