//! CSV batch import into one model.
//!
//! The header row names property codes. An optional `_ref` column names
//! each row so that later rows can point at it with a `_ref:<token>` cell.
//! Everything that can be checked without the store's help (parse, header
//! codes, attachment directory, dictionaries) is checked before the
//! transaction opens.

use serde_json::{json, Value};
use std::path::PathBuf;

use super::attachments::FileAttachments;
use super::dictionary::DictionaryResolver;
use super::mapper::RowMapper;
use super::{ImportSummary, ReferenceMap, MODEL_KEY, REF_KEY};
use crate::error::{ConfigError, ConfigResult, ImportError, PipelineResult};
use crate::logs::{log_info, log_success, Progress};
use crate::models::Model;
use crate::parser::{parse_file, ParseResult, DEFAULT_DELIMITER};
use crate::store::{created_id, finish_transaction, ModelKey, Store};

/// Transaction description of a CSV import.
pub const TRANSACTION: &str = "Import CSV";

const CREATE_RECORD: &str = "createRecord";

/// Options of `import-csv`.
#[derive(Debug, Clone)]
pub struct ImportCsvOptions {
    pub file: PathBuf,
    /// Target model path or id
    pub model: String,
    pub file_directory: Option<PathBuf>,
    pub delimiter: u8,
}

impl ImportCsvOptions {
    /// `--model` is required.
    pub fn new(file: PathBuf, model: Option<String>, file_directory: Option<PathBuf>) -> ConfigResult<Self> {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .ok_or(ConfigError::MissingOption("model <model>"))?;
        Ok(Self {
            file,
            model,
            file_directory,
            delimiter: DEFAULT_DELIMITER,
        })
    }
}

/// Import a CSV file; see [`import_parsed`].
pub async fn import_csv<S: Store + ?Sized>(
    store: &mut S,
    options: &ImportCsvOptions,
    files_dir: PathBuf,
) -> PipelineResult<ImportSummary> {
    log_info(format!("📄 Reading {}", options.file.display()));
    let parsed = parse_file(&options.file, options.delimiter).await?;
    log_info(format!(
        "{} rows, {} columns ({})",
        parsed.rows.len(),
        parsed.headers.len(),
        parsed.encoding
    ));

    let attachments = FileAttachments::new(options.file_directory.clone(), files_dir);
    import_parsed(store, &parsed, &options.model, &attachments).await
}

/// Create one record of `model` per parsed row, in file order, inside a
/// single transaction.
pub async fn import_parsed<S: Store + ?Sized>(
    store: &mut S,
    parsed: &ParseResult,
    model: &str,
    attachments: &FileAttachments,
) -> PipelineResult<ImportSummary> {
    if parsed.rows.is_empty() {
        return Err(ImportError::EmptyInput.into());
    }

    let model = store.get_model(&ModelKey::parse(model))?.clone();
    check_headers(&model, &parsed.headers)?;

    let has_files = parsed
        .headers
        .iter()
        .filter_map(|h| model.property(h))
        .any(|p| p.is_file());
    if has_files {
        attachments.directory()?;
    }

    let dictionaries = DictionaryResolver::load(store, &model, Some(&parsed.headers)).await?;

    store.start_transaction(TRANSACTION).await?;
    let result = import_rows(store, parsed, &model, &dictionaries, attachments).await;
    let summary = finish_transaction(store, result).await?;

    log_success(format!(
        "Imported {} records into {}",
        summary.total(),
        model.path
    ));
    Ok(summary)
}

fn check_headers(model: &Model, headers: &[String]) -> PipelineResult<()> {
    for header in headers {
        if header != REF_KEY && model.property(header).is_none() {
            return Err(ImportError::UnknownProperty {
                code: header.clone(),
                model: model.path.clone(),
            }
            .into());
        }
    }
    Ok(())
}

async fn import_rows<S: Store + ?Sized>(
    store: &mut S,
    parsed: &ParseResult,
    model: &Model,
    dictionaries: &DictionaryResolver,
    attachments: &FileAttachments,
) -> PipelineResult<ImportSummary> {
    let mapper = RowMapper::new(Some(model)).with_dictionaries(dictionaries);
    let mut refs = ReferenceMap::new();
    let mut summary = ImportSummary::default();
    let mut progress = Progress::new(TRANSACTION, parsed.rows.len());

    for row in &parsed.rows {
        let mut token = None;
        let mut fields = Vec::with_capacity(row.values.len());
        for (header, value) in row.fields(&parsed.headers) {
            if header == REF_KEY {
                token = Some(value).filter(|t| !t.is_empty());
            } else {
                fields.push((header, cell_value(value)));
            }
        }

        let mut mapped = mapper.map_fields(fields, &refs, row.line)?;
        mapped.attrs.insert(MODEL_KEY.into(), Value::from(model.id));

        let created = store.create_record(mapped.attrs.clone()).await?;
        let id = created_id(&created)?;
        if let Some(token) = token {
            refs.define(token, id);
        }

        summary.attachments += attachments.attach(id, &mapped.files, &mapped.attrs).await?;
        summary.count(CREATE_RECORD);
        progress.tick();
    }

    Ok(summary)
}

/// A `_ref:<token>` cell points at an earlier row; anything else is text.
fn cell_value(cell: &str) -> Value {
    match cell.strip_prefix("_ref:") {
        Some(token) => json!({ REF_KEY: token.trim() }),
        None => Value::String(cell.to_string()),
    }
}
