//! Export of the user schema, and optionally records, as an import document.
//!
//! Ids that only make sense inside one store (parents, owning models,
//! property types, owning queries) are written as dotted paths. Records get
//! a `ref-{id}` token and reference values become `{"_ref": ...}`, so the
//! document can be imported into another project.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;

use super::is_set;
use crate::error::{ExportError, PipelineResult};
use crate::import::mapper::to_tab_json;
use crate::import::{FileAttachments, ImportCommand, MODEL_KEY, REF_KEY};
use crate::logs::{log_info, log_success};
use crate::models::{Resource, FIRST_USER_ID};
use crate::store::{Attrs, ModelKey, Store};

/// Exported attributes per schema resource.
const MODEL_ATTRS: &[&str] = &[
    "parent", "name", "code", "description", "order", "unlogged", "query", "opts",
];
const PROPERTY_ATTRS: &[&str] = &[
    "model", "name", "code", "description", "order", "type", "notNull", "secure", "unique",
    "validFunc", "removeRule", "opts",
];
const QUERY_ATTRS: &[&str] = &[
    "parent", "name", "code", "description", "order", "query", "layout", "iconCls", "system",
    "model", "opts",
];
const COLUMN_ATTRS: &[&str] = &[
    "query", "name", "code", "description", "order", "property", "area", "columnWidth", "opts",
];

/// Options of `export-json`.
#[derive(Debug, Clone, Default)]
pub struct ExportJsonOptions {
    pub file: PathBuf,
    /// Models whose records are exported too
    pub records: Vec<String>,
    pub file_directory: Option<PathBuf>,
}

impl ExportJsonOptions {
    /// `--records a.b,c` as a list of model paths.
    pub fn parse_records(records: Option<&str>) -> Vec<String> {
        records
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Build the document and write it, tab-indented, to the target file.
pub async fn export_json<S: Store + ?Sized>(
    store: &mut S,
    options: &ExportJsonOptions,
    files_dir: PathBuf,
) -> PipelineResult<()> {
    let attachments = FileAttachments::new(options.file_directory.clone(), files_dir);
    let document = build_document(store, &options.records, &attachments).await?;

    tokio::fs::write(&options.file, to_tab_json(&document)?).await?;
    log_success(format!("Written {}", options.file.display()));
    Ok(())
}

/// The import document describing the store's user schema and the records
/// of `record_models`.
pub async fn build_document<S: Store + ?Sized>(
    store: &mut S,
    record_models: &[String],
    attachments: &FileAttachments,
) -> PipelineResult<Map<String, Value>> {
    let mut document = Map::new();

    let queries = sorted(store.list(Resource::Query).await?);
    let query_paths = tree_paths(&queries);

    let sections = [
        (ImportCommand::CreateModel, Resource::Model, MODEL_ATTRS),
        (ImportCommand::CreateProperty, Resource::Property, PROPERTY_ATTRS),
        (ImportCommand::CreateQuery, Resource::Query, QUERY_ATTRS),
        (ImportCommand::CreateColumn, Resource::Column, COLUMN_ATTRS),
    ];
    for (command, rsc, attrs) in sections {
        let rows = if rsc == Resource::Query {
            queries.clone()
        } else {
            sorted(store.list(rsc).await?)
        };

        let mut entries = Vec::new();
        for row in &rows {
            if is_system(rsc, row) {
                continue;
            }
            entries.push(Value::Object(schema_entry(&*store, rsc, row, attrs, &query_paths)?));
        }
        log_info(format!("{}: {}", command.key(), entries.len()));
        document.insert(command.key().into(), Value::Array(entries));
    }

    if !record_models.is_empty() {
        let records = record_entries(store, record_models, attachments).await?;
        log_info(format!("{}: {}", ImportCommand::CreateRecord.key(), records.len()));
        document.insert(ImportCommand::CreateRecord.key().into(), Value::Array(records));
    }

    Ok(document)
}

fn row_id(row: &Attrs) -> i64 {
    row.get("id").and_then(Value::as_i64).unwrap_or_default()
}

fn sorted(mut rows: Vec<Attrs>) -> Vec<Attrs> {
    rows.sort_by_key(row_id);
    rows
}

/// System models and objects flagged `schema` are not exported.
fn is_system(rsc: Resource, row: &Attrs) -> bool {
    (rsc == Resource::Model && row_id(row) < FIRST_USER_ID)
        || row.get("schema").is_some_and(is_set)
}

/// Dotted paths of a parent/code tree.
fn tree_paths(rows: &[Attrs]) -> HashMap<i64, String> {
    let nodes: HashMap<i64, (Option<i64>, &str)> = rows
        .iter()
        .map(|row| {
            let parent = row.get("parent").and_then(Value::as_i64);
            let code = row.get("code").and_then(Value::as_str).unwrap_or_default();
            (row_id(row), (parent, code))
        })
        .collect();

    let mut paths = HashMap::new();
    for &id in nodes.keys() {
        let mut codes = Vec::new();
        let mut current = Some(id);
        while let Some((parent, code)) = current.and_then(|c| nodes.get(&c)) {
            codes.push(*code);
            if codes.len() > nodes.len() {
                break;
            }
            current = *parent;
        }
        codes.reverse();
        paths.insert(id, codes.join("."));
    }
    paths
}

fn schema_entry<S: Store + ?Sized>(
    store: &S,
    rsc: Resource,
    row: &Attrs,
    attrs: &[&str],
    query_paths: &HashMap<i64, String>,
) -> PipelineResult<Attrs> {
    let model_path = |value: &Value| -> Value {
        value
            .as_i64()
            .and_then(|id| store.find_model(&ModelKey::Id(id)))
            .map(|m| Value::from(m.path.clone()))
            .unwrap_or_else(|| value.clone())
    };
    let query_path = |value: &Value| -> Value {
        value
            .as_i64()
            .and_then(|id| query_paths.get(&id))
            .map(|p| Value::from(p.clone()))
            .unwrap_or_else(|| value.clone())
    };

    let mut entry = Attrs::new();
    for &attr in attrs {
        let Some(value) = row.get(attr).filter(|v| is_set(v)) else {
            continue;
        };
        let value = match (rsc, attr) {
            (Resource::Model, "parent") | (Resource::Property, "model") => model_path(value),
            // system type codes stay numeric
            (Resource::Property, "type") if value.as_i64().is_some_and(|t| t >= FIRST_USER_ID) => {
                model_path(value)
            }
            (Resource::Query, "parent") | (Resource::Column, "query") => query_path(value),
            (Resource::Query, "query") => match value {
                Value::String(text) => Value::from(text.split('\n').collect::<Vec<_>>()),
                other => other.clone(),
            },
            (_, "opts") => match value {
                Value::String(text) => {
                    serde_json::from_str(text).map_err(|e| ExportError::InvalidOpts {
                        rsc: rsc.as_str(),
                        id: row_id(row),
                        message: e.to_string(),
                    })?
                }
                other => other.clone(),
            },
            _ => value.clone(),
        };
        entry.insert(attr.into(), value);
    }
    Ok(entry)
}

async fn record_entries<S: Store + ?Sized>(
    store: &mut S,
    record_models: &[String],
    attachments: &FileAttachments,
) -> PipelineResult<Vec<Value>> {
    let mut refs: HashMap<i64, String> = HashMap::new();
    let mut entries = Vec::new();
    let mut file_count = 1;

    for model in record_models {
        let model = store.get_model(&ModelKey::parse(model))?.clone();
        let records = store.get_records(&model.path).await?;

        for record in records {
            let id = row_id(&record);
            let token = format!("ref-{}", id);
            refs.insert(id, token.clone());

            let mut entry = Attrs::new();
            entry.insert(MODEL_KEY.into(), Value::from(model.path.clone()));
            entry.insert(REF_KEY.into(), Value::from(token));

            for property in &model.properties {
                let Some(value) = record.get(&property.code).filter(|v| !v.is_null()) else {
                    continue;
                };
                let value = if property.reference().is_some() && is_set(value) {
                    let target = value.as_i64().unwrap_or_default();
                    match refs.get(&target) {
                        Some(token) => json!({ REF_KEY: token }),
                        None => return Err(ExportError::UnknownRef(value.to_string()).into()),
                    }
                } else if property.is_file() && is_set(value) {
                    let name = super::cell_text(Some(value));
                    let exported = attachments.export(id, property.id, &name, file_count).await?;
                    file_count += 1;
                    Value::from(exported)
                } else {
                    value.clone()
                };
                entry.insert(property.code.clone(), value);
            }
            entries.push(Value::Object(entry));
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AttachmentError, PipelineError};
    use crate::import::import_document;
    use crate::store::memory::MemoryStore;
    use tempfile::TempDir;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_model(1, None, "d")
            .with_model(1002, None, "crm")
            .with_model(1003, Some(1002), "company")
            .with_property(2001, 1003, "name", 1)
            .with_property(2002, 1003, "parent", 1003)
            .with_rows(
                Resource::Model,
                vec![
                    json!({"id": 1, "code": "d", "name": "Dictionary"}),
                    json!({"id": 1003, "parent": 1002, "code": "company", "name": "Company", "opts": "{\"a\": 1}"}),
                    json!({"id": 1002, "code": "crm", "name": "CRM", "description": ""}),
                    json!({"id": 1004, "code": "internal", "name": "Internal", "schema": 1}),
                ],
            )
            .with_rows(
                Resource::Property,
                vec![
                    json!({"id": 2001, "model": 1003, "code": "name", "name": "Name", "type": 1, "notNull": 0}),
                    json!({"id": 2002, "model": 1003, "code": "parent", "name": "Parent", "type": 1003}),
                ],
            )
            .with_rows(
                Resource::Query,
                vec![
                    json!({"id": 3001, "code": "crm", "name": "CRM"}),
                    json!({"id": 3002, "parent": 3001, "code": "company", "name": "Companies", "query": "{\"data\": \"\nselect\n\"}"}),
                ],
            )
            .with_rows(
                Resource::Column,
                vec![json!({"id": 4001, "query": 3002, "code": "name", "name": "Name", "area": 1})],
            )
    }

    fn no_files() -> FileAttachments {
        FileAttachments::new(None, "/nonexistent".into())
    }

    #[tokio::test]
    async fn test_schema_sections() {
        let mut store = store();
        let doc = build_document(&mut store, &[], &no_files()).await.unwrap();

        assert_eq!(
            doc["createModel"],
            json!([
                {"code": "crm", "name": "CRM"},
                {"parent": "crm", "code": "company", "name": "Company", "opts": {"a": 1}}
            ])
        );
        assert_eq!(
            doc["createProperty"],
            json!([
                {"model": "crm.company", "code": "name", "name": "Name", "type": 1},
                {"model": "crm.company", "code": "parent", "name": "Parent", "type": "crm.company"}
            ])
        );
        assert_eq!(doc["createQuery"][1]["parent"], "crm");
        assert_eq!(doc["createQuery"][1]["query"], json!(["{\"data\": \"", "select", "\"}"]));
        assert_eq!(doc["createColumn"][0]["query"], "crm.company");
        assert!(!doc.contains_key("createRecord"));
    }

    #[tokio::test]
    async fn test_invalid_opts_fails() {
        let mut store = store().with_rows(
            Resource::Model,
            vec![json!({"id": 1005, "code": "bad", "name": "Bad", "opts": "{oops"})],
        );
        let err = build_document(&mut store, &[], &no_files()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Export(ExportError::InvalidOpts { id: 1005, .. })
        ));
    }

    #[tokio::test]
    async fn test_records_with_refs() {
        let mut store = store().with_records(
            "crm.company",
            vec![
                json!({"id": 10, "name": "Acme", "parent": null}),
                json!({"id": 11, "name": "Acme East", "parent": 10}),
            ],
        );
        let doc = build_document(&mut store, &["crm.company".to_string()], &no_files())
            .await
            .unwrap();

        assert_eq!(
            doc["createRecord"],
            json!([
                {"_model": "crm.company", "_ref": "ref-10", "name": "Acme"},
                {"_model": "crm.company", "_ref": "ref-11", "name": "Acme East", "parent": {"_ref": "ref-10"}}
            ])
        );
    }

    #[tokio::test]
    async fn test_reference_to_unexported_record_fails() {
        let mut store = store().with_records(
            "crm.company",
            vec![json!({"id": 11, "name": "Acme East", "parent": 99})],
        );
        let err = build_document(&mut store, &["crm.company".to_string()], &no_files())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown ref: 99");
    }

    #[tokio::test]
    async fn test_file_values_copied_out() {
        let project = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        std::fs::write(project.path().join("10-2003-logo.png"), b"L").unwrap();

        let mut store = store()
            .with_property(2003, 1003, "logo", 5)
            .with_records("crm.company", vec![json!({"id": 10, "name": "Acme", "logo": "logo.png"})]);

        let attachments = FileAttachments::new(None, project.path().to_path_buf());
        let err = build_document(&mut store, &["crm.company".to_string()], &attachments)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Attachment(AttachmentError::MissingDirectory)
        ));

        let attachments = FileAttachments::new(
            Some(target.path().to_path_buf()),
            project.path().to_path_buf(),
        );
        let doc = build_document(&mut store, &["crm.company".to_string()], &attachments)
            .await
            .unwrap();
        assert_eq!(doc["createRecord"][0]["logo"], "1-logo.png");
        assert_eq!(std::fs::read(target.path().join("1-logo.png")).unwrap(), b"L");
    }

    #[tokio::test]
    async fn test_exported_records_import_back() {
        let mut source = store().with_records(
            "crm.company",
            vec![
                json!({"id": 10, "name": "Acme"}),
                json!({"id": 11, "name": "Acme East", "parent": 10}),
            ],
        );
        let mut doc = build_document(&mut source, &["crm.company".to_string()], &no_files())
            .await
            .unwrap();
        for section in ["createModel", "createProperty", "createQuery", "createColumn"] {
            doc.insert(section.into(), json!([]));
        }

        let mut target = store();
        import_document(&mut target, &Value::Object(doc), &no_files())
            .await
            .unwrap();

        let created = target.created(Resource::Record);
        assert_eq!(created.len(), 2);
        assert_eq!(created[1]["parent"], json!(5001));
    }

    #[test]
    fn test_parse_records_option() {
        assert_eq!(
            ExportJsonOptions::parse_records(Some("crm.company, crm.person,")),
            vec!["crm.company", "crm.person"]
        );
        assert!(ExportJsonOptions::parse_records(None).is_empty());
    }
}
