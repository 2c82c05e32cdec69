//! Single-object administration commands.
//!
//! Each command runs in its own transaction and returns the attributes the
//! store answered with:
//!
//! - [`create_object`] / [`update_model`] - one schema object or record
//! - [`create_dictionary`] - a `d.*` model with name/code/order properties
//! - [`create_table`] - a `t.*` model pointing back at its owner

use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;

use crate::error::{ConfigError, ConfigResult, ImportError, ImportResult, PipelineResult};
use crate::logs::{log_info, log_success};
use crate::models::{name_from_code, Model, Resource, DICTIONARY_ROOT, TABLE_ROOT};
use crate::store::{created_id, finish_transaction, Attrs, ModelKey, Store};
use crate::validation::validate_named_object;

/// Parse command-line attributes.
///
/// Single quotes are accepted in place of double quotes so that shells can
/// pass `{'name': 'Item'}` unescaped.
pub fn parse_attrs(text: &str) -> ImportResult<Attrs> {
    match serde_json::from_str(&text.replace('\'', "\""))? {
        Value::Object(attrs) => Ok(attrs),
        _ => Err(ImportError::InvalidDocument(vec![
            "attributes must be a JSON object".to_string(),
        ])),
    }
}

/// Create one object of `rsc` in its own transaction.
pub async fn create_object<S: Store + ?Sized>(store: &mut S, rsc: Resource, attrs: Attrs) -> PipelineResult<Attrs> {
    store.start_transaction(&format!("Create {}", rsc)).await?;
    let result = store.create(rsc, attrs).await;
    let created = finish_transaction(store, result).await?;

    log_success(format!("{} created: {}", rsc, created_id(&created)?));
    Ok(created)
}

/// Update a model given by `attrs.id` (id or path).
pub async fn update_model<S: Store + ?Sized>(store: &mut S, attrs: Attrs) -> PipelineResult<Attrs> {
    store.start_transaction("Update model").await?;
    let result = store.update_model(attrs).await;
    Ok(finish_transaction(store, result).await?)
}

/// Options of `create-dictionary`.
#[derive(Debug, Clone)]
pub struct DictionaryOptions {
    pub attrs: Attrs,
    /// Folder model path under `d`
    pub model: Option<String>,
}

impl DictionaryOptions {
    pub fn new(attrs: Attrs, model: Option<String>) -> Self {
        Self {
            attrs,
            model: model.filter(|m| !m.trim().is_empty()),
        }
    }
}

/// Options of `create-table`.
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub attrs: Attrs,
    /// Owning model path
    pub model: String,
}

impl TableOptions {
    /// `--model` is required.
    pub fn new(attrs: Attrs, model: Option<String>) -> ConfigResult<Self> {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .ok_or(ConfigError::MissingOption("model <model>"))?;
        Ok(Self { attrs, model })
    }
}

fn check_named(attrs: &Attrs) -> ImportResult<()> {
    validate_named_object(&Value::Object(attrs.clone()))
        .map_err(|_| ImportError::MissingAttrs("name or code"))
}

/// Create a dictionary model and its `name`, `code` and `order` properties.
///
/// With `model` (`crm.sales`), the dictionary goes under `d.crm.sales` and
/// any missing folder model on the way is created. Otherwise it goes under
/// `attrs.parent`, or `d`.
pub async fn create_dictionary<S: Store + ?Sized>(store: &mut S, options: &DictionaryOptions) -> PipelineResult<Attrs> {
    check_named(&options.attrs)?;
    let model = options.model.as_deref();
    if let Some(model) = model {
        store.get_model(&ModelKey::parse(model))?;
    }

    store.start_transaction("Create dictionary").await?;
    let result = build_dictionary(store, &options.attrs, model).await;
    let created = finish_transaction(store, result).await?;

    log_success(format!("Dictionary created: {}", created_id(&created)?));
    Ok(created)
}

async fn build_dictionary<S: Store + ?Sized>(
    store: &mut S,
    attrs: &Attrs,
    model: Option<&str>,
) -> PipelineResult<Attrs> {
    let parent = match model {
        Some(model) => ensure_path(store, DICTIONARY_ROOT.to_string(), &segments(model)).await?.path,
        None => attrs
            .get("parent")
            .and_then(Value::as_str)
            .unwrap_or(DICTIONARY_ROOT)
            .to_string(),
    };

    let created = store
        .create_model(object(json!({
            "name": attr(attrs, "name"),
            "code": attr(attrs, "code"),
            "parent": parent,
        })))
        .await?;
    let path = created_path(store, &created, &parent, attrs)?;

    for (name, code, type_code, order) in [
        ("Name", "name", "string", 1),
        ("Code", "code", "string", 2),
        ("Order", "order", "number", 3),
    ] {
        store
            .create_property(object(json!({
                "model": path,
                "name": name,
                "code": code,
                "type": type_code,
                "order": order,
            })))
            .await?;
    }
    Ok(created)
}

/// Create a table model under `t.{model}` with a property pointing back at
/// the owning model.
pub async fn create_table<S: Store + ?Sized>(store: &mut S, options: &TableOptions) -> PipelineResult<Attrs> {
    check_named(&options.attrs)?;
    let owner = store.get_model(&ModelKey::parse(&options.model))?.clone();

    store.start_transaction("Create table").await?;
    let result = build_table(store, &options.attrs, &options.model, &owner).await;
    let created = finish_transaction(store, result).await?;

    log_success(format!("Table created: {}", created_id(&created)?));
    Ok(created)
}

async fn build_table<S: Store + ?Sized>(
    store: &mut S,
    attrs: &Attrs,
    model: &str,
    owner: &Model,
) -> PipelineResult<Attrs> {
    let parent = ensure_path(store, TABLE_ROOT.to_string(), &segments(model)).await?.path;

    let created = store
        .create_model(object(json!({
            "name": attr(attrs, "name"),
            "code": attr(attrs, "code"),
            "parent": parent,
        })))
        .await?;
    let path = created_path(store, &created, &parent, attrs)?;

    store
        .create_property(object(json!({
            "model": path,
            "name": owner.name,
            "code": owner.code,
            "type": owner.path,
        })))
        .await?;
    Ok(created)
}

fn segments(model: &str) -> Vec<String> {
    model
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Path of a model created through the session.
fn created_path<S: Store + ?Sized>(store: &S, created: &Attrs, parent: &str, attrs: &Attrs) -> PipelineResult<String> {
    let id = created_id(created)?;
    Ok(match store.find_model(&ModelKey::Id(id)) {
        Some(model) => model.path.clone(),
        None => format!("{}.{}", parent, attr(attrs, "code").as_str().unwrap_or_default()),
    })
}

fn attr(attrs: &Attrs, key: &str) -> Value {
    attrs.get(key).cloned().unwrap_or(Value::Null)
}

fn object(value: Value) -> Attrs {
    match value {
        Value::Object(attrs) => attrs,
        _ => Attrs::new(),
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Walk `root.seg1.seg2...`, creating each missing model with a name
/// derived from its code, and return the last one.
///
/// Existing models are reused, so a second call creates nothing.
pub fn ensure_path<'a, S: Store + ?Sized>(
    store: &'a mut S,
    parent: String,
    segments: &'a [String],
) -> BoxFuture<'a, PipelineResult<Model>> {
    Box::pin(async move {
        let Some((code, rest)) = segments.split_first() else {
            return Ok(store.get_model(&ModelKey::Path(parent))?.clone());
        };

        let path = format!("{}.{}", parent, code);
        if store.find_model(&ModelKey::Path(path.clone())).is_none() {
            log_info(format!("Creating {}", path));
            store
                .create_model(object(json!({
                    "name": name_from_code(code),
                    "code": code,
                    "parent": parent,
                })))
                .await?;
        }
        ensure_path(store, path, rest).await
    })
}
