//! CSV export of one model.
//!
//! The header is the model's property codes in property order. Records are
//! read in pages; dictionary ids are written as entry names so the file can
//! be imported back with `import-csv`.

use std::path::PathBuf;

use super::cell_text;
use crate::error::{ConfigError, ConfigResult, PipelineResult};
use crate::import::DictionaryResolver;
use crate::logs::{log_info, log_success};
use crate::parser::DEFAULT_DELIMITER;
use crate::store::{Attrs, ModelKey, Store};

/// Records requested per `getData` call.
pub const PAGE_SIZE: usize = 1000;

/// Options of `export-csv`.
#[derive(Debug, Clone)]
pub struct ExportCsvOptions {
    pub file: PathBuf,
    pub model: String,
    pub delimiter: u8,
}

impl ExportCsvOptions {
    pub fn new(file: PathBuf, model: Option<String>) -> ConfigResult<Self> {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .ok_or(ConfigError::MissingOption("model <model>"))?;
        Ok(Self {
            file,
            model,
            delimiter: DEFAULT_DELIMITER,
        })
    }
}

/// Write all records of the model to the target file.
///
/// Returns the number of records written.
pub async fn export_csv<S: Store + ?Sized>(store: &mut S, options: &ExportCsvOptions) -> PipelineResult<usize> {
    let (content, count) = render_csv(store, &options.model, options.delimiter).await?;
    tokio::fs::write(&options.file, content).await?;

    log_success(format!("{} records written to {}", count, options.file.display()));
    Ok(count)
}

/// Render the CSV text of a model's records.
pub async fn render_csv<S: Store + ?Sized>(
    store: &mut S,
    model: &str,
    delimiter: u8,
) -> PipelineResult<(String, usize)> {
    let model = store.get_model(&ModelKey::parse(model))?.clone();
    let dictionaries = DictionaryResolver::load(store, &model, None).await?;
    let records = fetch_all(store, &model.path).await?;
    log_info(format!("{}: {} records", model.path, records.len()));

    let mut writer = ::csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(::csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(model.properties.iter().map(|p| p.code.as_str()))?;

    for record in &records {
        let row = model.properties.iter().map(|p| {
            let value = record.get(&p.code);
            if dictionaries.is_dictionary(&p.code) {
                value
                    .and_then(|v| v.as_i64())
                    .and_then(|id| dictionaries.name_of(&p.code, id))
                    .unwrap_or_default()
                    .to_string()
            } else {
                cell_text(value)
            }
        });
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok((String::from_utf8_lossy(&bytes).into_owned(), records.len()))
}

async fn fetch_all<S: Store + ?Sized>(store: &mut S, model: &str) -> PipelineResult<Vec<Attrs>> {
    let mut records = Vec::new();
    loop {
        let page = store.get_data(model, records.len(), PAGE_SIZE).await?;
        let last = page.len() < PAGE_SIZE;
        records.extend(page);
        if last {
            break;
        }
    }
    Ok(records)
}
