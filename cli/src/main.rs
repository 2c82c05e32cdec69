//! objectum CLI - administration client for objectum projects
//!
//! Run from the project directory (or a direct child of it); the project's
//! `config.json` supplies the service address, project code and admin
//! password.
//!
//! # Schema Commands
//!
//! ```bash
//! objectum create-model '{"name": "Item", "code": "item"}'
//! objectum create-property '{"model": "item", "name": "Name", "code": "name", "type": 1}'
//! objectum create-dictionary '{"name": "Status", "code": "status"}' --model crm
//! objectum create-table '{"name": "Lines", "code": "lines"}' --model crm.order
//! ```
//!
//! # Data Commands
//!
//! ```bash
//! objectum import-csv people.csv --model crm.person --file-directory photos
//! objectum export-csv people.csv --model crm.person
//! objectum import-json schema.json
//! objectum export-json schema.json --records crm.company,crm.person
//! ```

use clap::{Parser, Subcommand};
use objectum_cli::{
    admin, export_csv, export_json, import_csv, import_json, Attrs, ExportCsvOptions,
    ExportJsonOptions, HttpStore, ImportCsvOptions, ImportJsonOptions, ImportSummary,
    ProjectConfig, Resource,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "objectum")]
#[command(about = "Administration client for objectum projects", long_about = None, version)]
struct Cli {
    /// Project config.json (default: ./config.json, then ../config.json)
    #[arg(long, global = true, env = "OBJECTUM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a model
    CreateModel {
        /// Model attributes as JSON
        attrs: String,
    },

    /// Update a model; `id` is the model id or path
    UpdateModel {
        /// Model attributes as JSON
        attrs: String,
    },

    /// Create a property
    CreateProperty {
        /// Property attributes as JSON
        attrs: String,
    },

    /// Create a query
    CreateQuery {
        /// Query attributes as JSON
        attrs: String,
    },

    /// Create a column
    CreateColumn {
        /// Column attributes as JSON
        attrs: String,
    },

    /// Create a record; `_model` is the model id or path
    CreateRecord {
        /// Record attributes as JSON
        attrs: String,
    },

    /// Create a dictionary with name, code and order properties
    CreateDictionary {
        /// Dictionary attributes as JSON (name, code)
        attrs: String,

        /// Place the dictionary under d.<model>
        #[arg(long)]
        model: Option<String>,
    },

    /// Create a table model under t.<model>
    CreateTable {
        /// Table attributes as JSON (name, code)
        attrs: String,

        /// Owning model
        #[arg(long)]
        model: Option<String>,
    },

    /// Import CSV rows as records of one model
    ImportCsv {
        /// Input CSV file
        file: PathBuf,

        /// Target model
        #[arg(long)]
        model: Option<String>,

        /// Directory holding files named by file properties
        #[arg(long)]
        file_directory: Option<PathBuf>,
    },

    /// Export all records of one model to CSV
    ExportCsv {
        /// Output CSV file
        file: PathBuf,

        /// Source model
        #[arg(long)]
        model: Option<String>,
    },

    /// Import a JSON document (schema and records)
    ImportJson {
        /// Input JSON file
        file: PathBuf,

        /// Directory holding files named by file properties
        #[arg(long)]
        file_directory: Option<PathBuf>,
    },

    /// Export the user schema, and optionally records, to JSON
    ExportJson {
        /// Output JSON file
        file: PathBuf,

        /// Comma separated models whose records are exported too
        #[arg(long)]
        records: Option<String>,

        /// Directory receiving attachment files of exported records
        #[arg(long)]
        file_directory: Option<PathBuf>,
    },
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::CreateModel { attrs } => cmd_create(config, Resource::Model, &attrs).await,
        Commands::UpdateModel { attrs } => cmd_update_model(config, &attrs).await,
        Commands::CreateProperty { attrs } => cmd_create(config, Resource::Property, &attrs).await,
        Commands::CreateQuery { attrs } => cmd_create(config, Resource::Query, &attrs).await,
        Commands::CreateColumn { attrs } => cmd_create(config, Resource::Column, &attrs).await,
        Commands::CreateRecord { attrs } => cmd_create(config, Resource::Record, &attrs).await,

        Commands::CreateDictionary { attrs, model } => {
            cmd_create_dictionary(config, &attrs, model).await
        }

        Commands::CreateTable { attrs, model } => {
            cmd_create_table(config, &attrs, model).await
        }

        Commands::ImportCsv {
            file,
            model,
            file_directory,
        } => cmd_import_csv(config, file, model, file_directory).await,

        Commands::ExportCsv { file, model } => cmd_export_csv(config, file, model).await,

        Commands::ImportJson {
            file,
            file_directory,
        } => cmd_import_json(config, file, file_directory).await,

        Commands::ExportJson {
            file,
            records,
            file_directory,
        } => cmd_export_json(config, file, records.as_deref(), file_directory).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn connect(config: Option<&Path>) -> Result<(ProjectConfig, HttpStore), Box<dyn std::error::Error>> {
    let config = ProjectConfig::resolve(config)?;
    let store = HttpStore::connect(&config).await?;
    Ok((config, store))
}

fn print_result(attrs: &Attrs) -> CmdResult {
    println!("result: {}", serde_json::to_string_pretty(attrs)?);
    Ok(())
}

fn print_summary(summary: &ImportSummary) {
    for (command, count) in &summary.created {
        eprintln!("   {}: {}", command, count);
    }
    if summary.attachments > 0 {
        eprintln!("   files: {}", summary.attachments);
    }
    println!("ok");
}

async fn cmd_create(config: Option<&Path>, rsc: Resource, attrs: &str) -> CmdResult {
    let attrs = admin::parse_attrs(attrs)?;
    let (_, mut store) = connect(config).await?;

    let created = admin::create_object(&mut store, rsc, attrs).await?;
    print_result(&created)
}

async fn cmd_update_model(config: Option<&Path>, attrs: &str) -> CmdResult {
    let attrs = admin::parse_attrs(attrs)?;
    let (_, mut store) = connect(config).await?;

    let updated = admin::update_model(&mut store, attrs).await?;
    print_result(&updated)
}

async fn cmd_create_dictionary(config: Option<&Path>, attrs: &str, model: Option<String>) -> CmdResult {
    let options = admin::DictionaryOptions::new(admin::parse_attrs(attrs)?, model);
    let (_, mut store) = connect(config).await?;

    let created = admin::create_dictionary(&mut store, &options).await?;
    print_result(&created)
}

async fn cmd_create_table(config: Option<&Path>, attrs: &str, model: Option<String>) -> CmdResult {
    let options = admin::TableOptions::new(admin::parse_attrs(attrs)?, model)?;
    let (_, mut store) = connect(config).await?;

    let created = admin::create_table(&mut store, &options).await?;
    print_result(&created)
}

async fn cmd_import_csv(
    config: Option<&Path>,
    file: PathBuf,
    model: Option<String>,
    file_directory: Option<PathBuf>,
) -> CmdResult {
    let options = ImportCsvOptions::new(file, model, file_directory)?;
    let (config, mut store) = connect(config).await?;

    let summary = import_csv(&mut store, &options, config.files_dir()).await?;
    print_summary(&summary);
    Ok(())
}

async fn cmd_export_csv(config: Option<&Path>, file: PathBuf, model: Option<String>) -> CmdResult {
    let options = ExportCsvOptions::new(file, model)?;
    let (_, mut store) = connect(config).await?;

    export_csv(&mut store, &options).await?;
    println!("ok");
    Ok(())
}

async fn cmd_import_json(config: Option<&Path>, file: PathBuf, file_directory: Option<PathBuf>) -> CmdResult {
    let options = ImportJsonOptions {
        file,
        file_directory,
    };
    let (config, mut store) = connect(config).await?;

    let summary = import_json(&mut store, &options, config.files_dir()).await?;
    print_summary(&summary);
    Ok(())
}

async fn cmd_export_json(
    config: Option<&Path>,
    file: PathBuf,
    records: Option<&str>,
    file_directory: Option<PathBuf>,
) -> CmdResult {
    let options = ExportJsonOptions {
        file,
        records: ExportJsonOptions::parse_records(records),
        file_directory,
    };
    let (config, mut store) = connect(config).await?;

    export_json(&mut store, &options, config.files_dir()).await?;
    println!("ok");
    Ok(())
}
