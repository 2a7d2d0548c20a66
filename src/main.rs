use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::time::Duration;

use feddash::api::{CachedCatalog, DatasetCatalog, PlatformClient};
use feddash::config::Config;
use feddash::logging;
use feddash::matching::{column_diff, columns_compatible, matching_tasks};
use feddash::wizard::{FieldMap, FileStorage, FormWizard, PersistedFormStore, WizardError};

type CliWizard = FormWizard<FileStorage, PlatformClient>;

#[derive(Parser)]
#[command(name = "feddash")]
#[command(about = "Training-request wizard and dataset tools for the federated learning platform")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Work on the saved training request
    Wizard {
        #[command(subcommand)]
        action: WizardAction,
    },

    /// Inspect datasets and tasks on the platform
    Datasets {
        #[command(subcommand)]
        action: DatasetAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a project config file with the current settings
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum WizardAction {
    /// Show the current step and entered fields
    Show,
    /// Set a field (value is parsed as JSON, otherwise taken as a string)
    Set { field: String, value: String },
    /// Remove a field
    Unset { field: String },
    /// Validate the current step and move forward
    Next {
        /// Steps to skip (repeatable); locks are not saved between runs
        #[arg(short, long = "lock")]
        locked: Vec<usize>,
    },
    /// Move back one step
    Prev {
        /// Steps to skip (repeatable); locks are not saved between runs
        #[arg(short, long = "lock")]
        locked: Vec<usize>,
    },
    /// Start over from a previous session's configuration
    Prefill {
        /// JSON file holding the field mapping
        file: String,
        /// Steps to lock for this invocation (repeatable); pass them again to next/prev
        #[arg(short, long = "lock")]
        locked: Vec<usize>,
    },
    /// Load column and task options for a dataset file
    LoadDataset { filename: String },
    /// Validate everything and create the training session
    Submit,
    /// Discard the saved training request
    Reset,
}

#[derive(Subcommand)]
enum DatasetAction {
    /// List uploaded datasets
    List,
    /// List uploaded files
    Files,
    /// Show column statistics for a file
    Stats { filename: String },
    /// List tasks that fit a dataset
    Tasks {
        dataset_id: String,
        /// Dataset file used to filter tasks by column
        #[arg(long)]
        filename: Option<String>,
    },
    /// Check that a test file has the training file's columns
    Compare { train: String, test: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;
    let _logging_handle = logging::init_logging(&config, cli.debug)?;

    match cli.command {
        Commands::Wizard { action } => cmd_wizard(&config, action).await,
        Commands::Datasets { action } => cmd_datasets(&config, action).await,
        Commands::Config {
            action: ConfigAction::Init { force },
        } => cmd_config_init(&config, force),
    }
}

fn platform_client(config: &Config) -> Result<PlatformClient> {
    PlatformClient::from_config(&config.api).map_err(|e| anyhow!(e.user_message()))
}

fn catalog(config: &Config) -> Result<CachedCatalog<PlatformClient>> {
    Ok(CachedCatalog::new(
        platform_client(config)?,
        Duration::from_secs(config.cache.ttl_secs),
    ))
}

fn open_wizard(config: &Config) -> Result<CliWizard> {
    let storage = FileStorage::new(config.wizard_store_path());
    let store = PersistedFormStore::new(storage, &config.storage.key_prefix);
    Ok(FormWizard::new(store, platform_client(config)?))
}

/// Parse a CLI value as JSON, falling back to a plain string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn wizard_failure(err: WizardError) -> anyhow::Error {
    if let WizardError::InvalidStep { errors, .. } = &err {
        for e in errors {
            eprintln!("  {}", e);
        }
    }
    anyhow!(err.user_message())
}

fn print_wizard(wizard: &CliWizard) {
    println!("Training request");
    println!("{}", "─".repeat(60));
    for step in wizard.steps() {
        let marker = if step.id == wizard.current_step() {
            "▶"
        } else if wizard.is_locked(step.id) {
            "🔒"
        } else {
            " "
        };
        println!("{} {}. {}", marker, step.id + 1, step.label);
    }
    println!();

    if wizard.fields().is_empty() {
        println!("No fields entered yet");
        return;
    }
    for (name, value) in wizard.fields() {
        println!("  {:<22} {}", name, value);
    }
}

async fn cmd_wizard(config: &Config, action: WizardAction) -> Result<()> {
    let mut wizard = open_wizard(config)?;

    match action {
        WizardAction::Show => print_wizard(&wizard),
        WizardAction::Set { field, value } => {
            wizard
                .set_field(&field, parse_value(&value))
                .map_err(wizard_failure)?;
            println!("Set {}", field);
        }
        WizardAction::Unset { field } => {
            match wizard.remove_field(&field).map_err(wizard_failure)? {
                Some(_) => println!("Removed {}", field),
                None => println!("{} was not set", field),
            }
        }
        WizardAction::Next { locked } => {
            wizard.lock_steps(locked);
            let step = wizard.go_next().map_err(wizard_failure)?;
            print_step(&wizard, step);
        }
        WizardAction::Prev { locked } => {
            wizard.lock_steps(locked);
            let step = wizard.go_prev().map_err(wizard_failure)?;
            print_step(&wizard, step);
        }
        WizardAction::Prefill { file, locked } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read prefill file {}", file))?;
            let prefill: FieldMap = serde_json::from_str(&contents)
                .with_context(|| format!("{} is not a JSON object of fields", file))?;
            wizard
                .init_from_prefill(prefill, locked)
                .map_err(wizard_failure)?;
            print_wizard(&wizard);
        }
        WizardAction::LoadDataset { filename } => {
            cmd_load_dataset(config, &mut wizard, &filename).await?;
        }
        WizardAction::Submit => {
            let response = wizard.submit().await.map_err(wizard_failure)?;
            println!("Training session created: {}", response.session_id);
            if let Some(status) = response.status {
                println!("Status: {}", status);
            }
        }
        WizardAction::Reset => {
            wizard.discard().map_err(wizard_failure)?;
            println!("Training request discarded");
        }
    }

    Ok(())
}

fn print_step(wizard: &CliWizard, step: usize) {
    match wizard.steps().get(step) {
        Some(def) => println!("Now on step {}: {}", step + 1, def.label),
        None => println!("Now on step {}", step + 1),
    }
}

async fn cmd_load_dataset(config: &Config, wizard: &mut CliWizard, filename: &str) -> Result<()> {
    let catalog = catalog(config)?;

    let ticket = wizard.begin_fetch(&format!("stats:{}", filename));
    let stats = catalog
        .dataset_stats(filename)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    wizard.apply_dataset_stats(&ticket, &stats);

    let dataset_id = wizard
        .fields()
        .get("dataset_id")
        .and_then(Value::as_str)
        .unwrap_or(filename)
        .to_string();
    let ticket = wizard.begin_fetch(&format!("tasks:{}", dataset_id));
    let tasks = catalog
        .list_tasks(&dataset_id)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    wizard.apply_tasks(&ticket, &tasks);

    let options = wizard.dataset_options();
    println!("Columns: {}", options.columns.join(", "));
    println!("Output candidates: {}", options.output_candidates.join(", "));
    if options.tasks.is_empty() {
        println!("No tasks fit this dataset");
    } else {
        println!("Tasks:");
        for task in &options.tasks {
            println!("  {} ({})", task.id, task.output_columns.join(", "));
        }
    }
    Ok(())
}

async fn cmd_datasets(config: &Config, action: DatasetAction) -> Result<()> {
    let catalog = catalog(config)?;
    let api_err = |e: feddash::api::ApiError| anyhow!(e.user_message());

    match action {
        DatasetAction::List => {
            let datasets = catalog.list_datasets().await.map_err(api_err)?;
            if datasets.is_empty() {
                println!("No datasets uploaded");
                return Ok(());
            }
            println!("Datasets ({})", datasets.len());
            println!("{}", "─".repeat(60));
            for ds in &datasets {
                println!(
                    "{:<16} {:<28} {:>8} rows",
                    ds.id, ds.filename, ds.num_rows
                );
            }
        }
        DatasetAction::Files => {
            let files = catalog.list_uploaded_files().await.map_err(api_err)?;
            if files.is_empty() {
                println!("No files uploaded");
                return Ok(());
            }
            for file in &files {
                println!("{:<36} {:>10} bytes", file.filename, file.size_bytes);
            }
        }
        DatasetAction::Stats { filename } => {
            let stats = catalog.dataset_stats(&filename).await.map_err(api_err)?;
            println!("{} ({} rows)", stats.filename, stats.num_rows);
            println!("{}", "─".repeat(60));
            for column in &stats.columns {
                let detail = stats.column_stats.get(column);
                let dtype = detail
                    .and_then(|d| d.dtype.as_deref())
                    .unwrap_or("unknown");
                let missing = detail.map(|d| d.missing).unwrap_or(0);
                let id_flag = if stats.identifier_columns.contains(column) {
                    " [id]"
                } else {
                    ""
                };
                println!("  {:<24} {:<10} missing={}{}", column, dtype, missing, id_flag);
            }
        }
        DatasetAction::Tasks {
            dataset_id,
            filename,
        } => {
            let tasks = catalog.list_tasks(&dataset_id).await.map_err(api_err)?;
            let shown: Vec<_> = match filename {
                Some(filename) => {
                    let stats = catalog.dataset_stats(&filename).await.map_err(api_err)?;
                    matching_tasks(&stats.columns, &tasks)
                }
                None => tasks.iter().collect(),
            };
            if shown.is_empty() {
                println!("No tasks available");
                return Ok(());
            }
            for task in shown {
                println!("{:<20} {}", task.id, task.output_columns.join(", "));
            }
        }
        DatasetAction::Compare { train, test } => {
            let train_stats = catalog.dataset_stats(&train).await.map_err(api_err)?;
            let test_stats = catalog.dataset_stats(&test).await.map_err(api_err)?;

            if columns_compatible(&train_stats.columns, &test_stats.columns) {
                println!("Columns match");
                return Ok(());
            }

            let diff = column_diff(&train_stats.columns, &test_stats.columns);
            if !diff.missing_from_test.is_empty() {
                println!("  Missing from {}: {}", test, diff.missing_from_test.join(", "));
            }
            if !diff.unexpected_in_test.is_empty() {
                println!("  Only in {}: {}", test, diff.unexpected_in_test.join(", "));
            }
            if diff.reordered {
                println!("  Same columns in a different order");
            }
            bail!("Columns of {} do not match {}", test, train);
        }
    }

    Ok(())
}

fn cmd_config_init(config: &Config, force: bool) -> Result<()> {
    let path = Config::project_config_path();
    if path.exists() && !force {
        println!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
        return Ok(());
    }
    config.save()?;
    println!("Wrote {}", path.display());
    Ok(())
}
