//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod check;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use labelqr_core::{LabelConfig, ResultSet};

/// Default location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("labelqr")
        .join("config.json")
}

/// Load the explicit config file, else the user config if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<LabelConfig> {
    if let Some(path) = config_path {
        return Ok(LabelConfig::from_file(Path::new(path))?);
    }

    let user_config = default_config_path();
    if user_config.exists() {
        debug!("Using config from {}", user_config.display());
        Ok(LabelConfig::from_file(&user_config)?)
    } else {
        Ok(LabelConfig::default())
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Header-less CSV, one label row per line
    Csv,
    /// JSON report with source and timestamp
    Json,
}

/// JSON form of one processed document.
#[derive(Serialize)]
struct Report<'a> {
    source: String,
    processed_at: DateTime<Local>,
    rows: &'a ResultSet,
}

/// Rows as CSV. Rows differ in length, so the writer is flexible.
pub fn format_csv(result: &ResultSet) -> anyhow::Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_writer(vec![]);

    for row in result.iter() {
        wtr.write_record(row.fields())?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

pub fn format_result(result: &ResultSet, source: &Path, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Json => {
            let report = Report {
                source: source.display().to_string(),
                processed_at: Local::now(),
                rows: result,
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}
