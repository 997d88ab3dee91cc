//! Batch processing command for multiple label documents.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use labelqr_core::{DocumentKind, LabelExtractor, ResultSet};

use super::{format_csv, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory (default: next to each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write every row of every document into one CSV
    #[arg(long)]
    combined: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,
}

/// Outcome of one document.
struct ProcessResult {
    path: PathBuf,
    result: ResultSet,
    processing_time_ms: u64,
}

impl ProcessResult {
    fn status(&self) -> &'static str {
        if self.result.is_error() {
            "error"
        } else if self.result.has_data() {
            "success"
        } else {
            "empty"
        }
    }

    fn error(&self) -> &str {
        if self.result.is_error() {
            &self.result.rows[0].fields()[0]
        } else {
            ""
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| DocumentKind::from_path(p).is_some())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let multi_progress = MultiProgress::new();
    let overall_pb = multi_progress.add(ProgressBar::new(files.len() as u64));
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let extractor = Arc::new(LabelExtractor::from_config(config)?);
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let extractor = Arc::clone(&extractor);
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let overall_pb = overall_pb.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let file_start = Instant::now();
            let result = extractor.process_document(&path, None);
            drop(permit);

            overall_pb.inc(1);
            ProcessResult {
                path,
                result,
                processing_time_ms: file_start.elapsed().as_millis() as u64,
            }
        }));
    }

    // Awaited in submission order so outputs follow input order.
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await?);
    }

    overall_pb.finish_with_message("Complete");

    let paths: Vec<&Path> = results.iter().map(|r| r.path.as_path()).collect();
    let output_paths = output_paths(&paths, args.output_dir.as_deref());

    for (result, output_path) in results.iter().zip(&output_paths) {
        if !result.result.has_data() {
            warn!("No data extracted from {}", result.path.display());
            continue;
        }

        fs::write(output_path, format_csv(&result.result)?)?;
        debug!("Wrote output to {}", output_path.display());
    }

    if let Some(combined_path) = &args.combined {
        let mut combined = ResultSet::new();
        for result in &results {
            combined.extend(result.result.iter().cloned());
        }
        fs::write(combined_path, format_csv(&combined)?)?;
        println!(
            "{} Combined {} rows into {}",
            style("✓").green(),
            combined.len(),
            combined_path.display()
        );
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.status() == "error").collect();
    let empty = results.iter().filter(|r| r.status() == "empty").count();

    println!();
    println!(
        "{} Processed {} files in {:?} (finished {})",
        style("✓").green(),
        results.len(),
        start.elapsed(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "   {} successful, {} empty, {} failed",
        style(results.len() - failed.len() - empty).green(),
        style(empty).yellow(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!("  - {}: {}", result.path.display(), result.error());
        }
    }

    Ok(())
}

fn output_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("labels");
            dir.join(format!("{}.csv", stem))
        }
        None => input.with_extension("csv"),
    }
}

/// One CSV path per input; a clashing name gets the input extension,
/// then a counter, appended.
fn output_paths(inputs: &[&Path], output_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut taken = HashSet::new();

    inputs
        .iter()
        .map(|input| {
            let preferred = output_path_for(input, output_dir);
            if taken.insert(preferred.clone()) {
                return preferred;
            }

            let extension = input.extension().and_then(|e| e.to_str()).unwrap_or("");
            let base = preferred.with_extension("");
            let mut candidate = PathBuf::from(format!("{}_{}.csv", base.display(), extension));
            let mut counter = 2;
            while !taken.insert(candidate.clone()) {
                candidate = PathBuf::from(format!("{}_{}_{}.csv", base.display(), extension, counter));
                counter += 1;
            }

            warn!(
                "{} would overwrite {}; writing {} instead",
                input.display(),
                preferred.display(),
                candidate.display()
            );
            candidate
        })
        .collect()
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["filename", "status", "rows", "processing_time_ms", "error"])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let rows = if result.result.is_error() {
            0
        } else {
            result.result.len()
        };

        wtr.write_record([
            filename,
            result.status(),
            &rows.to_string(),
            &result.processing_time_ms.to_string(),
            result.error(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
