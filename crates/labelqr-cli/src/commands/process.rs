//! Process command - extract label rows from a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use labelqr_core::{DocumentKind, LabelConfig, LabelExtractor};

use super::{format_result, load_config, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Path to the tesseract binary
    #[arg(long)]
    tesseract: Option<PathBuf>,

    /// Path to the pdftoppm binary
    #[arg(long)]
    pdftoppm: Option<PathBuf>,

    /// Write intermediate images to this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

impl ProcessArgs {
    fn apply_overrides(&self, config: &mut LabelConfig) {
        if let Some(tesseract) = &self.tesseract {
            config.ocr.tesseract_path = tesseract.clone();
        }
        if let Some(pdftoppm) = &self.pdftoppm {
            config.pdf.pdftoppm_path = pdftoppm.clone();
        }
        if let Some(dir) = &self.debug_dir {
            config.debug.dump_images = true;
            config.debug.dump_dir = dir.clone();
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.apply_overrides(&mut config);

    let extractor = LabelExtractor::from_config(config)?;
    info!("Processing file: {}", args.input.display());

    let result = if DocumentKind::from_path(&args.input) == Some(DocumentKind::Pdf) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} page {pos}/{len}")
                .unwrap()
                .progress_chars("##-"),
        );

        let mut on_page = |done: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        };
        let result = extractor.process_document(&args.input, Some(&mut on_page));
        pb.finish_and_clear();
        result
    } else {
        extractor.process_document(&args.input, None)
    };

    if !result.has_data() {
        eprintln!(
            "{} No QR code or BOX QTY data could be extracted.",
            style("⚠").yellow()
        );
        return Ok(());
    }

    let output = format_result(&result, &args.input, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} {} rows written to {}",
            style("✓").green(),
            result.len(),
            output_path.display()
        );
    } else {
        print!("{}", output);
        if matches!(args.format, OutputFormat::Json) {
            println!();
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
