//! Check command - report whether the external tools can be run.

use console::style;

use labelqr_core::{PopplerRasterizer, TesseractRecognizer};

use super::load_config;

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    println!("{}", style("Tool Status").bold());
    println!();

    let tesseract = TesseractRecognizer::new(&config.ocr).version();
    let pdftoppm = PopplerRasterizer::from_config(&config.pdf).version();

    let mut missing = 0;

    match tesseract {
        Ok(version) => println!(
            "  {} tesseract ({}): {}",
            style("✓").green(),
            config.ocr.tesseract_path.display(),
            version
        ),
        Err(e) => {
            missing += 1;
            println!("  {} tesseract: {}", style("✗").red(), e);
        }
    }

    match pdftoppm {
        Ok(version) => println!(
            "  {} pdftoppm ({}): {}",
            style("✓").green(),
            config.pdf.pdftoppm_path.display(),
            version
        ),
        Err(e) => {
            missing += 1;
            println!("  {} pdftoppm: {}", style("✗").red(), e);
        }
    }

    println!();
    if missing == 0 {
        println!("{} All tools available.", style("✓").green());
    } else {
        println!(
            "{} {} tool(s) unavailable. Images need tesseract; PDFs need both.",
            style("⚠").yellow(),
            missing
        );
    }

    Ok(())
}
