//! Batch processing command for multiple invoice images.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use invox_core::intake::is_image;
use invox_core::models::config::InvoxConfig;
use invox_core::PipelineRun;

use super::process::{format_run, OutputFormat};
use super::{build_pipeline, load_config, open_store, persist_run};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching input images
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Store every result in the invoice database
    #[arg(long)]
    persist: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && is_image(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    tokio::task::spawn_blocking(move || batch_blocking(args, files, config)).await?
}

fn batch_blocking(args: BatchArgs, files: Vec<PathBuf>, config: InvoxConfig) -> anyhow::Result<()> {
    let start = Instant::now();

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let store = if args.persist {
        Some(open_store(&config)?)
    } else {
        None
    };

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let pipeline = build_pipeline(&config)?;
    let mut runs = Vec::with_capacity(files.len());
    let mut stored = 0usize;

    for path in &files {
        let run = pipeline.run(path);

        if let Some(output_dir) = &args.output_dir {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("invoice");
            let output_path = output_dir.join(format!("{}.{}", stem, args.format.extension()));
            fs::write(&output_path, format_run(&run, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }

        if let Some(store) = &store {
            if persist_run(store, &run, &config)?.is_some() {
                stored += 1;
            }
        }

        if !run.validation.valid {
            warn!(file = %run.file_name, issues = ?run.validation.issues, "Invoice failed validation");
        }

        runs.push(run);
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &runs)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let valid = runs.iter().filter(|r| r.validation.valid).count();
    let degraded = runs.iter().filter(|r| !r.degraded_stages().is_empty()).count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        runs.len(),
        start.elapsed()
    );
    println!(
        "   {} valid, {} with issues, {} used fallbacks",
        style(valid).green(),
        style(runs.len() - valid).red(),
        style(degraded).yellow()
    );
    if args.persist {
        println!("   {} stored", stored);
    }

    let invalid: Vec<_> = runs.iter().filter(|r| !r.validation.valid).collect();
    if !invalid.is_empty() {
        println!();
        println!("{}", style("Files with issues:").red());
        for run in invalid {
            println!("  - {}: {}", run.file_name, run.validation.issues.join("; "));
        }
    }

    Ok(())
}

fn write_summary(path: &Path, runs: &[PipelineRun]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "valid",
        "vendor",
        "number",
        "date",
        "total",
        "currency",
        "fallbacks",
        "issues",
        "processing_time_ms",
    ])?;

    for run in runs {
        let record = &run.record;
        wtr.write_record([
            run.file_name.clone(),
            run.validation.valid.to_string(),
            record.vendor.clone().unwrap_or_default(),
            record.number.clone().unwrap_or_default(),
            record.date.clone().unwrap_or_default(),
            record.total.map(|t| t.to_string()).unwrap_or_default(),
            record.currency.clone().unwrap_or_default(),
            run.degraded_stages().join("|"),
            run.validation.issues.join("; "),
            run.processing_time_ms.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
