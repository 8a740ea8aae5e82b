//! Process command - run the pipeline on a single invoice image.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use invox_core::intake::is_image;
use invox_core::models::config::InvoxConfig;
use invox_core::{Notifier, PipelineRun, SmtpNotifier};

use super::{build_pipeline, load_config, open_store, persist_run, report_run};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input image (png, jpg, jpeg)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Store the result in the invoice database
    #[arg(long)]
    persist: bool,

    /// Email this address once the invoice is processed
    #[arg(long, value_name = "ADDR")]
    notify: Option<String>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Full pipeline run as JSON
    Json,
    /// Record as a CSV row
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !is_image(&args.input) {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    }

    tokio::task::spawn_blocking(move || process_blocking(args, config)).await?
}

fn process_blocking(args: ProcessArgs, config: InvoxConfig) -> anyhow::Result<()> {
    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Processing {}", args.input.display()));

    let pipeline = build_pipeline(&config)?;
    let run = pipeline.run(&args.input);

    pb.finish_and_clear();
    report_run(&run);

    let output = format_run(&run, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.persist {
        let store = open_store(&config)?;
        if let Some(id) = persist_run(&store, &run, &config)? {
            eprintln!("{} Stored as invoice #{}", style("✓").green(), id);
        }
    }

    if let Some(recipient) = &args.notify {
        let sent = SmtpNotifier::from_config(&config.notify).and_then(|notifier| {
            notifier.send(
                &config.notify.sender,
                recipient,
                &config.notify.subject,
                &config.notify.body,
            )
        });
        match sent {
            Ok(()) => eprintln!("{} Notification sent to {}", style("✓").green(), recipient),
            Err(e) => {
                warn!(error = %e, "Notification failed");
                eprintln!("{} Notification failed: {}", style("✗").red(), e);
            }
        }
    }

    Ok(())
}

pub fn format_run(run: &PipelineRun, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(run)?),
        OutputFormat::Csv => format_csv(run),
        OutputFormat::Text => Ok(format_text(run)),
    }
}

fn format_csv(run: &PipelineRun) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let record = &run.record;

    wtr.write_record([
        "file_name", "vendor", "number", "date", "total", "currency", "line_items", "valid",
    ])?;
    wtr.write_record([
        run.file_name.clone(),
        record.vendor.clone().unwrap_or_default(),
        record.number.clone().unwrap_or_default(),
        record.date.clone().unwrap_or_default(),
        record.total.map(|t| t.to_string()).unwrap_or_default(),
        record.currency.clone().unwrap_or_default(),
        record.line_items.len().to_string(),
        run.validation.valid.to_string(),
    ])?;

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(run: &PipelineRun) -> String {
    let record = &run.record;
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    let mut output = String::new();
    output.push_str(&format!("File: {}\n", run.file_name));
    output.push_str(&format!("Vendor: {}\n", show(&record.vendor)));
    output.push_str(&format!("Invoice: {}\n", show(&record.number)));
    output.push_str(&format!("Date: {}\n", show(&record.date)));
    match record.total {
        Some(total) => output.push_str(&format!(
            "Total: {:.2} {}\n",
            total,
            record.currency.as_deref().unwrap_or("")
        )),
        None => output.push_str("Total: -\n"),
    }

    if !record.line_items.is_empty() {
        output.push_str("\nLine items:\n");
        for item in &record.line_items {
            output.push_str(&format!(
                "  {} x{} @ {} = {}\n",
                item.description.as_deref().unwrap_or("?"),
                item.quantity.map(|q| q.to_string()).unwrap_or_else(|| "?".to_string()),
                item.unit_price.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "?".to_string()),
                item.amount.map(|a| format!("{:.2}", a)).unwrap_or_else(|| "?".to_string()),
            ));
        }
    }

    output.push_str(&format!(
        "\nValid: {}\n",
        if run.validation.valid { "yes" } else { "no" }
    ));
    for issue in &run.validation.issues {
        output.push_str(&format!("  - {}\n", issue));
    }

    output
}
