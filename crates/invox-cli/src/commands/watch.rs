//! Watch command - poll the input directory and process new invoices.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::{info, warn};

use invox_core::models::config::InvoxConfig;
use invox_core::{scan_new, SeenLog};

use super::{build_pipeline, load_config, open_store, persist_run, report_run};

/// Arguments for the watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Scan once and exit instead of polling
    #[arg(long)]
    once: bool,
}

pub async fn run(args: WatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    tokio::task::spawn_blocking(move || watch_blocking(args, config)).await?
}

fn watch_blocking(args: WatchArgs, config: InvoxConfig) -> anyhow::Result<()> {
    let intake = &config.intake;
    let mut seen = SeenLog::load(&intake.processed_log);
    let store = open_store(&config)?;
    let pipeline = build_pipeline(&config)?;

    // Files left unrecorded because their run was not stored or the log
    // could not be written. Skipped for the rest of this process so they are
    // retried on the next start.
    let mut skipped: HashSet<String> = HashSet::new();

    println!(
        "{} Watching {} ({} already processed)",
        style("ℹ").blue(),
        intake.input_dir.display(),
        seen.len()
    );

    loop {
        let files = scan_new(&intake.input_dir, &seen)
            .with_context(|| format!("Failed to scan {}", intake.input_dir.display()))?;

        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if skipped.contains(&name) {
                continue;
            }

            let run = pipeline.run(&path);
            report_run(&run);

            let id = match persist_run(&store, &run, &config) {
                Ok(Some(id)) => id,
                Ok(None) => {
                    warn!(file = %run.file_name, "Run not stored, will retry on next start");
                    skipped.insert(run.file_name);
                    continue;
                }
                Err(e) => {
                    eprintln!("{} {:#}", style("✗").red(), e);
                    warn!(file = %run.file_name, "Run not stored, will retry on next start");
                    skipped.insert(run.file_name);
                    continue;
                }
            };

            if let Err(e) = seen.insert(run.file_name.clone()) {
                warn!(
                    file = %run.file_name,
                    error = %e,
                    "Failed to update {}",
                    seen.path().display()
                );
                skipped.insert(run.file_name.clone());
            }
            info!(file = %run.file_name, id, valid = run.validation.valid, "Invoice stored");
            println!(
                "{} {} stored as #{} ({})",
                style("✓").green(),
                run.file_name,
                id,
                if run.validation.valid { "valid" } else { "has issues" }
            );
        }

        if args.once {
            return Ok(());
        }
        std::thread::sleep(Duration::from_secs(intake.poll_secs.max(1)));
    }
}
