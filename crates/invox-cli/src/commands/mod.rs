//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod list;
pub mod notify;
pub mod process;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use console::style;
use tracing::{debug, info};

use invox_core::models::config::InvoxConfig;
use invox_core::{InvoiceStore, Pipeline, PipelineRun};

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invox")
        .join("config.json")
}

/// Configuration file the command operates on: `--config` if given, else
/// the default location.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

/// Load configuration from `--config`, else the default file if present,
/// else built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<InvoxConfig> {
    if let Some(path) = config_path {
        return InvoxConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to read config file {}", path));
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        return InvoxConfig::from_file(&default_path)
            .with_context(|| format!("Failed to read config file {}", default_path.display()));
    }

    Ok(InvoxConfig::default())
}

/// Build the pipeline. Must run on a blocking thread: the service client
/// owns a blocking HTTP runtime.
pub fn build_pipeline(config: &InvoxConfig) -> anyhow::Result<Arc<Pipeline>> {
    let pipeline = Pipeline::from_config(config).context("Failed to set up pipeline")?;
    if !config.service.enabled {
        info!("Text-generation service disabled, stages will use local fallbacks");
    }
    Ok(Arc::new(pipeline))
}

/// Store a run unless it was produced from placeholder OCR text and
/// `intake.persist_placeholder_runs` is off. Returns the new row id.
pub fn persist_run(
    store: &InvoiceStore,
    run: &PipelineRun,
    config: &InvoxConfig,
) -> anyhow::Result<Option<i64>> {
    if run.used_placeholder() && !config.intake.persist_placeholder_runs {
        eprintln!(
            "{} Not storing {}: OCR was unavailable and the text is a placeholder",
            style("⚠").yellow(),
            run.file_name
        );
        return Ok(None);
    }

    let id = store
        .insert(&run.file_name, &run.record, &run.raw_json)
        .with_context(|| format!("Failed to store {}", run.file_name))?;
    Ok(Some(id))
}

/// Open the configured invoice database.
pub fn open_store(config: &InvoxConfig) -> anyhow::Result<InvoiceStore> {
    InvoiceStore::open(&config.storage.db_path).with_context(|| {
        format!(
            "Failed to open invoice database {}",
            config.storage.db_path.display()
        )
    })
}

/// Print degraded stages and validation issues to stderr.
pub fn report_run(run: &PipelineRun) {
    let degraded = run.degraded_stages();
    if !degraded.is_empty() {
        eprintln!(
            "{} {}: fallback used for {}",
            style("⚠").yellow(),
            run.file_name,
            degraded.join(", ")
        );
    }
    if !run.validation.valid {
        eprintln!("{}", style("Validation issues:").yellow());
        for issue in &run.validation.issues {
            eprintln!("  - {}", issue);
        }
    }
}
