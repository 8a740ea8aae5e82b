//! CLI application for scanned invoice processing.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, list, notify, process, watch};

/// Invoice OCR - turn scanned invoices into validated, structured records
#[derive(Parser)]
#[command(name = "invox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single invoice image
    Process(process::ProcessArgs),

    /// Process multiple invoice images
    Batch(batch::BatchArgs),

    /// Poll the input directory and process new invoices
    Watch(watch::WatchArgs),

    /// List stored invoices
    List(list::ListArgs),

    /// Send a notification email
    Notify(notify::NotifyArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // API keys and SMTP passwords may live in a .env file
    let dotenv = dotenvy::dotenv();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => process::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Watch(args) => watch::run(args, config_path).await,
        Commands::List(args) => list::run(args, config_path).await,
        Commands::Notify(args) => notify::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
