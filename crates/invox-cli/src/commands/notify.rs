//! Notify command - send a processing notification email.

use clap::Args;
use console::style;

use invox_core::{Notifier, SmtpNotifier};

use super::load_config;

/// Arguments for the notify command.
#[derive(Args)]
pub struct NotifyArgs {
    /// Recipient address
    recipient: String,

    /// Sender address (default: notify.sender from config)
    #[arg(long)]
    sender: Option<String>,

    /// Subject line (default: notify.subject from config)
    #[arg(long)]
    subject: Option<String>,

    /// Message body (default: notify.body from config)
    #[arg(long)]
    body: Option<String>,
}

pub async fn run(args: NotifyArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?.notify;

    let sender = args.sender.unwrap_or_else(|| config.sender.clone());
    if sender.trim().is_empty() {
        anyhow::bail!("No sender configured. Set notify.sender or pass --sender.");
    }
    let subject = args.subject.unwrap_or_else(|| config.subject.clone());
    let body = args.body.unwrap_or_else(|| config.body.clone());
    let recipient = args.recipient;

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let notifier = SmtpNotifier::from_config(&config)?;
        notifier.send(&sender, &recipient, &subject, &body)?;
        println!("{} Notification sent to {}", style("✓").green(), recipient);
        Ok(())
    })
    .await?
}
