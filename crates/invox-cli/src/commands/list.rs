//! List command - show stored invoices.

use clap::Args;
use console::style;

use super::{load_config, open_store};

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Maximum number of invoices to show
    #[arg(short, long, default_value = "20")]
    limit: usize,

    /// Print rows as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ListArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let rows = store.list(args.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("{} No invoices stored yet.", style("ℹ").blue());
        return Ok(());
    }

    println!(
        "{:>5}  {:<19}  {:<24}  {:<24}  {:<12}  {:<10}  {:>12}",
        "ID", "CREATED", "FILE", "VENDOR", "NUMBER", "DATE", "TOTAL"
    );
    for row in &rows {
        let total = match (row.total, row.currency.as_deref()) {
            (Some(total), Some(currency)) => format!("{:.2} {}", total, currency),
            (Some(total), None) => format!("{:.2}", total),
            (None, _) => "-".to_string(),
        };
        println!(
            "{:>5}  {:<19}  {:<24}  {:<24}  {:<12}  {:<10}  {:>12}",
            row.id,
            row.created_at.as_deref().unwrap_or("-"),
            truncate(row.file_name.as_deref().unwrap_or("-"), 24),
            truncate(row.vendor.as_deref().unwrap_or("-"), 24),
            truncate(row.number.as_deref().unwrap_or("-"), 12),
            row.date.as_deref().unwrap_or("-"),
            total
        );
    }

    println!();
    println!(
        "{} Showing {} of {} invoices",
        style("ℹ").blue(),
        rows.len(),
        store.count()?
    );

    Ok(())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
