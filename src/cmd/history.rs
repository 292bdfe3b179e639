use crate::audit::{AuditEntry, AuditLog};
use crate::config::ConfigManager;
use crate::error::{DirbulkError, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Day to show (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<String>,

    /// Show only the most recent N entries
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

fn parse_date(value: Option<&str>) -> Result<NaiveDate> {
    match value {
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|e| {
            DirbulkError::ConfigError(format!("Invalid date '{}': {} (expected YYYY-MM-DD)", v, e))
        }),
        None => Ok(Local::now().date_naive()),
    }
}

fn print_entry(entry: &AuditEntry) {
    let status = if entry.success {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "\n{} {} {} {} {}",
        status,
        entry
            .timestamp
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string()
            .dimmed(),
        entry.tenant.cyan(),
        entry.operation.bold(),
        entry.account
    );
    for change in &entry.changes {
        println!(
            "    {}: {} {} {}",
            change.attribute,
            change.old_value.red(),
            "→".dimmed(),
            change.new_value.green()
        );
    }
    if let Some(error) = &entry.error {
        println!("    {}", error.red());
    }
}

pub async fn show(args: HistoryArgs) -> Result<()> {
    let date = parse_date(args.date.as_deref())?;
    let config_manager = ConfigManager::new()?;

    let mut entries = AuditLog::read_day(&config_manager.audit_dir(), date)?;
    if entries.is_empty() {
        println!("{} No changes recorded on {}", "!".yellow(), date);
        return Ok(());
    }

    let total = entries.len();
    if let Some(limit) = args.limit {
        entries = entries.split_off(total.saturating_sub(limit));
    }

    println!("\n{} {}", "Changes on".bold(), date.to_string().bold());
    println!("{}", "─".repeat(60));
    for entry in &entries {
        print_entry(entry);
    }
    println!("\n{}", "─".repeat(60));

    let failed = entries.iter().filter(|e| !e.success).count();
    println!(
        "{} {} of {} entr{} shown, {} failed",
        "→".cyan(),
        entries.len(),
        total,
        if total == 1 { "y" } else { "ies" },
        failed
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(Some("2024-03-09")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
        assert!(parse_date(Some("09/03/2024")).is_err());
        assert_eq!(parse_date(None).unwrap(), Local::now().date_naive());
    }
}
