//! Shared driver for the CSV-driven update commands

use crate::audit::AuditLog;
use crate::bulk::input::read_records;
use crate::bulk::{Mode, PromptDecider, RowProcessor, RunSummary, UpdateRule};
use crate::config::ConfigManager;
use crate::error::{DirbulkError, Result};
use crate::graph::GraphClient;
use crate::graph::exchange::ExchangeAdmin;
use crate::graph::users::GraphDirectory;
use crate::ui::{progress, prompts};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

/// Options every update command accepts
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Input CSV file
    pub csv: PathBuf,

    /// Apply every change without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Tenant to run against (defaults to the active tenant)
    #[arg(long, env = "DIRBULK_TENANT")]
    pub tenant: Option<String>,
}

/// Read the CSV, connect, and run `rule` over every row.
///
/// `mailbox_writes` also connects to the Exchange admin API, which is the
/// only place mailbox addresses can be changed.
pub async fn run(
    args: &UpdateArgs,
    rule: &dyn UpdateRule,
    mailbox_writes: bool,
) -> Result<RunSummary> {
    // Input problems abort before any network traffic
    let records = read_records(&args.csv, rule.schema())?;
    debug!(rows = records.len(), file = %args.csv.display(), "input loaded");

    let config_manager = ConfigManager::new()?;
    let tenant = config_manager.resolve_tenant(args.tenant.as_deref())?;
    let config = config_manager.load_config()?;

    prompts::section_header(&format!("{} · {}", rule.name(), tenant.name));
    println!(
        "  {} {} row(s) from {}",
        "Input:".bold(),
        records.len(),
        args.csv.display()
    );

    let spinner = progress::create_spinner("Connecting to Microsoft Graph...");
    let client = match GraphClient::from_config(&config_manager, &tenant.name).await {
        Ok(client) => {
            progress::finish_spinner_success(&spinner, "Connected");
            client
        }
        Err(e) => {
            progress::finish_spinner_error(&spinner, "Not connected");
            return Err(e);
        }
    };
    let mut directory = GraphDirectory::new(client);

    if mailbox_writes {
        let spinner = progress::create_spinner("Connecting to Exchange Online...");
        match ExchangeAdmin::from_config(&config_manager, &tenant).await {
            Ok(exchange) => {
                progress::finish_spinner_success(&spinner, "Connected");
                directory = directory.with_exchange(exchange);
            }
            Err(e) => {
                progress::finish_spinner_error(&spinner, "Not connected");
                return Err(e);
            }
        }
    }

    let mode = Mode::from_auto_accept(args.yes);
    if mode == Mode::Batch {
        prompts::warning("Auto-accept enabled: changes are applied without confirmation");
    }

    let mut processor = RowProcessor::new(&directory, rule, mode);
    if config.audit {
        processor = processor.with_audit(AuditLog::new(config_manager.audit_dir(), &tenant.name));
    }

    let summary = processor.process(&records, &mut PromptDecider).await;
    summary.print_report(rule.name());

    if let Some(reason) = &summary.interrupted {
        return Err(DirbulkError::Interrupted(reason.clone()));
    }
    Ok(summary)
}
