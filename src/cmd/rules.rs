//! Mailbox inbox rules report

use crate::bulk::input::{CsvSchema, IdColumn, read_records};
use crate::config::ConfigManager;
use crate::error::{DirbulkError, Result};
use crate::graph::GraphClient;
use crate::graph::mail_rules::{MessageRule, domain_of, list_inbox_rules};
use crate::ui::{progress, prompts};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAILBOX_SCHEMA: CsvSchema = CsvSchema {
    identifiers: &[IdColumn::UserPrincipalName],
    required: &[],
    optional: &[],
};

#[derive(Args, Debug)]
pub struct RulesListArgs {
    /// Mailboxes (UPN) to inspect
    mailboxes: Vec<String>,

    /// CSV file with a UserPrincipalName column
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Only show rules that forward or redirect mail
    #[arg(long)]
    forwarding_only: bool,

    /// Write the report to a CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Tenant to run against (defaults to the active tenant)
    #[arg(long, env = "DIRBULK_TENANT")]
    tenant: Option<String>,
}

/// One line of the exported report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleRow {
    pub mailbox: String,
    pub rule_name: String,
    pub enabled: bool,
    pub sequence: Option<i32>,
    pub actions: String,
    pub forward_targets: String,
    pub external_forward: bool,
}

impl RuleRow {
    fn new(mailbox: &str, rule: &MessageRule) -> Self {
        let external = domain_of(mailbox)
            .map(|domain| !rule.external_forwards(&domain).is_empty())
            .unwrap_or(false);

        Self {
            mailbox: mailbox.to_string(),
            rule_name: rule.display_name.clone(),
            enabled: rule.is_enabled,
            sequence: rule.sequence,
            actions: rule.action_summary(),
            forward_targets: rule.forward_targets().join("; "),
            external_forward: external,
        }
    }
}

/// Report rows for one mailbox, optionally limited to forwarding rules
pub fn report_rows(mailbox: &str, rules: &[MessageRule], forwarding_only: bool) -> Vec<RuleRow> {
    rules
        .iter()
        .filter(|r| !forwarding_only || !r.forward_targets().is_empty())
        .map(|r| RuleRow::new(mailbox, r))
        .collect()
}

/// Positional mailboxes followed by those from `--file`, blanks and duplicates dropped
fn collect_mailboxes(args: &RulesListArgs) -> Result<Vec<String>> {
    let mut mailboxes: Vec<String> = args.mailboxes.iter().map(|m| m.trim().to_string()).collect();

    if let Some(path) = &args.file {
        let records = read_records(path, &MAILBOX_SCHEMA)?;
        mailboxes.extend(records.into_iter().map(|r| r.account.value().to_string()));
    }

    let mut seen = std::collections::HashSet::new();
    mailboxes.retain(|m| !m.is_empty() && seen.insert(m.to_lowercase()));

    if mailboxes.is_empty() {
        return Err(DirbulkError::ConfigError(
            "No mailboxes given. Pass UPNs or --file <CSV>".into(),
        ));
    }
    Ok(mailboxes)
}

fn print_rows(rows: &[RuleRow]) {
    for row in rows {
        let state = if row.enabled {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        let sequence = row
            .sequence
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());

        println!("  [{}] {} ({})", sequence, row.rule_name.bold(), state);
        println!("      {}", row.actions);
        if row.external_forward {
            println!(
                "      {} {}",
                "external forward:".red().bold(),
                row.forward_targets
            );
        }
    }
}

fn export_rows(path: &Path, rows: &[RuleRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub async fn list(args: RulesListArgs) -> Result<()> {
    let mailboxes = collect_mailboxes(&args)?;

    let config_manager = ConfigManager::new()?;
    let tenant = config_manager.resolve_tenant(args.tenant.as_deref())?;
    let client = GraphClient::from_config(&config_manager, &tenant.name).await?;

    prompts::section_header(&format!("Inbox rules · {}", tenant.name));

    let mut all_rows = Vec::new();
    let mut errors = 0;

    for mailbox in &mailboxes {
        let spinner = progress::create_spinner(&format!("Reading rules for {}...", mailbox));
        let rules = match list_inbox_rules(&client, mailbox).await {
            Ok(rules) => rules,
            Err(e) => {
                progress::finish_spinner_error(&spinner, &format!("{}: {}", mailbox, e));
                warn!(mailbox = %mailbox, error = %e, "could not read inbox rules");
                errors += 1;
                continue;
            }
        };

        let rows = report_rows(mailbox, &rules, args.forwarding_only);
        debug!(mailbox = %mailbox, rules = rules.len(), shown = rows.len(), "rules fetched");
        progress::finish_spinner_success(
            &spinner,
            &format!("{} ({} rule(s))", mailbox.bold(), rows.len()),
        );
        print_rows(&rows);
        all_rows.extend(rows);
    }

    let external = all_rows.iter().filter(|r| r.external_forward).count();

    if let Some(path) = &args.export {
        export_rows(path, &all_rows)?;
        prompts::success(&format!("Report written to {}", path.display()));
    }

    println!();
    prompts::info(&format!(
        "{} mailbox(es) scanned, {} rule(s) found, {} external forward(s), {} error(s)",
        mailboxes.len() - errors,
        all_rows.len(),
        external,
        errors
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> Vec<MessageRule> {
        serde_json::from_value(json!([
            {
                "id": "1",
                "displayName": "Move newsletters",
                "sequence": 1,
                "isEnabled": true,
                "actions": { "moveToFolder": "AAMk" }
            },
            {
                "id": "2",
                "displayName": "Send to gmail",
                "sequence": 2,
                "isEnabled": true,
                "actions": {
                    "forwardTo": [{ "emailAddress": { "address": "me@gmail.com" } }]
                }
            },
            {
                "id": "3",
                "displayName": "Cover for colleague",
                "sequence": 3,
                "isEnabled": false,
                "actions": {
                    "redirectTo": [{ "emailAddress": { "address": "bob@contoso.com" } }]
                }
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_report_flags_external_forwards() {
        let rows = report_rows("alice@contoso.com", &rules(), false);

        assert_eq!(rows.len(), 3);
        assert!(!rows[0].external_forward);
        assert!(rows[1].external_forward);
        assert_eq!(rows[1].forward_targets, "me@gmail.com");
        assert!(!rows[2].external_forward);
        assert!(!rows[2].enabled);
    }

    #[test]
    fn test_forwarding_only_filter() {
        let rows = report_rows("alice@contoso.com", &rules(), true);
        let names: Vec<_> = rows.iter().map(|r| r.rule_name.as_str()).collect();
        assert_eq!(names, vec!["Send to gmail", "Cover for colleague"]);
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.csv");

        export_rows(&path, &report_rows("alice@contoso.com", &rules(), true)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("Mailbox,RuleName,Enabled,Sequence,Actions,ForwardTargets,ExternalForward")
        );
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_collect_mailboxes_merges_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailboxes.csv");
        std::fs::write(
            &path,
            "UserPrincipalName\nbob@contoso.com\n ALICE@contoso.com \n\n",
        )
        .unwrap();

        let args = RulesListArgs {
            mailboxes: vec!["alice@contoso.com".into()],
            file: Some(path),
            forwarding_only: false,
            export: None,
            tenant: None,
        };

        assert_eq!(
            collect_mailboxes(&args).unwrap(),
            vec!["alice@contoso.com".to_string(), "bob@contoso.com".to_string()]
        );
    }

    #[test]
    fn test_collect_mailboxes_requires_input() {
        let args = RulesListArgs {
            mailboxes: Vec::new(),
            file: None,
            forwarding_only: false,
            export: None,
            tenant: None,
        };
        assert!(collect_mailboxes(&args).is_err());
    }
}
