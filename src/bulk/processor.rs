//! The per-row validate / look up / diff / confirm / apply loop.

use crate::audit::{AuditEntry, AuditLog};
use crate::bulk::UpdateRule;
use crate::bulk::decision::{Decider, Decision, Mode, PendingRow};
use crate::bulk::input::InputRecord;
use crate::bulk::summary::{Outcome, RunSummary, SkipReason};
use crate::directory::Directory;
use crate::ui::prompts;
use tracing::{debug, info, warn};

/// Runs one [`UpdateRule`] over a list of rows against a [`Directory`].
///
/// Rows are handled strictly one after another. Each row costs at most one
/// lookup and one write, and nothing is retried.
pub struct RowProcessor<'a> {
    directory: &'a dyn Directory,
    rule: &'a dyn UpdateRule,
    mode: Mode,
    audit: Option<AuditLog>,
}

impl<'a> RowProcessor<'a> {
    pub fn new(directory: &'a dyn Directory, rule: &'a dyn UpdateRule, mode: Mode) -> Self {
        Self {
            directory,
            rule,
            mode,
            audit: None,
        }
    }

    /// Journal every apply attempt
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Process `records` in order.
    ///
    /// Every outcome ends up in the returned summary. If `decider` fails, the
    /// run stops there and the summary is marked aborted with the reason in
    /// `interrupted`; rows handled before that point stay counted.
    pub async fn process(
        &mut self,
        records: &[InputRecord],
        decider: &mut dyn Decider,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        for record in records {
            let line = record.line;
            let account = record.account.value();

            if account.is_empty() {
                let reason = format!("{} is blank", record.account.kind());
                prompts::warning(&format!("line {}: {}, skipped", line, reason));
                summary.record(line, account, Outcome::Skipped(SkipReason::MissingValue(reason)));
                continue;
            }

            if let Some(reason) = self.rule.skip_reason(record) {
                prompts::warning(&format!("line {} {}: {}, skipped", line, account, reason));
                summary.record(line, account, Outcome::Skipped(SkipReason::MissingValue(reason)));
                continue;
            }

            let user = match self.directory.find_user(&record.account).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    let msg = format!("{} '{}' not found", record.account.kind(), account);
                    warn!(line, account, "lookup miss");
                    prompts::error(&format!("line {}: {}", line, msg));
                    summary.record(line, account, Outcome::Failed(msg));
                    continue;
                }
                Err(e) => {
                    warn!(line, account, error = %e, "lookup failed");
                    prompts::error(&format!("line {} {}: lookup failed: {}", line, account, e));
                    summary.record(line, account, Outcome::Failed(e.to_string()));
                    continue;
                }
            };

            let change = self.rule.propose(&user, record);
            if change.is_noop() {
                prompts::info(&format!("line {} {}: no change required", line, account));
                summary.record(line, account, Outcome::Skipped(SkipReason::NoChange));
                continue;
            }

            if self.mode == Mode::Prompting {
                let pending = PendingRow {
                    record,
                    user: &user,
                    change: &change,
                };
                let decision = match decider.decide(&pending) {
                    Ok(decision) => decision,
                    Err(e) => {
                        warn!(line, error = %e, "decision prompt failed");
                        summary.aborted = true;
                        summary.interrupted = Some(e.to_string());
                        break;
                    }
                };
                match decision {
                    Decision::Yes => {}
                    Decision::No => {
                        prompts::info(&format!("line {} {}: skipped", line, account));
                        summary.record(line, account, Outcome::Skipped(SkipReason::Declined));
                        continue;
                    }
                    Decision::All => {
                        debug!(line, "switching to batch mode");
                        self.mode = Mode::Batch;
                    }
                    Decision::Quit => {
                        prompts::warning("Stopped by operator");
                        summary.aborted = true;
                        break;
                    }
                }
            }

            let patch = change.to_patch();
            let result = self.directory.update_user(&user, &patch).await;

            if let Some(audit) = &self.audit {
                let mut entry =
                    AuditEntry::new(audit.tenant(), self.rule.name(), account, &user.id, &change);
                if let Err(e) = &result {
                    entry = entry.with_error(&e.to_string());
                }
                if let Err(e) = audit.append(&entry) {
                    warn!(error = %e, "could not write audit entry");
                }
            }

            match result {
                Ok(()) => {
                    info!(line, account, attributes = patch.len(), "applied");
                    prompts::success(&format!("line {} {}: updated", line, account));
                    summary.record(line, account, Outcome::Applied);
                }
                Err(e) => {
                    warn!(line, account, error = %e, "apply failed");
                    prompts::error(&format!("line {} {}: update failed: {}", line, account, e));
                    summary.record(line, account, Outcome::Failed(e.to_string()));
                }
            }
        }

        summary
    }
}
