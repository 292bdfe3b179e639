//! Change journal
//!
//! Every apply attempt made by a bulk update is appended as one JSON line to
//! `audit/<YYYY-MM-DD>.jsonl` in the config directory, one file per local day.
//! Entries record the old and new value of each attribute that was written, so
//! a run can be reconstructed (or undone by hand) later.

use crate::bulk::change::ProposedChange;
use crate::error::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditedChange {
    pub attribute: String,
    pub old_value: String,
    pub new_value: String,
}

/// One apply attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub tenant: String,
    pub operation: String,
    pub account: String,
    pub object_id: String,
    pub changes: Vec<AuditedChange>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEntry {
    pub fn new(
        tenant: &str,
        operation: &str,
        account: &str,
        object_id: &str,
        change: &ProposedChange,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            tenant: tenant.to_string(),
            operation: operation.to_string(),
            account: account.to_string(),
            object_id: object_id.to_string(),
            changes: change
                .pending()
                .map(|c| AuditedChange {
                    attribute: c.attribute.to_string(),
                    old_value: c.current.to_string(),
                    new_value: c.proposed.to_string(),
                })
                .collect(),
            success: true,
            error: None,
        }
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }

    /// Local calendar day the entry is filed under
    pub fn local_date(&self) -> NaiveDate {
        self.timestamp.with_timezone(&Local).date_naive()
    }
}

/// Append-only journal for one tenant
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
    tenant: String,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>, tenant: &str) -> Self {
        Self {
            dir: dir.into(),
            tenant: tenant.to_string(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn file_for(dir: &Path, date: NaiveDate) -> PathBuf {
        dir.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    pub fn append(&self, entry: &AuditEntry) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(Self::file_for(&self.dir, entry.local_date()))?;

        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Entries filed under `date`, oldest first; unreadable lines are skipped
    pub fn read_day(dir: &Path, date: NaiveDate) -> Result<Vec<AuditEntry>> {
        let path = Self::file_for(dir, date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)?;
        let mut entries = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(file = %path.display(), line = idx + 1, "skipping audit line: {}", e)
                }
            }
        }
        Ok(entries)
    }
}
