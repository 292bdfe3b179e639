use colored::Colorize;
use std::fmt;

/// Why a row was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Blank identifier or required value
    MissingValue(String),
    /// Directory already matches the target state
    NoChange,
    /// Operator answered No
    Declined,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingValue(reason) => f.write_str(reason),
            SkipReason::NoChange => f.write_str("no change required"),
            SkipReason::Declined => f.write_str("skipped by operator"),
        }
    }
}

/// Final classification of one visited row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Lookup miss or remote error, with the message shown to the operator
    Failed(String),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOutcome {
    pub line: usize,
    pub account: String,
    pub outcome: Outcome,
}

/// Counters for one run over the input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Run stopped early; rows after that point were not visited
    pub aborted: bool,
    /// Set when the stop came from a failed prompt rather than Quit
    pub interrupted: Option<String>,
    pub rows: Vec<RowOutcome>,
}

impl RunSummary {
    pub fn record(&mut self, line: usize, account: &str, outcome: Outcome) {
        match outcome {
            Outcome::Applied => self.applied += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
        self.rows.push(RowOutcome {
            line,
            account: account.to_string(),
            outcome,
        });
    }

    /// Rows that were classified
    pub fn visited(&self) -> usize {
        self.applied + self.failed + self.skipped
    }

    pub fn print_report(&self, operation: &str) {
        println!();
        println!("{}", "─".repeat(60).dimmed());
        println!("{} {}", operation.bold(), "summary".bold());
        println!("  {:<10} {}", "Applied:", self.applied.to_string().green());
        println!("  {:<10} {}", "Failed:", self.failed.to_string().red());
        println!("  {:<10} {}", "Skipped:", self.skipped.to_string().yellow());
        match (&self.interrupted, self.aborted) {
            (Some(reason), _) => println!(
                "  {} {}; remaining rows were not processed",
                "Interrupted:".red(),
                reason
            ),
            (None, true) => println!(
                "  {}",
                "Stopped by operator; remaining rows were not processed".yellow()
            ),
            (None, false) => {}
        }

        let failures: Vec<_> = self
            .rows
            .iter()
            .filter_map(|r| match &r.outcome {
                Outcome::Failed(msg) => Some((r, msg)),
                _ => None,
            })
            .collect();
        if !failures.is_empty() {
            println!("\n  {}", "Failures:".red().bold());
            for (row, msg) in failures {
                println!("    line {} {}: {}", row.line, row.account, msg);
            }
        }
        println!("{}", "─".repeat(60).dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_counters() {
        let mut summary = RunSummary::default();
        summary.record(2, "alice", Outcome::Applied);
        summary.record(3, "bob", Outcome::Skipped(SkipReason::NoChange));
        summary.record(4, "carol", Outcome::Failed("not found".into()));
        summary.record(5, "dave", Outcome::Skipped(SkipReason::Declined));

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.visited(), 4);
        assert_eq!(summary.rows[2].account, "carol");
        summary.print_report("UPN update");
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::NoChange.to_string(), "no change required");
        assert_eq!(
            SkipReason::MissingValue("NewUPN is blank".into()).to_string(),
            "NewUPN is blank"
        );
    }
}
