//! Operator decisions for pending rows

use crate::bulk::change::{AttributeValue, ProposedChange};
use crate::bulk::input::InputRecord;
use crate::directory::DirectoryUser;
use crate::error::Result;
use crate::ui::prompts;
use colored::Colorize;
use std::collections::HashSet;
use std::fmt;

/// Answer to "apply this row?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Apply this row only
    Yes,
    /// Skip this row
    No,
    /// Apply this row and every later row without asking again
    All,
    /// Stop processing; later rows are not visited
    Quit,
}

impl Decision {
    /// Order shown in the prompt
    pub const CHOICES: [Decision; 4] = [Decision::Yes, Decision::No, Decision::All, Decision::Quit];

    pub fn description(&self) -> &'static str {
        match self {
            Decision::Yes => "Yes  - apply this change",
            Decision::No => "No   - skip this row",
            Decision::All => "All  - apply this and all remaining rows",
            Decision::Quit => "Quit - stop without processing further rows",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Whether rows still need confirmation.
///
/// `Prompting` becomes `Batch` when the operator answers `All`; there is no
/// way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Prompting,
    Batch,
}

impl Mode {
    /// `--yes` behaves as if `All` had been chosen before the first row
    pub fn from_auto_accept(auto_accept: bool) -> Self {
        if auto_accept { Mode::Batch } else { Mode::Prompting }
    }
}

/// A row with a real change, waiting for a decision
#[derive(Debug, Clone, Copy)]
pub struct PendingRow<'a> {
    pub record: &'a InputRecord,
    pub user: &'a DirectoryUser,
    pub change: &'a ProposedChange,
}

/// Source of decisions for pending rows
pub trait Decider {
    fn decide(&mut self, row: &PendingRow<'_>) -> Result<Decision>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Attribute(String),
    Changed { from: String, to: String },
    Removed(String),
    Added(String),
    Kept(String),
    Note(String),
}

/// Current vs proposed state of every pending attribute
pub fn render_diff(change: &ProposedChange) -> Vec<DiffLine> {
    let mut lines = Vec::new();

    for attr in change.pending() {
        lines.push(DiffLine::Attribute(attr.attribute.to_string()));

        match (&attr.current, &attr.proposed) {
            (AttributeValue::Multi(current), AttributeValue::Multi(proposed)) => {
                let lower = |v: &[String]| -> HashSet<String> {
                    v.iter().map(|e| e.to_lowercase()).collect()
                };
                let proposed_set = lower(proposed);
                let current_set = lower(current);

                for entry in current {
                    if !proposed_set.contains(&entry.to_lowercase()) {
                        lines.push(DiffLine::Removed(entry.clone()));
                    }
                }
                for entry in proposed {
                    if current_set.contains(&entry.to_lowercase()) {
                        lines.push(DiffLine::Kept(entry.clone()));
                    } else {
                        lines.push(DiffLine::Added(entry.clone()));
                    }
                }
            }
            (current, proposed) => lines.push(DiffLine::Changed {
                from: current.to_string(),
                to: proposed.to_string(),
            }),
        }
    }

    lines.extend(change.notes().iter().cloned().map(DiffLine::Note));
    lines
}

fn print_diff(lines: &[DiffLine]) {
    for line in lines {
        match line {
            DiffLine::Attribute(name) => println!("  {}", name.bold()),
            DiffLine::Changed { from, to } => {
                println!("    {} {}", "-".red(), from.red());
                println!("    {} {}", "+".green(), to.green());
            }
            DiffLine::Removed(entry) => println!("    {} {}", "-".red(), entry.red()),
            DiffLine::Added(entry) => println!("    {} {}", "+".green(), entry.green()),
            DiffLine::Kept(entry) => println!("      {}", entry.dimmed()),
            DiffLine::Note(note) => prompts::warning(note),
        }
    }
}

/// Shows the diff on the terminal and asks the operator
#[derive(Debug, Default)]
pub struct PromptDecider;

impl Decider for PromptDecider {
    fn decide(&mut self, row: &PendingRow<'_>) -> Result<Decision> {
        let display_name = row
            .user
            .display_name
            .as_deref()
            .unwrap_or(&row.user.user_principal_name);

        prompts::section_header(&format!(
            "Line {} · {} ({})",
            row.record.line, row.record.account, display_name
        ));
        print_diff(&render_diff(row.change));
        println!();

        let choice = prompts::select("Apply this change?", &Decision::CHOICES, 0)?;
        Ok(Decision::CHOICES[choice])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Attribute;

    #[test]
    fn test_mode_from_auto_accept() {
        assert_eq!(Mode::from_auto_accept(true), Mode::Batch);
        assert_eq!(Mode::from_auto_accept(false), Mode::Prompting);
        assert_eq!(Mode::default(), Mode::Prompting);
    }

    #[test]
    fn test_choices_order_matches_prompt() {
        assert_eq!(Decision::CHOICES[0], Decision::Yes);
        assert_eq!(Decision::CHOICES[3], Decision::Quit);
        assert!(Decision::All.to_string().starts_with("All"));
    }

    #[test]
    fn test_render_single_value_diff() {
        let change = ProposedChange::new().set(
            Attribute::UserPrincipalName,
            AttributeValue::single("a@old.com"),
            AttributeValue::single("a@new.com"),
        );

        assert_eq!(
            render_diff(&change),
            vec![
                DiffLine::Attribute("userPrincipalName".into()),
                DiffLine::Changed {
                    from: "a@old.com".into(),
                    to: "a@new.com".into()
                },
            ]
        );
    }

    #[test]
    fn test_render_address_list_diff() {
        let change = ProposedChange::new()
            .set(
                Attribute::ProxyAddresses,
                AttributeValue::Multi(vec!["SMTP:a@old.com".into(), "X500:/o=x".into()]),
                AttributeValue::Multi(vec!["SMTP:a@new.com".into(), "X500:/o=x".into()]),
            )
            .note("heads up");

        assert_eq!(
            render_diff(&change),
            vec![
                DiffLine::Attribute("proxyAddresses".into()),
                DiffLine::Removed("SMTP:a@old.com".into()),
                DiffLine::Added("SMTP:a@new.com".into()),
                DiffLine::Kept("X500:/o=x".into()),
                DiffLine::Note("heads up".into()),
            ]
        );
    }

    #[test]
    fn test_unchanged_attributes_are_not_rendered() {
        let change = ProposedChange::new().set(
            Attribute::Mail,
            AttributeValue::single("A@contoso.com"),
            AttributeValue::single("a@contoso.com"),
        );
        assert!(render_diff(&change).is_empty());
    }
}
