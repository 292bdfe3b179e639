//! Prompts and status lines
//!
//! All operator-facing output goes through these helpers so every command
//! shares the same markers.

use crate::error::Result;
use colored::Colorize;
use dialoguer::{Confirm, Select, theme::ColorfulTheme};

/// Prompt for yes/no confirmation with a default value
pub fn confirm(message: &str, default: bool) -> Result<bool> {
    let result = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()?;
    Ok(result)
}

/// Prompt for selection from a list of options
pub fn select<T: ToString>(message: &str, options: &[T], default: usize) -> Result<usize> {
    let items: Vec<String> = options.iter().map(|o| o.to_string()).collect();
    let result = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .items(&items)
        .default(default)
        .interact()?;
    Ok(result)
}

pub fn section_header(title: &str) {
    println!();
    println!("{}", "─".repeat(60).dimmed());
    println!("{}", title.cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn info(message: &str) {
    println!("{} {}", "→".cyan(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message);
}

pub fn error(message: &str) {
    println!("{} {}", "✗".red().bold(), message);
}
