//! CSV input for bulk updates.
//!
//! Header names are matched case-insensitively and every field is trimmed, so
//! rules only ever see normalised values. A missing required column aborts the
//! whole run before any row is looked at.

use crate::directory::AccountId;
use crate::error::{DirbulkError, Result};
use std::collections::BTreeMap;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Columns that can identify the account of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdColumn {
    SamAccountName,
    UserPrincipalName,
}

impl IdColumn {
    pub fn header(&self) -> &'static str {
        match self {
            IdColumn::SamAccountName => "SamAccountName",
            IdColumn::UserPrincipalName => "UserPrincipalName",
        }
    }

    fn account(&self, value: String) -> AccountId {
        match self {
            IdColumn::SamAccountName => AccountId::SamAccountName(value),
            IdColumn::UserPrincipalName => AccountId::UserPrincipalName(value),
        }
    }
}

/// Columns a command expects
#[derive(Debug, Clone)]
pub struct CsvSchema {
    /// Accepted identifier columns, in order of preference
    pub identifiers: &'static [IdColumn],
    /// Must be present in the header; blank values skip the row
    pub required: &'static [&'static str],
    /// Read when present
    pub optional: &'static [&'static str],
}

/// One normalised CSV row
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    /// Source line, header is line 1
    pub line: usize,
    pub account: AccountId,
    values: BTreeMap<String, String>,
}

impl InputRecord {
    pub fn new<'a>(
        line: usize,
        account: AccountId,
        values: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            line,
            account,
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.trim().to_string()))
                .collect(),
        }
    }

    /// Value of a target column, empty when absent
    pub fn value(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }

    /// Value of a target column, `None` when absent or blank
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        Some(self.value(column)).filter(|v| !v.is_empty())
    }
}

/// Read and validate a CSV file
pub fn read_records(path: &Path, schema: &CsvSchema) -> Result<Vec<InputRecord>> {
    if !path.is_file() {
        return Err(DirbulkError::InputFileNotFound(path.to_path_buf()));
    }

    let data = std::fs::read(path)?;
    parse_records(&data, path, schema)
}

/// Parse CSV bytes; `path` is only used in error messages
pub fn parse_records(data: &[u8], path: &Path, schema: &CsvSchema) -> Result<Vec<InputRecord>> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let (id_column, id_index) = schema
        .identifiers
        .iter()
        .find_map(|c| find(c.header()).map(|i| (*c, i)))
        .ok_or_else(|| DirbulkError::MissingColumn {
            path: path.to_path_buf(),
            column: schema
                .identifiers
                .iter()
                .map(IdColumn::header)
                .collect::<Vec<_>>()
                .join(" or "),
        })?;

    let mut columns: Vec<(&'static str, usize)> = Vec::new();
    for &name in schema.required {
        let index = find(name).ok_or_else(|| DirbulkError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })?;
        columns.push((name, index));
    }
    for &name in schema.optional {
        if let Some(index) = find(name) {
            columns.push((name, index));
        }
    }

    let mut records = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = row?;
        let line = row
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(row_idx + 2);

        let account = id_column.account(row.get(id_index).unwrap_or("").to_string());
        let values = columns
            .iter()
            .map(|(name, index)| (*name, row.get(*index).unwrap_or("")));

        records.push(InputRecord::new(line, account, values));
    }

    Ok(records)
}
