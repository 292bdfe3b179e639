//! Proxy address updates.
//!
//! A proxy address is `<type>:<address>`. The upper-case `SMTP:` entry is the
//! primary reply address, lower-case `smtp:` entries are aliases, and every
//! other type (`X500:`, `SIP:`, `SPO:` ...) belongs to other systems and is
//! carried over untouched.

use crate::bulk::UpdateRule;
use crate::bulk::change::{AttributeValue, ProposedChange};
use crate::bulk::input::{CsvSchema, IdColumn, InputRecord};
use crate::directory::{Attribute, DirectoryUser};
use std::collections::HashSet;

pub const PRIMARY_COLUMN: &str = "PrimarySmtpAddress";
pub const SECONDARY_COLUMN: &str = "SecondarySmtpAddress";

const SCHEMA: CsvSchema = CsvSchema {
    identifiers: &[IdColumn::SamAccountName, IdColumn::UserPrincipalName],
    required: &[PRIMARY_COLUMN],
    optional: &[SECONDARY_COLUMN],
};

/// Split an entry into its type prefix and address
fn split(entry: &str) -> (Option<&str>, &str) {
    match entry.split_once(':') {
        Some((kind, address)) => (Some(kind), address),
        None => (None, entry),
    }
}

fn is_smtp(entry: &str) -> bool {
    split(entry).0.is_some_and(|kind| kind.eq_ignore_ascii_case("smtp"))
}

/// Address of the `SMTP:` entry, if any
pub fn primary_address(entries: &[String]) -> Option<&str> {
    entries
        .iter()
        .map(|e| split(e))
        .find(|(kind, _)| *kind == Some("SMTP"))
        .map(|(_, address)| address)
}

/// Drop later entries that equal an earlier one ignoring case
fn dedup_ignore_case(entries: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.to_lowercase()))
        .collect()
}

/// Build the proxy list for a new primary (and optional secondary) address.
///
/// The new entries come first, followed by every existing non-SMTP entry.
/// Existing SMTP entries are dropped unless `keep_aliases` is set, in which
/// case they follow the new entries as `smtp:` aliases (the old primary is
/// demoted). Duplicates are removed case-insensitively, first one wins.
pub fn build_proxy_addresses(
    current: &[String],
    primary: &str,
    secondary: Option<&str>,
    keep_aliases: bool,
) -> Vec<String> {
    let mut proposed = vec![format!("SMTP:{}", primary)];

    if let Some(secondary) = secondary.filter(|s| !s.is_empty()) {
        proposed.push(format!("smtp:{}", secondary));
    }

    if keep_aliases {
        proposed.extend(
            current
                .iter()
                .filter(|e| is_smtp(e))
                .map(|e| format!("smtp:{}", split(e).1)),
        );
    }

    proposed.extend(current.iter().filter(|e| !is_smtp(e)).cloned());

    dedup_ignore_case(proposed)
}

/// Unordered, case-insensitive set equality that also requires the same primary.
///
/// Set equality alone would call `SMTP:a@x.com, smtp:b@x.com` and
/// `smtp:a@x.com, SMTP:b@x.com` unchanged, so a row that only swaps primary
/// and secondary would never be applied.
pub fn same_addresses(current: &[String], proposed: &[String]) -> bool {
    let lower = |entries: &[String]| -> HashSet<String> {
        entries.iter().map(|e| e.to_lowercase()).collect()
    };

    let same_primary = match (primary_address(current), primary_address(proposed)) {
        (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
        (None, None) => true,
        _ => false,
    };

    same_primary && lower(current) == lower(proposed)
}

/// Rewrites `proxyAddresses` (and optionally `mail`) from a primary/secondary pair
#[derive(Debug, Clone, Default)]
pub struct ProxyAddressRule {
    /// Keep existing SMTP aliases instead of replacing them
    pub keep_aliases: bool,
    /// Also set `mail` to the new primary address
    pub update_mail: bool,
}

impl UpdateRule for ProxyAddressRule {
    fn name(&self) -> &'static str {
        "proxy address update"
    }

    fn schema(&self) -> &CsvSchema {
        &SCHEMA
    }

    fn propose(&self, user: &DirectoryUser, record: &InputRecord) -> ProposedChange {
        let primary = record.value(PRIMARY_COLUMN);
        let secondary = record.non_empty(SECONDARY_COLUMN);

        let proposed =
            build_proxy_addresses(&user.proxy_addresses, primary, secondary, self.keep_aliases);

        let mut change = ProposedChange::new().set(
            Attribute::ProxyAddresses,
            AttributeValue::Multi(user.proxy_addresses.clone()),
            AttributeValue::Multi(proposed),
        );

        if self.update_mail {
            change = change.set(
                Attribute::Mail,
                AttributeValue::Single(user.mail.clone()),
                AttributeValue::single(primary),
            );
        }

        if secondary.is_some_and(|s| s.eq_ignore_ascii_case(primary)) {
            change = change.note("secondary address equals the primary and is not added");
        }

        change
    }
}
