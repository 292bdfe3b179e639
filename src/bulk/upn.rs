//! User principal name updates

use crate::bulk::UpdateRule;
use crate::bulk::change::{AttributeValue, ProposedChange};
use crate::bulk::input::{CsvSchema, IdColumn, InputRecord};
use crate::directory::{Attribute, DirectoryUser};

pub const NEW_UPN_COLUMN: &str = "NewUPN";
pub const CURRENT_UPN_COLUMN: &str = "CurrentUPN";

const SCHEMA: CsvSchema = CsvSchema {
    identifiers: &[IdColumn::SamAccountName, IdColumn::UserPrincipalName],
    required: &[NEW_UPN_COLUMN],
    optional: &[CURRENT_UPN_COLUMN],
};

/// Sets `userPrincipalName` to the row's `NewUPN`
#[derive(Debug, Clone, Default)]
pub struct UpnRule;

impl UpdateRule for UpnRule {
    fn name(&self) -> &'static str {
        "UPN update"
    }

    fn schema(&self) -> &CsvSchema {
        &SCHEMA
    }

    fn propose(&self, user: &DirectoryUser, record: &InputRecord) -> ProposedChange {
        let mut change = ProposedChange::new().set(
            Attribute::UserPrincipalName,
            AttributeValue::single(user.user_principal_name.as_str()),
            AttributeValue::single(record.value(NEW_UPN_COLUMN)),
        );

        // The CSV's idea of the current UPN is informational only
        if let Some(expected) = record.non_empty(CURRENT_UPN_COLUMN) {
            if !expected.eq_ignore_ascii_case(&user.user_principal_name) {
                change = change.note(format!(
                    "CSV lists current UPN {} but the directory has {}",
                    expected, user.user_principal_name
                ));
            }
        }

        change
    }
}
