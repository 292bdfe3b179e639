//! Inbox message rules (read-only)

use crate::error::Result;
use crate::graph::GraphClient;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRule {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub sequence: Option<i32>,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub has_error: bool,
    #[serde(default)]
    pub actions: RuleActions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleActions {
    #[serde(default)]
    pub forward_to: Option<Vec<Recipient>>,
    #[serde(default)]
    pub forward_as_attachment_to: Option<Vec<Recipient>>,
    #[serde(default)]
    pub redirect_to: Option<Vec<Recipient>>,
    #[serde(default)]
    pub move_to_folder: Option<String>,
    #[serde(default)]
    pub copy_to_folder: Option<String>,
    #[serde(default)]
    pub delete: Option<bool>,
    #[serde(default)]
    pub permanent_delete: Option<bool>,
    #[serde(default)]
    pub mark_as_read: Option<bool>,
    #[serde(default)]
    pub stop_processing_rules: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

fn addresses(recipients: &Option<Vec<Recipient>>) -> impl Iterator<Item = &str> {
    recipients
        .iter()
        .flatten()
        .filter_map(|r| r.email_address.address.as_deref())
}

/// Domain part of an address, lower-cased
pub fn domain_of(address: &str) -> Option<String> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_ascii_lowercase())
        .filter(|d| !d.is_empty())
}

impl MessageRule {
    /// Every address this rule sends mail to (forward, attachment, redirect)
    pub fn forward_targets(&self) -> Vec<&str> {
        addresses(&self.actions.forward_to)
            .chain(addresses(&self.actions.forward_as_attachment_to))
            .chain(addresses(&self.actions.redirect_to))
            .collect()
    }

    /// Forward targets outside `mailbox_domain`
    pub fn external_forwards(&self, mailbox_domain: &str) -> Vec<&str> {
        self.forward_targets()
            .into_iter()
            .filter(|addr| {
                domain_of(addr).is_none_or(|d| !d.eq_ignore_ascii_case(mailbox_domain))
            })
            .collect()
    }

    /// One-line description of what the rule does
    pub fn action_summary(&self) -> String {
        let a = &self.actions;
        let mut parts = Vec::new();

        let list = |r: &Option<Vec<Recipient>>| addresses(r).collect::<Vec<_>>().join(", ");

        if a.forward_to.as_ref().is_some_and(|v| !v.is_empty()) {
            parts.push(format!("forward to {}", list(&a.forward_to)));
        }
        if a
            .forward_as_attachment_to
            .as_ref()
            .is_some_and(|v| !v.is_empty())
        {
            parts.push(format!(
                "forward as attachment to {}",
                list(&a.forward_as_attachment_to)
            ));
        }
        if a.redirect_to.as_ref().is_some_and(|v| !v.is_empty()) {
            parts.push(format!("redirect to {}", list(&a.redirect_to)));
        }
        if a.move_to_folder.is_some() {
            parts.push("move to folder".to_string());
        }
        if a.copy_to_folder.is_some() {
            parts.push("copy to folder".to_string());
        }
        if a.delete == Some(true) {
            parts.push("delete".to_string());
        }
        if a.permanent_delete == Some(true) {
            parts.push("permanently delete".to_string());
        }
        if a.mark_as_read == Some(true) {
            parts.push("mark as read".to_string());
        }
        if a.stop_processing_rules == Some(true) {
            parts.push("stop processing rules".to_string());
        }

        if parts.is_empty() {
            "no actions".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// All inbox rules of a mailbox
pub async fn list_inbox_rules(client: &GraphClient, mailbox: &str) -> Result<Vec<MessageRule>> {
    let mut rules: Vec<MessageRule> = client
        .get_all_pages(&format!(
            "users/{}/mailFolders/inbox/messageRules",
            urlencoding::encode(mailbox)
        ))
        .await?;
    rules.sort_by_key(|r| r.sequence.unwrap_or(i32::MAX));
    Ok(rules)
}
