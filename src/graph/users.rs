//! Entra ID users as a `Directory`

use crate::directory::{AccountId, Attribute, AttributePatch, Directory, DirectoryUser};
use crate::error::{DirbulkError, Result};
use crate::graph::exchange::{ExchangeAdmin, MailboxAddresses};
use crate::graph::{GraphClient, PaginatedResponse};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const USER_SELECT: &str = "id,userPrincipalName,displayName,mail,proxyAddresses,\
    onPremisesSamAccountName,onPremisesSyncEnabled";

/// Entra ID users over Graph.
///
/// Graph rejects writes to `proxyAddresses`, so address changes go to the
/// Exchange admin API when one is attached with [`GraphDirectory::with_exchange`].
pub struct GraphDirectory {
    client: GraphClient,
    exchange: Option<ExchangeAdmin>,
}

impl GraphDirectory {
    pub fn new(client: GraphClient) -> Self {
        Self {
            client,
            exchange: None,
        }
    }

    pub fn with_exchange(mut self, exchange: ExchangeAdmin) -> Self {
        self.exchange = Some(exchange);
        self
    }

    async fn find_by_upn(&self, upn: &str) -> Result<Option<DirectoryUser>> {
        self.client
            .get_optional(&format!(
                "users/{}?$select={}",
                urlencoding::encode(upn),
                USER_SELECT
            ))
            .await
    }

    async fn find_by_sam(&self, sam: &str) -> Result<Option<DirectoryUser>> {
        let filter = format!("onPremisesSamAccountName eq '{}'", odata_quote(sam));
        let page: PaginatedResponse<DirectoryUser> = self
            .client
            .get_eventual(&format!(
                "users?$filter={}&$count=true&$select={}",
                urlencoding::encode(&filter),
                USER_SELECT
            ))
            .await?;

        let mut matches = page.value;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(DirbulkError::GraphApiError(format!(
                "{} users share SamAccountName '{}'",
                n, sam
            ))),
        }
    }
}

/// Move the mailbox address attributes out of `patch`
fn split_mailbox(patch: &mut AttributePatch) -> MailboxAddresses {
    let email_addresses = patch.take(Attribute::ProxyAddresses).map(|v| match v {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    });
    let windows_email_address = patch
        .take(Attribute::Mail)
        .and_then(|v| v.as_str().map(str::to_string));

    MailboxAddresses {
        email_addresses,
        windows_email_address,
    }
}

/// Escape a value for an OData string literal
fn odata_quote(value: &str) -> String {
    value.replace('\'', "''")
}

#[async_trait]
impl Directory for GraphDirectory {
    async fn find_user(&self, account: &AccountId) -> Result<Option<DirectoryUser>> {
        debug!(kind = account.kind(), account = %account, "looking up user");
        match account {
            AccountId::UserPrincipalName(upn) => self.find_by_upn(upn).await,
            AccountId::SamAccountName(sam) => self.find_by_sam(sam).await,
        }
    }

    async fn update_user(&self, user: &DirectoryUser, patch: &AttributePatch) -> Result<()> {
        if user.is_synced() {
            return Err(DirbulkError::UnsupportedWrite {
                attribute: patch.attributes().collect::<Vec<_>>().join(", "),
                account: user.user_principal_name.clone(),
                reason: "the account is synced from on-premises AD; change it there".into(),
            });
        }

        let mut graph_patch = patch.clone();
        let mailbox = split_mailbox(&mut graph_patch);

        if !mailbox.is_empty() {
            let Some(exchange) = &self.exchange else {
                return Err(DirbulkError::UnsupportedWrite {
                    attribute: "proxyAddresses/mail".into(),
                    account: user.user_principal_name.clone(),
                    reason: "Graph treats them as read-only and no Exchange Online \
                             connection is configured"
                        .into(),
                });
            };
            // Identity is the UPN as found, before any rename in the same row
            exchange.set_mailbox(&user.user_principal_name, &mailbox).await?;
        }

        if graph_patch.is_empty() {
            return Ok(());
        }
        debug!(user_id = %user.id, attributes = graph_patch.len(), "patching user");
        self.client
            .patch_no_content(&format!("users/{}", urlencoding::encode(&user.id)), &graph_patch)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_split_mailbox_leaves_graph_attributes() {
        let mut patch = AttributePatch::new();
        patch.set(Attribute::UserPrincipalName, json!("a@new.com"));
        patch.set(Attribute::ProxyAddresses, json!(["SMTP:a@new.com", "smtp:a@old.com"]));
        patch.set(Attribute::Mail, json!("a@new.com"));

        let mailbox = split_mailbox(&mut patch);

        assert_eq!(
            mailbox.email_addresses,
            Some(vec!["SMTP:a@new.com".to_string(), "smtp:a@old.com".to_string()])
        );
        assert_eq!(mailbox.windows_email_address.as_deref(), Some("a@new.com"));
        assert_eq!(patch.attributes().collect::<Vec<_>>(), vec!["userPrincipalName"]);
    }

    #[test]
    fn test_odata_quote_doubles_single_quotes() {
        assert_eq!(odata_quote("o'brien"), "o''brien");
        assert_eq!(odata_quote("alice"), "alice");
    }
}
