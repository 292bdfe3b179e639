//! Exchange Online admin API.
//!
//! Graph exposes `proxyAddresses` read-only, so mailbox addresses are written
//! with `Set-Mailbox` through the REST endpoint behind the Exchange Online
//! management module (`POST {root}/{tenantId}/InvokeCommand`).

use crate::config::{ConfigManager, TenantConfig};
use crate::error::Result;
use crate::graph::GraphClient;
use crate::graph::auth::GraphAuth;
use serde_json::{Map, Value, json};
use tracing::debug;

pub const EXCHANGE_ADMIN_BASE: &str = "https://outlook.office365.com/adminapi/beta";

/// `Set-Mailbox` parameters for an address change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailboxAddresses {
    /// Full replacement for `EmailAddresses`; the `SMTP:` entry becomes primary
    pub email_addresses: Option<Vec<String>>,
    /// New `WindowsEmailAddress` (the directory `mail` value)
    pub windows_email_address: Option<String>,
}

impl MailboxAddresses {
    pub fn is_empty(&self) -> bool {
        self.email_addresses.is_none() && self.windows_email_address.is_none()
    }

    fn to_cmdlet_input(&self, identity: &str) -> Value {
        let mut parameters = Map::new();
        parameters.insert("Identity".into(), json!(identity));
        if let Some(addresses) = &self.email_addresses {
            parameters.insert("EmailAddresses".into(), json!(addresses));
        }
        if let Some(address) = &self.windows_email_address {
            parameters.insert("WindowsEmailAddress".into(), json!(address));
        }

        json!({
            "CmdletInput": {
                "CmdletName": "Set-Mailbox",
                "Parameters": parameters
            }
        })
    }
}

/// Mailbox writes for one tenant
pub struct ExchangeAdmin {
    client: GraphClient,
}

impl ExchangeAdmin {
    /// `client` must be rooted at `{admin api}/{tenantId}`
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Client for a configured tenant, fetching an Exchange token if needed
    pub async fn from_config(config: &ConfigManager, tenant: &TenantConfig) -> Result<Self> {
        let auth = GraphAuth::new(config.clone());
        let access_token = auth.get_exchange_token(tenant).await?;
        let root = format!(
            "{}/{}",
            config.exchange_endpoint()?.trim_end_matches('/'),
            tenant.tenant_id
        );

        Ok(Self::new(GraphClient::with_base_url(access_token, &root)))
    }

    pub async fn set_mailbox(&self, identity: &str, addresses: &MailboxAddresses) -> Result<()> {
        debug!(identity, "Set-Mailbox");
        let _: Value = self
            .client
            .post("InvokeCommand", &addresses.to_cmdlet_input(identity))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmdlet_input_carries_only_given_parameters() {
        let addresses = MailboxAddresses {
            email_addresses: Some(vec!["SMTP:a@new.com".into(), "smtp:a@old.com".into()]),
            windows_email_address: None,
        };

        assert_eq!(
            addresses.to_cmdlet_input("a@old.com"),
            json!({
                "CmdletInput": {
                    "CmdletName": "Set-Mailbox",
                    "Parameters": {
                        "Identity": "a@old.com",
                        "EmailAddresses": ["SMTP:a@new.com", "smtp:a@old.com"]
                    }
                }
            })
        );
        assert!(MailboxAddresses::default().is_empty());
    }
}
