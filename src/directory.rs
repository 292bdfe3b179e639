//! Directory abstraction used by the bulk update commands.
//!
//! The remote directory is an object store keyed by account identifier that
//! returns and accepts attribute bags. `graph::users::GraphDirectory` is the
//! Microsoft Graph implementation.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// How a CSV row identifies its account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountId {
    SamAccountName(String),
    UserPrincipalName(String),
}

impl AccountId {
    pub fn value(&self) -> &str {
        match self {
            AccountId::SamAccountName(v) | AccountId::UserPrincipalName(v) => v,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AccountId::SamAccountName(_) => "SamAccountName",
            AccountId::UserPrincipalName(_) => "UserPrincipalName",
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Attributes the bulk commands read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    UserPrincipalName,
    Mail,
    ProxyAddresses,
}

impl Attribute {
    /// Graph property name
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::UserPrincipalName => "userPrincipalName",
            Attribute::Mail => "mail",
            Attribute::ProxyAddresses => "proxyAddresses",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user object as fetched for one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub user_principal_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub proxy_addresses: Vec<String>,
    #[serde(default)]
    pub on_premises_sam_account_name: Option<String>,
    /// Mastered in on-premises AD; cloud writes to its attributes are refused
    #[serde(default)]
    pub on_premises_sync_enabled: Option<bool>,
}

impl DirectoryUser {
    pub fn is_synced(&self) -> bool {
        self.on_premises_sync_enabled == Some(true)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Attribute map sent in one write
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributePatch(Map<String, Value>);

impl AttributePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, attribute: Attribute, value: Value) {
        self.0.insert(attribute.as_str().to_string(), value);
    }

    pub fn get(&self, attribute: Attribute) -> Option<&Value> {
        self.0.get(attribute.as_str())
    }

    /// Remove and return one attribute
    pub fn take(&mut self, attribute: Attribute) -> Option<Value> {
        self.0.remove(attribute.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Remote lookup and write
#[async_trait]
pub trait Directory: Send + Sync {
    /// `Ok(None)` when no object matches the identifier
    async fn find_user(&self, account: &AccountId) -> Result<Option<DirectoryUser>>;

    /// Write all attributes of `patch` to `user`, as returned by `find_user`
    async fn update_user(&self, user: &DirectoryUser, patch: &AttributePatch) -> Result<()>;
}
