use crate::config::{AuthType, ConfigManager, TenantConfig, TokenCache, exchange_cache_key};
use crate::error::{DirbulkError, Result};
use oauth2::{
    AuthUrl, ClientId, ClientSecret, DeviceAuthorizationUrl, EmptyExtraDeviceAuthorizationFields,
    RefreshToken, Scope, TokenResponse, TokenUrl, basic::BasicClient, reqwest::async_http_client,
};
use std::time::Duration;
use tracing::debug;

const MICROSOFT_AUTHORITY: &str = "https://login.microsoftonline.com";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
const EXCHANGE_SCOPE: &str = "https://outlook.office365.com/.default";
const OFFLINE_SCOPE: &str = "offline_access";

/// Graph permissions the app registration needs
pub const REQUIRED_SCOPES: &[&str] = &["User.ReadWrite.All", "MailboxSettings.Read"];

/// Office 365 Exchange Online permission needed by `proxy update`, per auth flow
pub fn exchange_permission(auth_type: AuthType) -> &'static str {
    match auth_type {
        AuthType::DeviceCode => "Exchange.Manage (delegated, Exchange Recipient Administrator)",
        AuthType::ClientCredentials => {
            "Exchange.ManageAsApp (application, Exchange Administrator role)"
        }
    }
}

pub struct GraphAuth {
    config_manager: ConfigManager,
}

fn endpoint_urls(tenant_id: &str) -> Result<(AuthUrl, TokenUrl)> {
    let auth_url = AuthUrl::new(format!(
        "{}/{}/oauth2/v2.0/authorize",
        MICROSOFT_AUTHORITY, tenant_id
    ))
    .map_err(|e| DirbulkError::AuthError(format!("Invalid auth URL: {}", e)))?;

    let token_url = TokenUrl::new(format!(
        "{}/{}/oauth2/v2.0/token",
        MICROSOFT_AUTHORITY, tenant_id
    ))
    .map_err(|e| DirbulkError::AuthError(format!("Invalid token URL: {}", e)))?;

    Ok((auth_url, token_url))
}

fn expiry(expires_in: Option<Duration>) -> Result<chrono::DateTime<chrono::Utc>> {
    let lifetime = chrono::Duration::from_std(expires_in.unwrap_or(Duration::from_secs(3600)))
        .map_err(|e| DirbulkError::AuthError(format!("Invalid token lifetime: {}", e)))?;
    Ok(chrono::Utc::now() + lifetime)
}

async fn client_credentials_token(tenant_config: &TenantConfig, scope: &str) -> Result<TokenCache> {
    let client_secret = tenant_config.client_secret.as_ref().ok_or_else(|| {
        DirbulkError::AuthError("Client secret required for client credentials flow".into())
    })?;

    let tenant_id = &tenant_config.tenant_id;
    let (auth_url, token_url) = endpoint_urls(tenant_id)?;

    let client = BasicClient::new(
        ClientId::new(tenant_config.client_id.clone()),
        Some(ClientSecret::new(client_secret.clone())),
        auth_url,
        Some(token_url),
    );

    let token = client
        .exchange_client_credentials()
        .add_scope(Scope::new(scope.to_string()))
        .request_async(async_http_client)
        .await
        .map_err(|e| {
            DirbulkError::AuthError(format!("Client credentials exchange failed: {}", e))
        })?;

    Ok(TokenCache {
        access_token: token.access_token().secret().clone(),
        refresh_token: None,
        expires_at: expiry(token.expires_in())?,
        tenant_id: tenant_id.clone(),
    })
}

async fn refresh_for_scope(
    tenant_config: &TenantConfig,
    refresh_token: &str,
    scope: &str,
) -> Result<TokenCache> {
    let (auth_url, token_url) = endpoint_urls(&tenant_config.tenant_id)?;

    let client = BasicClient::new(
        ClientId::new(tenant_config.client_id.clone()),
        None,
        auth_url,
        Some(token_url),
    );

    let token = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .add_scope(Scope::new(scope.to_string()))
        .request_async(async_http_client)
        .await
        .map_err(|e| {
            DirbulkError::AuthError(format!(
                "Could not get an Exchange Online token, run 'dirbulk login' again: {}",
                e
            ))
        })?;

    Ok(TokenCache {
        access_token: token.access_token().secret().clone(),
        refresh_token: token.refresh_token().map(|t| t.secret().clone()),
        expires_at: expiry(token.expires_in())?,
        tenant_id: tenant_config.tenant_id.clone(),
    })
}

impl GraphAuth {
    pub fn new(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Device code flow (interactive)
    pub async fn login_device_code(&self, tenant_config: &TenantConfig) -> Result<TokenCache> {
        let tenant_id = &tenant_config.tenant_id;
        let (auth_url, token_url) = endpoint_urls(tenant_id)?;

        let device_auth_url = DeviceAuthorizationUrl::new(format!(
            "{}/{}/oauth2/v2.0/devicecode",
            MICROSOFT_AUTHORITY, tenant_id
        ))
        .map_err(|e| DirbulkError::AuthError(format!("Invalid device auth URL: {}", e)))?;

        let client = BasicClient::new(
            ClientId::new(tenant_config.client_id.clone()),
            None,
            auth_url,
            Some(token_url),
        )
        .set_device_authorization_url(device_auth_url);

        let details: oauth2::DeviceAuthorizationResponse<EmptyExtraDeviceAuthorizationFields> =
            client
                .exchange_device_code()
                .map_err(|e| {
                    DirbulkError::AuthError(format!("Device code exchange failed: {}", e))
                })?
                .add_scope(Scope::new(GRAPH_SCOPE.to_string()))
                .add_scope(Scope::new(OFFLINE_SCOPE.to_string()))
                .request_async(async_http_client)
                .await
                .map_err(|e| {
                    DirbulkError::AuthError(format!("Device authorization request failed: {}", e))
                })?;

        println!("\nPlease visit: {}", details.verification_uri().as_str());
        println!("Enter code:   {}\n", details.user_code().secret());

        let token = client
            .exchange_device_access_token(&details)
            .request_async(async_http_client, tokio::time::sleep, None)
            .await
            .map_err(|e| DirbulkError::AuthError(format!("Token exchange failed: {}", e)))?;

        let token_cache = TokenCache {
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_at: expiry(token.expires_in())?,
            tenant_id: tenant_id.clone(),
        };

        self.config_manager
            .save_token(&tenant_config.name, &token_cache)?;
        debug!(tenant = %tenant_config.name, "device code token cached");

        Ok(token_cache)
    }

    /// Client credentials flow (non-interactive)
    pub async fn login_client_credentials(
        &self,
        tenant_config: &TenantConfig,
    ) -> Result<TokenCache> {
        let token_cache = client_credentials_token(tenant_config, GRAPH_SCOPE).await?;

        self.config_manager
            .save_token(&tenant_config.name, &token_cache)?;
        debug!(tenant = %tenant_config.name, "client credentials token cached");

        Ok(token_cache)
    }

    /// Access token for the Exchange Online admin API.
    ///
    /// App-only tenants request one with their secret. Device code tenants
    /// redeem the refresh token of their Graph login for the Exchange audience.
    pub async fn get_exchange_token(&self, tenant_config: &TenantConfig) -> Result<String> {
        let cache_key = exchange_cache_key(&tenant_config.name);
        if let Ok(token) = self.config_manager.load_token(&cache_key) {
            return Ok(token.access_token);
        }

        let token_cache = match tenant_config.auth_type {
            AuthType::ClientCredentials => {
                client_credentials_token(tenant_config, EXCHANGE_SCOPE).await?
            }
            AuthType::DeviceCode => {
                let refresh = self
                    .config_manager
                    .load_refresh_token(&tenant_config.name)?
                    .ok_or(DirbulkError::TokenNotFound)?;
                refresh_for_scope(tenant_config, &refresh, EXCHANGE_SCOPE).await?
            }
        };

        self.config_manager.save_token(&cache_key, &token_cache)?;
        debug!(tenant = %tenant_config.name, "exchange token cached");

        Ok(token_cache.access_token)
    }

    /// Cached access token for a tenant; an expired token reads as not found
    pub async fn get_access_token(&self, tenant_name: &str) -> Result<String> {
        match self.config_manager.load_token(tenant_name) {
            Ok(token) => Ok(token.access_token),
            Err(DirbulkError::AuthError(_)) => Err(DirbulkError::TokenNotFound),
            Err(e) => Err(e),
        }
    }

    pub fn logout(&self, tenant_name: &str) -> Result<()> {
        self.config_manager.delete_token(tenant_name)?;
        self.config_manager
            .delete_token(&exchange_cache_key(tenant_name))
    }
}
