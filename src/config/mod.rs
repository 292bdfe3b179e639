use crate::error::{DirbulkError, Result};
use crate::graph::GRAPH_API_BASE;
use crate::graph::exchange::EXCHANGE_ADMIN_BASE;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure (`config.toml`)
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub current_tenant: Option<String>,

    /// Graph root for national clouds, e.g. `https://graph.microsoft.us/v1.0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_endpoint: Option<String>,

    /// Exchange Online admin API root, e.g. `https://outlook.office365.us/adminapi/beta`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_endpoint: Option<String>,

    /// Append every apply attempt to the audit journal
    #[serde(default = "default_audit")]
    pub audit: bool,
}

fn default_audit() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_tenant: None,
            graph_endpoint: None,
            exchange_endpoint: None,
            audit: default_audit(),
        }
    }
}

/// Tenant-specific configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TenantConfig {
    pub name: String,
    pub tenant_id: String,
    pub client_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default)]
    pub auth_type: AuthType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    DeviceCode,
    ClientCredentials,
}

/// Cached access token for one tenant
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenCache {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub tenant_id: String,
}

/// Cache key of a tenant's Exchange Online token
pub fn exchange_cache_key(tenant_name: &str) -> String {
    format!("{}.exchange", tenant_name)
}

/// Reads and writes everything under the dirbulk config directory
#[derive(Clone, Debug)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("com", "dirbulk", "dirbulk").ok_or_else(|| {
            DirbulkError::ConfigError("Failed to determine config directory".into())
        })?;

        Self::with_dir(project_dirs.config_dir())
    }

    /// Use an explicit directory instead of the platform default
    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let config_dir = dir.as_ref().to_path_buf();
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn tenants_file(&self) -> PathBuf {
        self.config_dir.join("tenants.toml")
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.config_dir.join("audit")
    }

    pub fn token_cache_file(&self, tenant_name: &str) -> PathBuf {
        self.config_dir
            .join("cache")
            .join(format!("{}.token", tenant_name))
    }

    pub fn load_config(&self) -> Result<Config> {
        let config_path = self.config_file();

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save_config(&self, config: &Config) -> Result<()> {
        let contents = toml::to_string_pretty(config)
            .map_err(|e| DirbulkError::ConfigError(format!("Failed to serialize config: {}", e)))?;
        fs::write(self.config_file(), contents)?;
        Ok(())
    }

    /// Graph root URL, honouring a configured override
    pub fn graph_endpoint(&self) -> Result<String> {
        Ok(self
            .load_config()?
            .graph_endpoint
            .unwrap_or_else(|| GRAPH_API_BASE.to_string()))
    }

    /// Exchange admin API root, honouring a configured override
    pub fn exchange_endpoint(&self) -> Result<String> {
        Ok(self
            .load_config()?
            .exchange_endpoint
            .unwrap_or_else(|| EXCHANGE_ADMIN_BASE.to_string()))
    }

    pub fn load_tenants(&self) -> Result<Vec<TenantConfig>> {
        let tenants_path = self.tenants_file();

        if !tenants_path.exists() {
            return Ok(Vec::new());
        }

        #[derive(Deserialize)]
        struct TenantsFile {
            #[serde(default)]
            tenants: Vec<TenantConfig>,
        }

        let contents = fs::read_to_string(tenants_path)?;
        let file: TenantsFile = toml::from_str(&contents)?;
        Ok(file.tenants)
    }

    pub fn save_tenants(&self, tenants: &[TenantConfig]) -> Result<()> {
        #[derive(Serialize)]
        struct TenantsFile<'a> {
            tenants: &'a [TenantConfig],
        }

        let contents = toml::to_string_pretty(&TenantsFile { tenants })
            .map_err(|e| DirbulkError::ConfigError(format!("Failed to serialize tenants: {}", e)))?;
        fs::write(self.tenants_file(), contents)?;
        Ok(())
    }

    /// Add a tenant, replacing any existing one with the same name
    pub fn add_tenant(&self, tenant: TenantConfig) -> Result<()> {
        let mut tenants = self.load_tenants()?;
        tenants.retain(|t| !t.name.eq_ignore_ascii_case(&tenant.name));
        tenants.push(tenant);
        self.save_tenants(&tenants)
    }

    pub fn get_tenant(&self, name: &str) -> Result<TenantConfig> {
        self.load_tenants()?
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| DirbulkError::TenantNotFound(name.to_string()))
    }

    pub fn get_active_tenant(&self) -> Result<Option<TenantConfig>> {
        match self.load_config()?.current_tenant {
            Some(name) => Ok(Some(self.get_tenant(&name)?)),
            None => Ok(None),
        }
    }

    /// The named tenant, or the active one when no name is given
    pub fn resolve_tenant(&self, name: Option<&str>) -> Result<TenantConfig> {
        match name {
            Some(name) => self.get_tenant(name),
            None => self.get_active_tenant()?.ok_or_else(|| {
                DirbulkError::ConfigError(
                    "No active tenant. Run 'dirbulk login <name>' or pass --tenant.".into(),
                )
            }),
        }
    }

    pub fn set_active_tenant(&self, tenant_name: &str) -> Result<()> {
        let tenant = self.get_tenant(tenant_name)?;
        let mut config = self.load_config()?;
        config.current_tenant = Some(tenant.name);
        self.save_config(&config)
    }

    /// Remove a tenant, its cached token, and the active marker if it pointed here
    pub fn remove_tenant(&self, tenant_name: &str) -> Result<()> {
        let mut tenants = self.load_tenants()?;
        let original_len = tenants.len();
        tenants.retain(|t| !t.name.eq_ignore_ascii_case(tenant_name));

        if tenants.len() == original_len {
            return Err(DirbulkError::TenantNotFound(tenant_name.to_string()));
        }

        self.save_tenants(&tenants)?;
        self.delete_token(tenant_name)?;
        self.delete_token(&exchange_cache_key(tenant_name))?;

        let mut config = self.load_config()?;
        if config
            .current_tenant
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(tenant_name))
        {
            config.current_tenant = None;
            self.save_config(&config)?;
        }

        Ok(())
    }

    pub fn save_token(&self, tenant_name: &str, token: &TokenCache) -> Result<()> {
        let cache_dir = self.config_dir.join("cache");
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        let contents = serde_json::to_string_pretty(token)?;
        fs::write(self.token_cache_file(tenant_name), contents)?;
        Ok(())
    }

    fn read_token(&self, cache_key: &str) -> Result<TokenCache> {
        let token_path = self.token_cache_file(cache_key);

        if !token_path.exists() {
            return Err(DirbulkError::TokenNotFound);
        }

        let contents = fs::read_to_string(token_path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load a cached token; expired tokens are reported as `AuthError`
    pub fn load_token(&self, tenant_name: &str) -> Result<TokenCache> {
        let token = self.read_token(tenant_name)?;

        if token.expires_at < chrono::Utc::now() {
            return Err(DirbulkError::AuthError("Token expired".into()));
        }

        Ok(token)
    }

    /// Refresh token of a cached login, even when its access token has expired
    pub fn load_refresh_token(&self, tenant_name: &str) -> Result<Option<String>> {
        match self.read_token(tenant_name) {
            Ok(token) => Ok(token.refresh_token),
            Err(DirbulkError::TokenNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn delete_token(&self, tenant_name: &str) -> Result<()> {
        let token_path = self.token_cache_file(tenant_name);
        if token_path.exists() {
            fs::remove_file(token_path)?;
        }
        Ok(())
    }
}
