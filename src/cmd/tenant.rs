use crate::config::{AuthType, ConfigManager, TenantConfig};
use crate::error::{DirbulkError, Result};
use crate::graph::auth::{REQUIRED_SCOPES, exchange_permission};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct TenantAddArgs {
    /// Name to refer to the tenant by
    name: String,

    /// Entra ID directory id
    #[arg(long)]
    tenant_id: String,

    /// Application id of the app registration
    #[arg(long)]
    client_id: String,

    /// App secret; implies --client-credentials
    #[arg(long)]
    client_secret: Option<String>,

    /// Sign in as the app instead of an administrator
    #[arg(long)]
    client_credentials: bool,

    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
pub struct TenantListArgs {
    /// Show tenant and client ids
    #[arg(short, long)]
    details: bool,
}

#[derive(Args, Debug)]
pub struct TenantNameArgs {
    /// Tenant name
    name: String,
}

pub fn auth_label(auth_type: AuthType) -> &'static str {
    match auth_type {
        AuthType::DeviceCode => "device code",
        AuthType::ClientCredentials => "client credentials",
    }
}

/// API permissions the app registration must be granted for `auth_type`
pub fn permission_checklist(auth_type: AuthType) -> Vec<String> {
    let grant = match auth_type {
        AuthType::DeviceCode => "delegated",
        AuthType::ClientCredentials => "application",
    };
    REQUIRED_SCOPES
        .iter()
        .map(|scope| format!("Microsoft Graph {} ({})", scope, grant))
        .chain(std::iter::once(format!(
            "Office 365 Exchange Online {}",
            exchange_permission(auth_type)
        )))
        .collect()
}

fn tenant_from_args(args: TenantAddArgs) -> Result<TenantConfig> {
    let auth_type = if args.client_credentials || args.client_secret.is_some() {
        AuthType::ClientCredentials
    } else {
        AuthType::DeviceCode
    };
    if auth_type == AuthType::ClientCredentials && args.client_secret.is_none() {
        return Err(DirbulkError::ConfigError(format!(
            "Tenant '{}': --client-credentials needs --client-secret",
            args.name
        )));
    }

    Ok(TenantConfig {
        name: args.name,
        tenant_id: args.tenant_id,
        client_id: args.client_id,
        client_secret: args.client_secret,
        auth_type,
        description: args.description,
    })
}

/// One plain line per tenant for `tenant list`
fn describe(tenant: &TenantConfig, details: bool) -> String {
    let mut line = format!("{} ({})", tenant.name, auth_label(tenant.auth_type));
    if let Some(desc) = &tenant.description {
        line.push_str(&format!(" {}", desc));
    }
    if details {
        line.push_str(&format!(
            "\n    tenant {}  client {}",
            tenant.tenant_id, tenant.client_id
        ));
    }
    line
}

pub async fn add(args: TenantAddArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let tenant = tenant_from_args(args)?;
    let name = tenant.name.clone();
    let auth_type = tenant.auth_type;

    config_manager.add_tenant(tenant)?;

    println!("{} Tenant '{}' added ({})", "✓".green(), name, auth_label(auth_type));
    println!("\n{}", "Grant the app registration:".bold());
    for permission in permission_checklist(auth_type) {
        println!("  • {}", permission);
    }
    println!("\n{} Then run {}", "→".cyan(), format!("dirbulk login {}", name).bold());

    Ok(())
}

pub async fn list(args: TenantListArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let tenants = config_manager.load_tenants()?;

    if tenants.is_empty() {
        println!("{} No tenants configured", "!".yellow());
        println!("\n{} Run {} to add one", "→".cyan(), "dirbulk tenant add".bold());
        return Ok(());
    }

    let active = config_manager.load_config()?.current_tenant;
    for tenant in &tenants {
        let marker = if active
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(&tenant.name))
        {
            "●".green()
        } else {
            "○".dimmed()
        };
        println!("{} {}", marker, describe(tenant, args.details));
    }

    Ok(())
}

pub async fn switch(args: TenantNameArgs) -> Result<()> {
    ConfigManager::new()?.set_active_tenant(&args.name)?;
    println!("{} Switched to tenant '{}'", "✓".green(), args.name);
    Ok(())
}

pub async fn remove(args: TenantNameArgs) -> Result<()> {
    ConfigManager::new()?.remove_tenant(&args.name)?;
    println!("{} Tenant '{}' removed with its cached tokens", "✓".green(), args.name);
    Ok(())
}
