use crate::config::{AuthType, ConfigManager, TenantConfig};
use crate::error::{DirbulkError, Result};
use crate::cmd::tenant::{auth_label, permission_checklist};
use crate::graph::auth::GraphAuth;
use crate::ui::progress;
use clap::Args;
use colored::Colorize;

/// Truncate to n characters (not bytes) so non-ASCII ids cannot panic
fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Configured tenant name; with --tenant-id/--client-id, the name to save it under
    #[arg(index = 1)]
    name: Option<String>,

    /// Tenant ID (Entra ID directory id)
    #[arg(long)]
    tenant_id: Option<String>,

    /// Client ID (application id of the app registration)
    #[arg(long)]
    client_id: Option<String>,

    /// Client secret (for client credentials flow)
    #[arg(long)]
    client_secret: Option<String>,

    /// Use client credentials flow instead of device code
    #[arg(long)]
    client_credentials: bool,

    /// Tenant description
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Tenant name
    #[arg(short, long)]
    tenant: Option<String>,

    /// Logout from all tenants
    #[arg(long)]
    all: bool,
}

pub async fn login(args: LoginArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let auth = GraphAuth::new(config_manager.clone());

    let tenant_config = if let (Some(tenant_id), Some(client_id)) =
        (&args.tenant_id, &args.client_id)
    {
        // Quick setup: create the tenant entry on the fly
        let name = args.name.clone().unwrap_or_else(|| {
            let auto_name = tenant_id
                .split('-')
                .next()
                .unwrap_or("tenant")
                .to_string();
            println!(
                "{} Auto-generated tenant name: {}",
                "→".cyan(),
                auto_name.bold()
            );
            auto_name
        });

        let auth_type = if args.client_credentials || args.client_secret.is_some() {
            AuthType::ClientCredentials
        } else {
            AuthType::DeviceCode
        };

        let tenant = TenantConfig {
            name: name.clone(),
            tenant_id: tenant_id.clone(),
            client_id: client_id.clone(),
            client_secret: args.client_secret.clone(),
            auth_type,
            description: args.description.clone(),
        };

        config_manager.add_tenant(tenant.clone())?;
        println!("{} Tenant '{}' configuration saved", "✓".green(), name);

        tenant
    } else if let Some(name) = &args.name {
        let tenant = config_manager.get_tenant(name)?;
        println!(
            "{} Loaded tenant: {} {}",
            "✓".green(),
            tenant.name.bold(),
            tenant.description.as_deref().unwrap_or("").dimmed()
        );
        println!("  Tenant ID: {}...", truncate_chars(&tenant.tenant_id, 8));
        println!("  Client ID: {}...", truncate_chars(&tenant.client_id, 8));
        tenant
    } else {
        return Err(DirbulkError::ConfigError(
            "Usage:\n  \
            dirbulk login NAME                             # configured tenant\n  \
            dirbulk login [NAME] --tenant-id ID --client-id ID  # quick setup"
                .into(),
        ));
    };

    println!("  Auth: {}", auth_label(tenant_config.auth_type));

    let auth_result = match tenant_config.auth_type {
        AuthType::DeviceCode => auth.login_device_code(&tenant_config).await,
        AuthType::ClientCredentials => {
            let spinner = progress::create_spinner("Requesting token...");
            let result = auth.login_client_credentials(&tenant_config).await;
            match &result {
                Ok(_) => progress::finish_spinner_success(&spinner, "Token acquired"),
                Err(_) => progress::finish_spinner_error(&spinner, "Token request failed"),
            }
            result
        }
    };
    let token = auth_result?;

    config_manager.set_active_tenant(&tenant_config.name)?;

    println!(
        "\n{} Active tenant: {} (token valid until {})",
        "→".cyan(),
        tenant_config.name.bold(),
        token.expires_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!("{} The app registration needs:", "→".cyan());
    for permission in permission_checklist(tenant_config.auth_type) {
        println!("  {}", permission.dimmed());
    }
    Ok(())
}

pub async fn logout(args: LogoutArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let auth = GraphAuth::new(config_manager.clone());

    if args.all {
        let tenants = config_manager.load_tenants()?;
        for tenant in &tenants {
            auth.logout(&tenant.name)?;
        }
        println!("{} Logged out from all tenants", "✓".green());
    } else if let Some(tenant_name) = &args.tenant {
        auth.logout(tenant_name)?;
        println!("{} Logged out from '{}'", "✓".green(), tenant_name);
    } else {
        let config = config_manager.load_config()?;

        if let Some(current_tenant) = config.current_tenant {
            auth.logout(&current_tenant)?;
            println!("{} Logged out from '{}'", "✓".green(), current_tenant);
        } else {
            println!("{} No active tenant", "!".yellow());
        }
    }

    Ok(())
}
