use clap::{Parser, Subcommand};
use colored::Colorize;
use dirbulk::{cmd, error};

#[derive(Parser, Debug)]
#[command(
    name = "dirbulk",
    about = "Bulk user attribute updates and mailbox rule reports for Microsoft 365",
    version,
    long_about = "Bulk directory administration for Microsoft 365 / Entra ID\n\n\
                  Update user principal names and proxy addresses from CSV with a\n\
                  per-row diff and confirmation, and report mailbox inbox rules."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authenticate to Microsoft Graph API
    Login(cmd::login::LoginArgs),

    /// Logout and clear cached credentials
    Logout(cmd::login::LogoutArgs),

    /// Manage tenant configurations
    #[command(subcommand)]
    Tenant(TenantCommands),

    /// User principal name updates
    #[command(subcommand)]
    Upn(UpnCommands),

    /// Proxy address (primary / secondary SMTP) updates
    #[command(subcommand)]
    Proxy(ProxyCommands),

    /// Mailbox inbox rules
    #[command(subcommand)]
    Rules(RulesCommands),

    /// Show changes recorded in the audit journal
    History(cmd::history::HistoryArgs),
}

#[derive(Subcommand, Debug)]
enum TenantCommands {
    /// Add a new tenant configuration
    Add(cmd::tenant::TenantAddArgs),

    /// List all configured tenants
    List(cmd::tenant::TenantListArgs),

    /// Switch active tenant
    Switch(cmd::tenant::TenantNameArgs),

    /// Remove a tenant configuration
    Remove(cmd::tenant::TenantNameArgs),
}

#[derive(Subcommand, Debug)]
enum UpnCommands {
    /// Set userPrincipalName from a CSV (SamAccountName|UserPrincipalName, NewUPN)
    Update(cmd::upn::UpnUpdateArgs),
}

#[derive(Subcommand, Debug)]
enum ProxyCommands {
    /// Set proxyAddresses from a CSV (SamAccountName|UserPrincipalName, PrimarySmtpAddress)
    Update(cmd::proxy::ProxyUpdateArgs),
}

#[derive(Subcommand, Debug)]
enum RulesCommands {
    /// List inbox rules and flag external forwarding
    List(cmd::rules::RulesListArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> error::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("dirbulk=debug")
            .init();
    }

    match cli.command {
        Commands::Login(args) => cmd::login::login(args).await?,
        Commands::Logout(args) => cmd::login::logout(args).await?,
        Commands::Tenant(tenant_cmd) => match tenant_cmd {
            TenantCommands::Add(args) => cmd::tenant::add(args).await?,
            TenantCommands::List(args) => cmd::tenant::list(args).await?,
            TenantCommands::Switch(args) => cmd::tenant::switch(args).await?,
            TenantCommands::Remove(args) => cmd::tenant::remove(args).await?,
        },
        Commands::Upn(UpnCommands::Update(args)) => cmd::upn::update(args).await?,
        Commands::Proxy(ProxyCommands::Update(args)) => cmd::proxy::update(args).await?,
        Commands::Rules(RulesCommands::List(args)) => cmd::rules::list(args).await?,
        Commands::History(args) => cmd::history::show(args).await?,
    }

    Ok(())
}
