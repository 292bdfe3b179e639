use crate::bulk::ProxyAddressRule;
use crate::cmd::update::{self, UpdateArgs};
use crate::error::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct ProxyUpdateArgs {
    // Columns: SamAccountName or UserPrincipalName, PrimarySmtpAddress,
    // optional SecondarySmtpAddress
    #[command(flatten)]
    common: UpdateArgs,

    /// Keep existing smtp aliases and demote the old primary to an alias
    #[arg(long)]
    keep_aliases: bool,

    /// Also set the mail attribute to the new primary address
    #[arg(long)]
    update_mail: bool,
}

pub async fn update(args: ProxyUpdateArgs) -> Result<()> {
    let rule = ProxyAddressRule {
        keep_aliases: args.keep_aliases,
        update_mail: args.update_mail,
    };
    update::run(&args.common, &rule, true).await?;
    Ok(())
}
