use crate::bulk::UpnRule;
use crate::cmd::update::{self, UpdateArgs};
use crate::error::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct UpnUpdateArgs {
    // Columns: SamAccountName or UserPrincipalName, NewUPN, optional CurrentUPN
    #[command(flatten)]
    common: UpdateArgs,
}

pub async fn update(args: UpnUpdateArgs) -> Result<()> {
    update::run(&args.common, &UpnRule, false).await?;
    Ok(())
}
