//! FortiCloud command handlers.

use fortikit_core::Context;
use fortikit_core::tools::cloud;

use crate::cli::{CloudArgs, CloudAsset, CloudAssetGet, CloudCommand, GlobalOpts};
use crate::error::CliError;

use super::util;

pub async fn handle(args: CloudArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        CloudCommand::Asset(CloudAsset::Get(CloudAssetGet::Version { host })) => {
            let report = cloud::asset_version(ctx, &host).await?;
            util::print_versions(&report, global)
        }
    }
}
