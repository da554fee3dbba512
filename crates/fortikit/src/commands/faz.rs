//! FortiAnalyzer command handlers.

use fortikit_core::Context;
use fortikit_core::tools::faz;

use crate::cli::{FazArgs, FazCommand, FazGet, GlobalOpts};
use crate::error::CliError;

use super::util;

pub async fn handle(args: FazArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        FazCommand::Get(FazGet::Version { host }) => {
            let report = faz::version(ctx, &host).await?;
            util::print_versions(&report, global)
        }
    }
}
