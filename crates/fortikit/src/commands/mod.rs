//! Command handlers, one module per product.

mod cloud;
mod ems;
mod faz;
mod fgt;
mod fmg;
mod get;
mod util;

use clap::CommandFactory;
use fortikit_config::Config;
use fortikit_core::Context;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(command: Command, config: Config, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        // Local commands don't need the inventory
        Command::Get(args) => get::handle(args, config, global),
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "fortikit", &mut std::io::stdout());
            Ok(())
        }

        Command::Ems(args) => ems::handle(args, &Context::from_config(config)?, global).await,
        Command::Fmg(args) => fmg::handle(args, &Context::from_config(config)?, global).await,
        Command::Faz(args) => faz::handle(args, &Context::from_config(config)?, global).await,
        Command::Fgt(args) => fgt::handle(args, &Context::from_config(config)?, global).await,
        Command::Cloud(args) => cloud::handle(args, &Context::from_config(config)?, global).await,
    }
}
