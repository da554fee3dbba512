//! Local `get` commands: inventory, config, version.

use fortikit_config::{Asset, Config};
use fortikit_core::{Context, Report, tools::get};
use tabled::Tabled;

use crate::cli::{GetArgs, GetCommand, GlobalOpts};
use crate::error::CliError;

use super::util;

#[derive(Tabled)]
struct AssetRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Port")]
    port: String,
}

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Option")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn handle(args: GetArgs, config: Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        GetCommand::Inventory { kind } => {
            let ctx = Context::from_config(config)?;
            let report = get::inventory(&ctx, kind);
            util::print_report(&report, global, |name, asset: &Asset| {
                vec![AssetRow {
                    name: name.to_owned(),
                    kind: asset.kind.to_string(),
                    hostname: asset.hostname().to_owned(),
                    port: asset.settings.port.map(|p| p.to_string()).unwrap_or_default(),
                }]
            })
        }

        GetCommand::Config => {
            let report = get::config(&config);
            util::print_report(&report, global, |key, value: &Option<String>| {
                vec![ConfigRow {
                    key: key.to_owned(),
                    value: value.clone().unwrap_or_else(|| "-".into()),
                }]
            })
        }

        GetCommand::Version => {
            let mut report = Report::new();
            report.push_result("fortikit", env!("CARGO_PKG_VERSION").to_owned());
            util::print_versions(&report, global)
        }
    }
}
