//! FortiGate command handlers.

use fortikit_core::Context;
use fortikit_core::tools::fgt;
use tabled::Tabled;

use crate::cli::{FgtArgs, FgtCommand, FgtGet, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "File")]
    file: String,
}

pub async fn handle(args: FgtArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        FgtCommand::Get(FgtGet::Version { host }) => {
            let report = fgt::version(ctx, host.as_deref()).await?;
            util::print_versions(&report, global)
        }

        FgtCommand::Backup { host, backup_dir } => {
            let mut report = fgt::backup(ctx, host.as_deref()).await?;
            let saved = fgt::save_backups(&mut report, &backup_dir).await?;
            let out = output::render_report(global.format, &saved, |host, file| {
                vec![BackupRow {
                    host: host.to_owned(),
                    file: file.display().to_string(),
                }]
            })?;
            output::print_output(&out, global.quiet);
            output::finish_report(&report, global)
        }

        FgtCommand::Get(FgtGet::Address {
            host,
            name,
            vdom,
            output: file,
        }) => {
            let report = fgt::addresses(ctx, &host, name.as_deref(), &vdom).await?;
            let addresses = report.get_result(&host).map_or(&[][..], Vec::as_slice);
            if let Some(ref path) = file {
                output::save_data(path, addresses)?;
            } else {
                let rendered = match global.format {
                    OutputFormat::Table => output::render_value_table(addresses),
                    OutputFormat::Json => output::render_json(addresses)?,
                    OutputFormat::Yaml => output::render_yaml(addresses)?,
                };
                output::print_output(&rendered, global.quiet);
            }
            output::finish_report(&report, global)
        }
    }
}
