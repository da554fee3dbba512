//! FortiManager command handlers.

use fortikit_api::{Task, TaskWait};
use fortikit_core::Context;
use fortikit_core::tools::fmg::{self, Adom};
use tabled::Tabled;

use crate::cli::{FmgArgs, FmgCommand, FmgGet, GlobalOpts};
use crate::error::CliError;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AdomRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "ADOM")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Task")]
    id: u64,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Progress")]
    percent: String,
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Failure")]
    failure: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: FmgArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        FmgCommand::Get(FmgGet::Version { host }) => {
            let report = fmg::version(ctx, &host).await?;
            util::print_versions(&report, global)
        }

        FmgCommand::Get(FmgGet::Adoms { host }) => {
            let report = fmg::adoms(ctx, &host).await?;
            util::print_report(&report, global, |host, adoms: &Vec<Adom>| {
                adoms
                    .iter()
                    .map(|adom| AdomRow {
                        host: host.to_owned(),
                        name: adom.name.clone(),
                        version: adom.version.clone().unwrap_or_default(),
                    })
                    .collect()
            })
        }

        FmgCommand::Assign {
            adoms,
            policy,
            host,
            timeout,
            poll_interval,
        } => {
            let wait = TaskWait {
                poll_interval,
                max_polls: None,
                deadline: Some(timeout),
            };
            let spinner = util::spinner(format!("assigning '{policy}' to {adoms} on {host}"), global);
            let report = fmg::assign(ctx, &host, &adoms, &policy, &wait).await;
            spinner.finish_and_clear();
            util::print_report(&report?, global, |host, task: &Task| {
                vec![TaskRow {
                    host: host.to_owned(),
                    id: task.id.get(),
                    state: task.state.to_string(),
                    percent: format!("{}%", task.percent),
                }]
            })
        }

        FmgCommand::Post { file, adom, host } => {
            let report = fmg::post(ctx, &host, &file, &adom).await?;
            util::print_report(&report, global, |host, failures: &Vec<String>| {
                failures
                    .iter()
                    .map(|failure| FailureRow {
                        host: host.to_owned(),
                        failure: failure.clone(),
                    })
                    .collect()
            })
        }
    }
}
