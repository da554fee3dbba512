//! FortiClient EMS command handlers.

use fortikit_core::Context;
use fortikit_core::tools::ems::{self, Monitor, Workgroup};
use serde_json::Value;
use tabled::Tabled;

use crate::cli::{EmsArgs, EmsCommand, EmsGet, EmsMonitor, GlobalOpts, OutputFormat, TemplateOutput};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct WorkgroupRow {
    #[tabled(rename = "Group")]
    name: String,
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Count")]
    count: u64,
}

#[derive(Tabled)]
struct DonutRow {
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Count")]
    value: String,
    #[tabled(rename = "Description")]
    name: String,
}

impl DonutRow {
    fn from_value(item: &Value) -> Self {
        let text = |key: &str| match item.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self {
            token: text("token"),
            value: text("value"),
            name: text("name"),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: EmsArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        EmsCommand::Get(EmsGet::Version { host }) => {
            let report = ems::version(ctx, &host).await?;
            util::print_versions(&report, global)
        }

        EmsCommand::Get(EmsGet::Workgroups { host, custom }) => {
            let report = ems::workgroups(ctx, &host, custom).await?;
            util::print_report(&report, global, |name, group: &Workgroup| {
                vec![WorkgroupRow {
                    name: name.to_owned(),
                    id: group.id,
                    count: group.count,
                }]
            })
        }

        EmsCommand::Monitor(monitor) => {
            let (host, what, out) = match monitor {
                EmsMonitor::Connections { host, output } => (host, Monitor::Connections, output),
                EmsMonitor::EndpointManagementStatus { host, output } => {
                    (host, Monitor::EndpointManagementStatus, output)
                }
                EmsMonitor::EndpointOsVersions { host, output } => {
                    (host, Monitor::EndpointOsVersions, output)
                }
            };
            let report = ems::monitor(ctx, &host, what).await?;
            let data = report.get_result(&host).cloned().unwrap_or(Value::Null);
            print_monitor(&host, &data, &out, global)?;
            output::finish_report(&report, global)
        }
    }
}

fn print_monitor(
    host: &str,
    data: &Value,
    out: &TemplateOutput,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(ref path) = out.output {
        tracing::debug!(output = %path.display(), "writing monitor output");
        return match out.template {
            Some(ref template) => output::save_with_template(host, data, template, path),
            None => output::save_data(path, data),
        };
    }

    let rendered = match (out.raw, global.format) {
        (true, _) | (false, OutputFormat::Json) => output::render_json(data)?,
        (false, OutputFormat::Yaml) => output::render_yaml(data)?,
        (false, OutputFormat::Table) => {
            let items = data.get("data");
            match items {
                Some(Value::Array(items)) if items.iter().all(|i| i.get("token").is_some()) => {
                    let rows: Vec<DonutRow> = items.iter().map(DonutRow::from_value).collect();
                    tabled::Table::new(rows)
                        .with(tabled::settings::Style::rounded())
                        .to_string()
                }
                Some(Value::Array(items)) => output::render_value_table(items),
                Some(other) => output::render_value_table(std::slice::from_ref(other)),
                None => String::new(),
            }
        }
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}
