//! Shared helpers for command handlers.

use std::time::Duration;

use fortikit_core::Report;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
pub struct VersionRow {
    #[tabled(rename = "Host")]
    pub host: String,
    #[tabled(rename = "Version")]
    pub version: String,
}

/// Print a `host -> version` report.
pub fn print_versions(report: &Report<String>, global: &GlobalOpts) -> Result<(), CliError> {
    print_report(report, global, |host, version| {
        vec![VersionRow {
            host: host.to_owned(),
            version: version.clone(),
        }]
    })
}

/// Render `report`, print it, then print its messages.
pub fn print_report<T, R>(
    report: &Report<T>,
    global: &GlobalOpts,
    to_rows: impl Fn(&str, &T) -> Vec<R>,
) -> Result<(), CliError>
where
    T: Serialize,
    R: Tabled,
{
    let out = output::render_report(global.format, report, to_rows)?;
    output::print_output(&out, global.quiet);
    output::finish_report(report, global)
}

/// Spinner on stderr for long waits; hidden in quiet mode or without a terminal.
pub fn spinner(message: String, global: &GlobalOpts) -> ProgressBar {
    if global.quiet || !std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner().with_message(message);
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
