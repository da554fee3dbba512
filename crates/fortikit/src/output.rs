//! Output formatting: table, JSON, YAML, and template rendering.
//!
//! Reports render in the format selected by `--format`. Table uses `tabled`,
//! structured formats use serde. Messages attached to a report go to stderr.

use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::time::SystemTime;

use fortikit_core::{Level, Report};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use tabled::{Table, Tabled, builder::Builder, settings::Style};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled on stderr.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a report in the chosen format.
///
/// - `table`: `to_rows` turns each `(host, result)` into table rows
/// - `json` / `yaml`: the results map, serialized via serde
pub fn render_report<T, R>(
    format: OutputFormat,
    report: &Report<T>,
    to_rows: impl Fn(&str, &T) -> Vec<R>,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = report
                .all_results()
                .iter()
                .flat_map(|(host, result)| to_rows(host, result))
                .collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(report.all_results()),
        OutputFormat::Yaml => render_yaml(report.all_results()),
    }
}

/// Table with one column per key seen in `items`, in order of appearance.
pub fn render_value_table(items: &[Value]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for item in items {
        if let Value::Object(map) = item {
            for key in map.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }
    if columns.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|key| (*key).to_owned()));
    for item in items {
        builder.push_record(columns.iter().map(|key| cell(item.get(*key))));
    }
    builder.build().with(Style::rounded()).to_string()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items.iter().map(|v| cell(Some(v))).collect::<Vec<_>>().join(", "),
        Some(Value::Object(map)) => map
            .get("name")
            .map_or_else(|| Value::Object(map.clone()).to_string(), |name| cell(Some(name))),
        Some(other) => other.to_string(),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print report messages to stderr and fail when any is an error.
///
/// Info messages are dropped in quiet mode.
pub fn finish_report<T>(report: &Report<T>, global: &GlobalOpts) -> Result<(), CliError> {
    let color = should_color(global.color);
    let mut stderr = io::stderr().lock();
    let mut errors = 0;
    for (host, messages) in report.all_messages() {
        for message in messages {
            if message.level == Level::Error {
                errors += 1;
            }
            if global.quiet && message.level == Level::Info {
                continue;
            }
            let level = message.level.to_string();
            let level = match (color, message.level) {
                (false, _) => level,
                (true, Level::Info) => level.cyan().to_string(),
                (true, Level::Warning) => level.yellow().to_string(),
                (true, Level::Error) => level.red().bold().to_string(),
            };
            let _ = writeln!(stderr, "{level}: {host}: {}", message.text);
        }
    }
    if errors > 0 {
        return Err(CliError::Failed { count: errors });
    }
    Ok(())
}

// ── Files ────────────────────────────────────────────────────────────

/// Write `data` to `path` as YAML (`.yaml`, `.yml`) or JSON (anything else).
pub fn save_data<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), CliError> {
    let yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    let text = if yaml {
        render_yaml(data)?
    } else {
        render_json(data)?
    };
    std::fs::write(path, text).map_err(|e| CliError::io(path, &e))
}

/// Render `data` of `host` through the tera template at `template` into
/// `output`.
///
/// The template sees the data's top-level keys plus a `fortikit` object
/// with `host` and `timestamp`. Non-object data is exposed as `data`.
pub fn save_with_template(
    host: &str,
    data: &Value,
    template: &Path,
    output: &Path,
) -> Result<(), CliError> {
    let source = std::fs::read_to_string(template).map_err(|e| CliError::io(template, &e))?;
    let rendered = render_template(host, data, &source)?;
    std::fs::write(output, rendered).map_err(|e| CliError::io(output, &e))
}

fn render_template(host: &str, data: &Value, source: &str) -> Result<String, CliError> {
    let mut root = match data {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("data".into(), other.clone());
            map
        }
    };
    root.insert(
        "fortikit".into(),
        serde_json::json!({
            "host": host,
            "timestamp": humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
        }),
    );

    let context = tera::Context::from_value(Value::Object(root)).map_err(render_error)?;
    tera::Tera::one_off(source, &context, false).map_err(render_error)
}

fn render_error(err: tera::Error) -> CliError {
    // tera keeps the useful part (line, missing variable) in the source chain.
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    CliError::Render { message }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON.
pub fn render_json<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(data).map_err(|e| CliError::Render {
        message: e.to_string(),
    })
}

/// YAML output.
pub fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render {
        message: e.to_string(),
    })
}
