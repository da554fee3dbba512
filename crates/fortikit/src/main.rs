mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fortikit_config::{Config, LoggingConfig};

use crate::cli::{Cli, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load(cli.global.config.as_deref())?;
    // Dropping the guard flushes the log file, so it lives until dispatch returns.
    let _guard = init_tracing(&cli.global, &config.logging)?;
    tracing::debug!(command = ?cli.command, "dispatching command");
    commands::dispatch(cli.command, config, &cli.global).await
}

/// Console level from `--loglevel`, else `-v`, else warnings only.
fn console_level(global: &GlobalOpts) -> String {
    if let Some(ref level) = global.loglevel {
        return level.clone();
    }
    match global.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
    .to_owned()
}

/// Console logging on stderr (unless `--quiet`), filtered by `RUST_LOG` or
/// the CLI flags; JSON lines to `logging.file` at `logging.level` when set.
fn init_tracing(
    global: &GlobalOpts,
    logging: &LoggingConfig,
) -> Result<Option<WorkerGuard>, CliError> {
    let console = (!global.quiet).then(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(console_level(global)))
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter)
    });

    let (file, guard) = match logging.file {
        Some(ref path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path.file_name().ok_or_else(|| CliError::Config {
                message: format!("logging.file {} has no file name", path.display()),
            })?;
            let filter = EnvFilter::try_new(&logging.level).map_err(|e| CliError::Config {
                message: format!("invalid logging.level '{}': {e}", logging.level),
            })?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(guard)
}
