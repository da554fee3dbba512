//! FortiGate tools.
//!
//! Version and backup run against one named FortiGate or every FortiGate
//! in the inventory. Each host gets its own client, so hosts are queried
//! concurrently.

use std::future::Future;
use std::path::{Path, PathBuf};

use fortikit_api::{FortiGate, FortiGateApi};
use fortikit_config::AssetType;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::error::CoreError;
use crate::report::{Level, Report};

/// Run `op` on `host`, or on every FortiGate when `host` is `None`.
///
/// With a single host its failure is returned as the error. Over the whole
/// inventory a failing host becomes an error message and the others still
/// report.
async fn each_fortigate<T, F, Fut>(
    ctx: &Context,
    host: Option<&str>,
    op: F,
) -> Result<Report<T>, CoreError>
where
    F: Fn(FortiGate) -> Fut,
    Fut: Future<Output = Result<T, fortikit_api::Error>>,
{
    let assets = ctx.inventory().select(host, AssetType::FortiGate)?;
    let op = &op;
    let runs = assets.into_iter().map(|asset| {
        let client = ctx.client_for::<FortiGateApi>(asset);
        async move {
            let outcome = match client {
                Ok(client) => op(client).await.map_err(CoreError::from),
                Err(err) => Err(err),
            };
            (asset.name.clone(), outcome)
        }
    });

    let mut report = Report::new();
    for (name, outcome) in join_all(runs).await {
        match outcome {
            Ok(value) => report.push_result(name, value),
            Err(err) if host.is_some() => return Err(err),
            Err(err) => {
                warn!(host = %name, error = %err, "FortiGate request failed");
                report.push_message(name, Level::Error, err.to_string());
            }
        }
    }
    Ok(report)
}

/// Firmware version per FortiGate (`vX.Y.Z`).
pub async fn version(ctx: &Context, host: Option<&str>) -> Result<Report<String>, CoreError> {
    debug!(?host, "FortiGate get version");
    each_fortigate(ctx, host, |mut fgt| async move { fgt.get_version().await }).await
}

/// Full configuration text per FortiGate.
pub async fn backup(ctx: &Context, host: Option<&str>) -> Result<Report<String>, CoreError> {
    debug!(?host, "FortiGate backup");
    each_fortigate(ctx, host, |mut fgt| async move { fgt.backup().await }).await
}

/// Write every backup in `report` to `<dir>/<host>.conf`, replacing older
/// files, and return the files written per host. Hosts whose file cannot be
/// written get an error message.
pub async fn save_backups(
    report: &mut Report<String>,
    dir: &Path,
) -> Result<Report<PathBuf>, CoreError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| CoreError::io(dir, &e))?;

    let mut written = Report::new();
    let mut failed = Vec::new();
    for (name, config) in report.all_results() {
        let file = dir.join(format!("{name}.conf"));
        match tokio::fs::write(&file, config).await {
            Ok(()) => {
                info!(host = %name, file = %file.display(), "backup saved");
                written.push_result(name.as_str(), file);
            }
            Err(err) => failed.push((name.clone(), format!("cannot write {}: {err}", file.display()))),
        }
    }
    for (name, text) in failed {
        report.push_message(name, Level::Error, text);
    }
    Ok(written)
}

/// Firewall address objects of `host`, each tagged with its VDOM.
///
/// `name` narrows the read to one object and then needs a single VDOM.
pub async fn addresses(
    ctx: &Context,
    host: &str,
    name: Option<&str>,
    vdom: &str,
) -> Result<Report<Vec<Value>>, CoreError> {
    let mut fgt: FortiGate = ctx.client(host, AssetType::FortiGate)?;
    debug!(host, ?name, vdom, "FortiGate get firewall address");
    let addresses = fgt.firewall_addresses(name, vdom).await?;

    let mut report = Report::new();
    report.push_result(host, addresses);
    Ok(report)
}
