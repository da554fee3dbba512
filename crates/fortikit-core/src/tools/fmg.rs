//! FortiManager tools.

use std::path::Path;

use fortikit_api::{FortiManager, Task, TaskState, TaskWait};
use fortikit_config::AssetType;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::CoreError;
use crate::report::{Level, Report};

/// Firmware version of `host` (`vX.Y.Z`).
pub async fn version(ctx: &Context, host: &str) -> Result<Report<String>, CoreError> {
    let mut fmg: FortiManager = ctx.client(host, AssetType::FortiManager)?;
    debug!(host, "FortiManager get version");
    let version = fmg.get_version().await;
    ctx.finish(&mut fmg).await;

    let mut report = Report::new();
    report.push_result(host, version?);
    Ok(report)
}

/// Name and firmware line of one ADOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Adom {
    pub name: String,
    /// `<major>.<minor>`, when the appliance reports one.
    pub version: Option<String>,
}

impl Adom {
    fn from_value(value: &Value) -> Option<Self> {
        let name = value.get("name")?.as_str()?.to_owned();
        let version = match (value.get("os_ver"), value.get("mr")) {
            (Some(Value::Number(major)), Some(Value::Number(minor))) => {
                Some(format!("{major}.{minor}"))
            }
            _ => None,
        };
        Some(Self { name, version })
    }
}

/// ADOMs of `host`, in the order the appliance lists them.
pub async fn adoms(ctx: &Context, host: &str) -> Result<Report<Vec<Adom>>, CoreError> {
    let mut fmg: FortiManager = ctx.client(host, AssetType::FortiManager)?;
    debug!(host, "FortiManager get adoms");
    let raw = fmg.get_adoms().await;
    ctx.finish(&mut fmg).await;

    let mut report = Report::new();
    report.push_result(host, raw?.iter().filter_map(Adom::from_value).collect());
    Ok(report)
}

/// Assign all objects of the global package `policy` to `adoms` and wait
/// for the task.
///
/// A rejected assignment and a task that ends in any state but `done` are
/// reported as errors on `host`; task history lines are reported as info.
pub async fn assign(
    ctx: &Context,
    host: &str,
    adoms: &str,
    policy: &str,
    wait: &TaskWait,
) -> Result<Report<Task>, CoreError> {
    let mut fmg: FortiManager = ctx.client(host, AssetType::FortiManager)?;
    let mut report = Report::new();
    let outcome = run_assignment(&mut fmg, adoms, policy, wait).await;
    ctx.finish(&mut fmg).await;

    match outcome? {
        None => report.push_message(
            host,
            Level::Error,
            format!("assignment of '{policy}' to '{adoms}' was rejected"),
        ),
        Some(task) => {
            for line in &task.messages {
                report.push_message(host, Level::Info, line.as_str());
            }
            if task.state != TaskState::Done {
                report.push_message(
                    host,
                    Level::Error,
                    format!("task {} ended as {}", task.id, task.state),
                );
            }
            report.push_result(host, task);
        }
    }
    Ok(report)
}

async fn run_assignment(
    fmg: &mut FortiManager,
    adoms: &str,
    policy: &str,
    wait: &TaskWait,
) -> Result<Option<Task>, CoreError> {
    let Some(task_id) = fmg.assign_all_objects(adoms, policy).await? else {
        return Ok(None);
    };
    info!(host = fmg.hostname(), %task_id, "waiting for assignment task");
    Ok(Some(fmg.wait_for_task(task_id, wait).await?))
}

/// POST the JSON-RPC envelopes in `file` to `adoms` on `host`.
///
/// The report holds the failed items for `host` (empty when all went
/// through); each failure is also an error message.
pub async fn post(
    ctx: &Context,
    host: &str,
    file: &Path,
    adoms: &str,
) -> Result<Report<Vec<String>>, CoreError> {
    let text = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| CoreError::io(file, &e))?;
    let payload: Value = serde_json::from_str(&text).map_err(|e| CoreError::InvalidInput {
        message: format!("{} is not valid JSON: {e}", file.display()),
    })?;

    let mut fmg: FortiManager = ctx.client(host, AssetType::FortiManager)?;
    debug!(host, file = %file.display(), adoms, "FortiManager post");
    let failures = fmg.post_batch(adoms, payload).await;
    ctx.finish(&mut fmg).await;
    let failures = failures?;

    let mut report = Report::new();
    for failure in &failures {
        report.push_message(host, Level::Error, failure.as_str());
    }
    report.push_result(host, failures);
    Ok(report)
}
