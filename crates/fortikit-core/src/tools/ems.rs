//! FortiClient EMS tools.

use fortikit_api::FortiClientEms;
use fortikit_config::AssetType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tracing::debug;

use crate::context::Context;
use crate::error::CoreError;
use crate::report::Report;

/// Firmware version of `host`, as `v<X.Y.Z>`.
pub async fn version(ctx: &Context, host: &str) -> Result<Report<String>, CoreError> {
    let mut ems: FortiClientEms = ctx.client(host, AssetType::FortiClientEms)?;
    debug!(host, "FortiClient EMS get version");
    ems.login().await?;
    let version = ems.get_version().await;
    ctx.finish(&mut ems).await;

    let mut report = Report::new();
    report.push_result(host, format!("v{}", version?));
    Ok(report)
}

/// Workgroup id and device count, keyed by workgroup name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workgroup {
    pub id: u64,
    pub count: u64,
}

#[derive(Deserialize)]
struct RawWorkgroup {
    id: u64,
    name: String,
    #[serde(default)]
    total_devices: u64,
}

/// Workgroups of `host`; only custom groups when `custom` is set.
pub async fn workgroups(
    ctx: &Context,
    host: &str,
    custom: bool,
) -> Result<Report<Workgroup>, CoreError> {
    let mut ems: FortiClientEms = ctx.client(host, AssetType::FortiClientEms)?;
    debug!(host, custom, "FortiClient EMS get workgroups");
    ems.login().await?;
    let groups = ems.workgroups(custom).await;
    ctx.finish(&mut ems).await;

    let mut report = Report::new();
    for entry in groups? {
        let group: RawWorkgroup =
            serde_json::from_value(entry).map_err(|e| CoreError::Api {
                message: format!("unexpected workgroup entry: {e}"),
                code: None,
                status: None,
            })?;
        report.push_result(
            group.name,
            Workgroup {
                id: group.id,
                count: group.total_devices,
            },
        );
    }
    Ok(report)
}

/// Dashboard views available to `ems monitor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Monitor {
    Connections,
    EndpointManagementStatus,
    EndpointOsVersions,
}

/// The raw monitor response of `host`, kept whole for templates.
pub async fn monitor(ctx: &Context, host: &str, what: Monitor) -> Result<Report<Value>, CoreError> {
    let mut ems: FortiClientEms = ctx.client(host, AssetType::FortiClientEms)?;
    debug!(host, %what, "FortiClient EMS monitor");
    ems.login().await?;
    let data = match what {
        Monitor::Connections => ems.connections().await,
        Monitor::EndpointManagementStatus => ems.endpoint_management_status().await,
        Monitor::EndpointOsVersions => ems.endpoint_os_versions().await,
    };
    ctx.finish(&mut ems).await;

    let mut report = Report::new();
    report.push_result(host, data?);
    Ok(report)
}
