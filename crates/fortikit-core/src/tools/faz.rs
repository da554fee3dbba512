//! FortiAnalyzer tools.

use fortikit_api::FortiAnalyzer;
use fortikit_config::AssetType;
use tracing::debug;

use crate::context::Context;
use crate::error::CoreError;
use crate::report::Report;

/// Firmware version of `host` as reported by the appliance (`vX.Y.Z`).
pub async fn version(ctx: &Context, host: &str) -> Result<Report<String>, CoreError> {
    let mut faz: FortiAnalyzer = ctx.client(host, AssetType::FortiAnalyzer)?;
    debug!(host, "FortiAnalyzer get version");
    let version = faz.get_version().await;
    ctx.finish(&mut faz).await;

    let mut report = Report::new();
    report.push_result(host, version?);
    Ok(report)
}
