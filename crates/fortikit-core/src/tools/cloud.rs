//! FortiCloud asset management tools.

use fortikit_api::FortiCloudAsset;
use fortikit_config::AssetType;
use tracing::debug;

use crate::context::Context;
use crate::error::CoreError;
use crate::report::Report;

/// API version reported by the asset management service.
pub async fn asset_version(ctx: &Context, host: &str) -> Result<Report<String>, CoreError> {
    let mut cloud: FortiCloudAsset = ctx.client(host, AssetType::FortiCloudAsset)?;
    debug!(host, "FortiCloud asset get version");
    let version = cloud.get_version().await?;

    let mut report = Report::new();
    report.push_result(host, version);
    Ok(report)
}
