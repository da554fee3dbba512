//! Local listings: the inventory and the effective configuration.

use fortikit_config::{Asset, AssetType, Config, redact};

use crate::context::Context;
use crate::report::Report;

/// Inventory assets (optionally of one type) with secrets redacted.
pub fn inventory(ctx: &Context, kind: Option<AssetType>) -> Report<Asset> {
    let mut report = Report::new();
    for asset in ctx.inventory().assets(kind) {
        let mut asset = asset.clone();
        asset.settings.password = asset.settings.password.as_deref().map(redact);
        asset.settings.token = asset.settings.token.as_deref().map(redact);
        report.push_result(asset.name.clone(), asset);
    }
    report
}

/// Every config option and its effective value, secrets redacted.
pub fn config(config: &Config) -> Report<Option<String>> {
    let mut report = Report::new();
    for entry in config.entries() {
        report.push_result(entry.key, entry.value);
    }
    report
}
