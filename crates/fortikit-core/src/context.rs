//! Loaded configuration and inventory shared by every tool.

use std::path::Path;

use fortikit_api::{ApiClient, Product};
use fortikit_config::{Asset, AssetType, Config, Inventory, SecretResolver};
use tracing::{debug, warn};

use crate::error::CoreError;

pub struct Context {
    config: Config,
    inventory: Inventory,
    secrets: SecretResolver<'static>,
}

impl Context {
    /// Load the tool config (`path` or the platform default) and the
    /// inventory it points at. Secrets come from the environment and the
    /// system keyring.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        Self::from_config(Config::load(path)?)
    }

    /// Load the inventory `config` points at.
    pub fn from_config(config: Config) -> Result<Self, CoreError> {
        let inventory_path = config.inventory_path();
        debug!(inventory = %inventory_path.display(), "loading inventory");
        let inventory = Inventory::load(&inventory_path)?;
        Ok(Self::new(config, inventory, SecretResolver::system()))
    }

    pub fn new(config: Config, inventory: Inventory, secrets: SecretResolver<'static>) -> Self {
        Self {
            config,
            inventory,
            secrets,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// A client for the inventory asset `name`, which must be a `kind` asset.
    pub fn client<P: Product>(&self, name: &str, kind: AssetType) -> Result<ApiClient<P>, CoreError> {
        let asset = self.inventory.get_item(name, kind)?;
        self.client_for(asset)
    }

    pub fn client_for<P: Product>(&self, asset: &Asset) -> Result<ApiClient<P>, CoreError> {
        let config = asset.client_config(&self.config, &self.secrets)?;
        Ok(ApiClient::new(config)?)
    }

    /// End a tool run. Without session persistence the session is closed
    /// on the appliance; otherwise it stays open for the next run.
    pub async fn finish<P: Product>(&self, client: &mut ApiClient<P>) {
        if self.config.session_path.is_some() {
            return;
        }
        if let Err(err) = client.logout().await {
            warn!(host = client.hostname(), error = %err, "logout failed");
        }
    }
}
