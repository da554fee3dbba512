// Asset inventory
//
// `inventory.toml` lists the managed appliances under `[assets.<name>]`.
// Per-type defaults live under `[globals.<type>]` and fill whatever an
// asset leaves unset. Secrets resolve through environment, keyring,
// plaintext, then the `[credentials]` block of the tool config.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;
use url::Url;

use fortikit_api::{ClientConfig, Credentials, Scheme, TlsMode, TransportConfig};

use crate::{Config, ConfigError};

const KEYRING_SERVICE: &str = "fortikit";

/// Kind of appliance or service an asset refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetType {
    FortiGate,
    FortiManager,
    FortiAnalyzer,
    FortiClientEms,
    FortiCloudAsset,
}

/// Connection settings of one asset; also the shape of a `[globals]` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssetSettings {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub ssl_verify: Option<bool>,
    /// Read timeout in seconds.
    pub timeout: Option<u64>,
    /// Write timeout in seconds.
    pub write_timeout: Option<u64>,
    pub proxy: Option<String>,
    /// Replaces the API root derived from scheme, host, and port.
    pub base_url: Option<String>,
    /// OAuth endpoint (cloud assets).
    pub auth_url: Option<String>,
}

impl AssetSettings {
    /// Fill every unset field from `defaults`.
    fn or(self, defaults: &Self) -> Self {
        Self {
            hostname: self.hostname.or_else(|| defaults.hostname.clone()),
            port: self.port.or(defaults.port),
            scheme: self.scheme.or_else(|| defaults.scheme.clone()),
            username: self.username.or_else(|| defaults.username.clone()),
            password: self.password.or_else(|| defaults.password.clone()),
            token: self.token.or_else(|| defaults.token.clone()),
            ssl_verify: self.ssl_verify.or(defaults.ssl_verify),
            timeout: self.timeout.or(defaults.timeout),
            write_timeout: self.write_timeout.or(defaults.write_timeout),
            proxy: self.proxy.or_else(|| defaults.proxy.clone()),
            base_url: self.base_url.or_else(|| defaults.base_url.clone()),
            auth_url: self.auth_url.or_else(|| defaults.auth_url.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInventory {
    #[serde(default)]
    globals: HashMap<String, AssetSettings>,
    #[serde(default)]
    assets: IndexMap<String, RawAsset>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    #[serde(rename = "type")]
    kind: AssetType,
    #[serde(flatten)]
    settings: AssetSettings,
}

/// One inventory entry with globals applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    #[serde(flatten)]
    pub settings: AssetSettings,
}

/// The parsed inventory, in file order.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    assets: IndexMap<String, Asset>,
    path: Option<PathBuf>,
}

impl Inventory {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut inventory = Self::parse(&text, &path.display().to_string())?;
        inventory.path = Some(path.to_path_buf());
        debug!(path = %path.display(), assets = inventory.assets.len(), "loaded inventory");
        Ok(inventory)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "inventory")
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let raw: RawInventory = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_owned(),
            source: Box::new(source),
        })?;
        let assets = raw
            .assets
            .into_iter()
            .map(|(name, asset)| {
                let settings = match raw.globals.get(&asset.kind.to_string()) {
                    Some(globals) => asset.settings.or(globals),
                    None => asset.settings,
                };
                let resolved = Asset {
                    name: name.clone(),
                    kind: asset.kind,
                    settings,
                };
                (name, resolved)
            })
            .collect();
        Ok(Self { assets, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.get(name)
    }

    /// Look up `name` and check that it is a `kind` asset.
    pub fn get_item(&self, name: &str, kind: AssetType) -> Result<&Asset, ConfigError> {
        let asset = self.get(name).ok_or_else(|| ConfigError::AssetNotFound {
            name: name.to_owned(),
        })?;
        if asset.kind != kind {
            return Err(ConfigError::WrongAssetType {
                name: name.to_owned(),
                expected: kind,
                actual: asset.kind,
            });
        }
        Ok(asset)
    }

    /// All assets, optionally narrowed to one type.
    pub fn assets(&self, kind: Option<AssetType>) -> impl Iterator<Item = &Asset> {
        self.assets
            .values()
            .filter(move |asset| kind.is_none_or(|k| asset.kind == k))
    }

    /// `name` when given (type-checked), otherwise every asset of `kind`.
    pub fn select(&self, name: Option<&str>, kind: AssetType) -> Result<Vec<&Asset>, ConfigError> {
        match name {
            Some(name) => Ok(vec![self.get_item(name, kind)?]),
            None => Ok(self.assets(Some(kind)).collect()),
        }
    }
}

// ── Secret resolution ───────────────────────────────────────────────

/// Where secrets are looked up, in priority order: environment, keyring,
/// plaintext in the inventory, then the tool config's `[credentials]`.
pub struct SecretResolver<'a> {
    env: &'a (dyn Fn(&str) -> Option<String> + Sync),
    keyring: bool,
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl SecretResolver<'static> {
    /// Process environment and the system keyring.
    pub fn system() -> Self {
        Self {
            env: &process_env,
            keyring: true,
        }
    }
}

impl<'a> SecretResolver<'a> {
    /// A custom environment and no keyring.
    pub fn with_env(env: &'a (dyn Fn(&str) -> Option<String> + Sync)) -> Self {
        Self {
            env,
            keyring: false,
        }
    }

    fn resolve(
        &self,
        asset: &str,
        what: &str,
        plaintext: Option<&String>,
        fallback: Option<&String>,
    ) -> Option<SecretString> {
        let var = env_var_name(asset, what);
        if let Some(value) = (self.env)(&var) {
            debug!(asset, %var, "{what} from environment");
            return Some(SecretString::from(value));
        }
        if self.keyring {
            if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{asset}/{what}")) {
                if let Ok(value) = entry.get_password() {
                    debug!(asset, "{what} from keyring");
                    return Some(SecretString::from(value));
                }
            }
        }
        plaintext
            .or(fallback)
            .map(|value| SecretString::from(value.clone()))
    }
}

/// `FORTIKIT_<ASSET>_<WHAT>`, with non-alphanumerics mapped to `_`.
pub(crate) fn env_var_name(asset: &str, what: &str) -> String {
    let mangle = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!("FORTIKIT_{}_{}", mangle(asset), mangle(what))
}

// ── Translation to client config ────────────────────────────────────

impl Asset {
    /// Host name used on the wire; the asset name when none is set.
    pub fn hostname(&self) -> &str {
        self.settings.hostname.as_deref().unwrap_or(&self.name)
    }

    /// Build the client configuration for this asset.
    pub fn client_config(
        &self,
        config: &Config,
        secrets: &SecretResolver<'_>,
    ) -> Result<ClientConfig, ConfigError> {
        let settings = &self.settings;
        let credentials = self.credentials(config, secrets)?;

        let mut client = ClientConfig::new(self.hostname(), credentials);
        if let Some(port) = settings.port {
            client.port = port;
        }
        if let Some(ref scheme) = settings.scheme {
            client.scheme = scheme.parse::<Scheme>().map_err(|e| ConfigError::Validation {
                field: format!("assets.{}.scheme", self.name),
                reason: e.to_string(),
            })?;
        }

        let defaults = TransportConfig::default();
        client.transport = TransportConfig {
            tls: TlsMode::from_verify(settings.ssl_verify.unwrap_or(true)),
            timeout: settings
                .timeout
                .map_or(defaults.timeout, Duration::from_secs),
            write_timeout: settings
                .write_timeout
                .map_or(defaults.write_timeout, Duration::from_secs),
            proxy: settings.proxy.clone(),
            ..defaults
        };
        client.session_dir.clone_from(&config.session_path);
        client.base_url = self.parse_url("base_url", settings.base_url.as_deref())?;
        client.auth_url = self.parse_url("auth_url", settings.auth_url.as_deref())?;
        Ok(client)
    }

    fn credentials(
        &self,
        config: &Config,
        secrets: &SecretResolver<'_>,
    ) -> Result<Credentials, ConfigError> {
        let missing = || ConfigError::NoCredentials {
            asset: self.name.clone(),
        };
        let fallback = &config.credentials;

        if self.kind == AssetType::FortiGate {
            let token = secrets
                .resolve(
                    &self.name,
                    "token",
                    self.settings.token.as_ref(),
                    fallback.token.as_ref(),
                )
                .ok_or_else(missing)?;
            return Ok(Credentials::ApiKey(token));
        }

        let username = self
            .settings
            .username
            .clone()
            .or_else(|| fallback.username.clone())
            .ok_or_else(missing)?;
        let password = secrets
            .resolve(
                &self.name,
                "password",
                self.settings.password.as_ref(),
                fallback.password.as_ref(),
            )
            .ok_or_else(missing)?;
        Ok(Credentials::UserPassword { username, password })
    }

    fn parse_url(&self, field: &str, value: Option<&str>) -> Result<Option<Url>, ConfigError> {
        value
            .map(|raw| {
                Url::parse(raw).map_err(|e| ConfigError::Validation {
                    field: format!("assets.{}.{field}", self.name),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }
}
