//! Configuration for the fortikit CLI.
//!
//! `config.toml` (layered with defaults and `FORTIKIT_` environment
//! variables), the asset inventory, and credential resolution into
//! `fortikit_api::ClientConfig` values.

mod inventory;

use std::fmt;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use inventory::{Asset, AssetSettings, AssetType, Inventory, SecretResolver};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for asset '{asset}'")]
    NoCredentials { asset: String },

    #[error("asset '{name}' not found in inventory")]
    AssetNotFound { name: String },

    #[error("asset '{name}' is a {actual}, not a {expected}")]
    WrongAssetType {
        name: String,
        expected: AssetType,
        actual: AssetType,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: Box<toml::de::Error>,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config ──────────────────────────────────────────────────────────

/// Tool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Inventory file. Relative paths are resolved against the directory
    /// of the config file.
    #[serde(default = "default_inventory")]
    pub inventory: PathBuf,

    /// Directory for persisted session records. Unset disables persistence.
    pub session_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Fallback credentials for assets that define none.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(skip)]
    source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    /// Additional log file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    /// Plaintext password (prefer the keyring or environment).
    pub password: Option<String>,
    /// Plaintext API token (prefer the keyring or environment).
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inventory: default_inventory(),
            session_path: None,
            logging: LoggingConfig::default(),
            credentials: CredentialsConfig::default(),
            source: None,
        }
    }
}

fn default_inventory() -> PathBuf {
    PathBuf::from("inventory.toml")
}

fn default_level() -> String {
    "info".into()
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "fortikit", "fortikit").map_or_else(
        || PathBuf::from("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: PathBuf) -> PathBuf {
    let expanded = path
        .strip_prefix("~")
        .ok()
        .zip(BaseDirs::new())
        .map(|(rest, dirs)| dirs.home_dir().join(rest));
    expanded.unwrap_or(path)
}

impl Config {
    /// Load defaults, then `path` (or the platform config file), then
    /// `FORTIKIT_*` environment variables. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(config_path, Path::to_path_buf);
        if path.is_dir() {
            return Err(ConfigError::Validation {
                field: "config".into(),
                reason: format!("{} is a directory", path.display()),
            });
        }

        let mut config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("FORTIKIT_").split("__"))
            .extract()?;

        config.session_path = config.session_path.map(expand_home);
        config.logging.file = config.logging.file.map(expand_home);
        if path.is_file() {
            config.source = Some(path);
        }
        Ok(config)
    }

    /// The file this config was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Inventory location with relative paths anchored at the config file.
    pub fn inventory_path(&self) -> PathBuf {
        if self.inventory.is_relative() {
            if let Some(dir) = self.source.as_deref().and_then(Path::parent) {
                return dir.join(&self.inventory);
            }
        }
        self.inventory.clone()
    }

    /// Every option with its effective value, secrets redacted.
    pub fn entries(&self) -> Vec<ConfigEntry> {
        let path = |p: Option<&Path>| p.map(|p| p.display().to_string());
        vec![
            ConfigEntry::plain("config", path(self.source())),
            ConfigEntry::plain("inventory", path(Some(&self.inventory_path()))),
            ConfigEntry::plain("session_path", path(self.session_path.as_deref())),
            ConfigEntry::plain("logging.level", Some(self.logging.level.clone())),
            ConfigEntry::plain("logging.file", path(self.logging.file.as_deref())),
            ConfigEntry::plain("credentials.username", self.credentials.username.clone()),
            ConfigEntry::secret("credentials.password", self.credentials.password.as_deref()),
            ConfigEntry::secret("credentials.token", self.credentials.token.as_deref()),
        ]
    }
}

// ── Config entries ──────────────────────────────────────────────────

/// One config option as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: Option<String>,
    pub secret: bool,
}

impl ConfigEntry {
    pub fn plain(key: &'static str, value: Option<String>) -> Self {
        Self {
            key,
            value,
            secret: false,
        }
    }

    /// A secret option; the stored value is already redacted.
    pub fn secret(key: &'static str, value: Option<&str>) -> Self {
        Self {
            key,
            value: value.map(redact),
            secret: true,
        }
    }
}

impl fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(ref value) => write!(f, "{}: {value}", self.key),
            None => write!(f, "{}: -", self.key),
        }
    }
}

/// Keep the first and last four characters of a secret.
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
