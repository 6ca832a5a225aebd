//! Configuration resolution for Pebble.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`$XDG_CONFIG_HOME/pebble/settings.json`)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (`PEBBLE_*`)
//! 5. CLI arguments (applied by the binary, highest priority)
//!
//! Files are merged as JSON objects before deserialization, so a file only
//! needs to name the keys it changes.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Complete Pebble configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP listener and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            database_path: None,
            max_body_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl ServerConfig {
    /// Configured database path, or the platform default.
    pub fn database_path_or_default(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(database_path)
    }
}

/// Blockchain RPC settings for the ownership oracle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
    pub rpc_endpoint: String,
    /// ioID token contract (ERC-721, `ownerOf`).
    pub ioid_contract: Option<String>,
    /// ioID registry contract (`deviceTokenId`).
    pub ioid_registry_contract: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: "https://babel-api.mainnet.iotex.io".to_string(),
            ioid_contract: None,
            ioid_registry_contract: None,
            request_timeout_secs: 10,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is not set.
    pub filter: String,
    /// Emit JSON log lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "pebble_server=info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Check that every setting the server cannot start without is present.
    pub fn validate(&self) -> Result<()> {
        if self.chain.rpc_endpoint.is_empty() {
            return Err(Error::Config("chain.rpc_endpoint is empty".into()));
        }
        if self.chain.ioid_contract.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Config("chain.ioid_contract is not set".into()));
        }
        if self
            .chain
            .ioid_registry_contract
            .as_deref()
            .unwrap_or("")
            .is_empty()
        {
            return Err(Error::Config(
                "chain.ioid_registry_contract is not set".into(),
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(Error::Config("server.max_body_bytes must be > 0".into()));
        }
        Ok(())
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` must exist when given; the global file is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            merge_json(&mut merged, load_config_value(&global_path)?);
        }
    }

    if let Some(path) = explicit {
        merge_json(&mut merged, load_config_value(path)?);
    }

    let mut config: Config = serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pebble").join("settings.json"))
}

/// Get the default database path.
pub fn database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("pebble").join("pebble.db"))
}

fn load_config_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Recursively overlay `overlay` onto `base`. Objects merge key by key,
/// everything else replaces.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("PEBBLE_LISTEN_ADDR") {
        config.server.listen_addr = val
            .parse()
            .map_err(|e| Error::Config(format!("PEBBLE_LISTEN_ADDR: {e}")))?;
    }
    if let Some(val) = lookup("PEBBLE_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("PEBBLE_CHAIN_ENDPOINT") {
        config.chain.rpc_endpoint = val;
    }
    if let Some(val) = lookup("PEBBLE_IOID_CONTRACT") {
        config.chain.ioid_contract = Some(val);
    }
    if let Some(val) = lookup("PEBBLE_IOID_REGISTRY_CONTRACT") {
        config.chain.ioid_registry_contract = Some(val);
    }
    if let Some(val) = lookup("PEBBLE_LOG_FILTER") {
        config.log.filter = val;
    }
    if let Some(val) = lookup("PEBBLE_LOG_JSON") {
        config.log.json = matches!(val.as_str(), "1" | "true" | "yes");
    }
    Ok(())
}
