//! Server settings read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{EngineError, EngineResult};
use crate::logging::LogFormat;

/// Environment variable naming the rule data directory.
pub const CONFIG_DIR_VAR: &str = "STATUTORY_CONFIG_DIR";
/// Environment variable naming the listen address.
pub const BIND_ADDR_VAR: &str = "STATUTORY_BIND_ADDR";
/// Environment variable selecting the log format ("json" or "compact").
pub const LOG_FORMAT_VAR: &str = "STATUTORY_LOG_FORMAT";

const DEFAULT_CONFIG_DIR: &str = "./config";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Settings of the `statutory-engine` server binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Root directory holding one rule directory per country.
    pub config_dir: PathBuf,
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,
    /// Log output format.
    pub log_format: LogFormat,
}

impl ServerSettings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the settings through `lookup`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigParseError`] if the bind address is not a
    /// valid socket address.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let config_dir = lookup(CONFIG_DIR_VAR).unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string());
        let bind_addr = lookup(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let log_format = lookup(LOG_FORMAT_VAR)
            .map(|name| LogFormat::from_name(&name))
            .unwrap_or(LogFormat::Compact);

        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| EngineError::ConfigParseError {
                path: BIND_ADDR_VAR.to_string(),
                message: format!("'{}': {}", bind_addr, e),
            })?;

        Ok(Self {
            config_dir: PathBuf::from(config_dir),
            bind_addr,
            log_format,
        })
    }
}
