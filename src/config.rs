//! Configuration management for RAX File Manager
//!
//! Everything here is startup configuration: the root directory in particular
//! is fixed for the lifetime of the process and handed to the sandbox once.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Locations searched for `config.toml`, in increasing priority
const CONFIG_PATHS: [&str; 2] = [
    "rax-file-manager/config", // Docker production: /app/rax-file-manager/config.toml
    "config",                  // Local development: ./config.toml
];

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    // ═══ NETWORK (Environment Override Supported) ═══
    /// IP address the HTTP listener binds to
    pub bind_address: String,

    /// Port for the HTTP listener
    pub port: u16,

    // ═══ STORAGE ═══
    /// Root directory exposed to clients
    /// Environment: RAX_FILES_SERVER_ROOT
    pub server_root: String,

    /// Maximum upload request size in MB
    /// Environment: RAX_FILES_MAX_UPLOAD_SIZE_MB
    pub max_upload_size_mb: u64,

    // ═══ DIAGNOSTICS ═══
    /// Use `debug` instead of `info` as the default log level
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            server_root: "uploads".to_string(),
            max_upload_size_mb: 100,
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml (optional) with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("server_root", defaults.server_root)?
            .set_default("max_upload_size_mb", defaults.max_upload_size_mb as i64)?
            .set_default("debug", defaults.debug)?;

        for config_path in CONFIG_PATHS {
            builder = builder.add_source(File::with_name(config_path).required(false));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("RAX_FILES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if self.server_root.trim().is_empty() {
            return Err(ConfigError::Message("server_root cannot be empty".into()));
        }

        if self.max_upload_size_mb == 0 {
            return Err(ConfigError::Message(
                "max_upload_size_mb must be greater than 0".into(),
            ));
        }

        self.socket_addr()?;
        Ok(())
    }

    /// Bind address and port as a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                ConfigError::Message(format!(
                    "invalid bind address {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })
    }

    /// Get server root as PathBuf
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    /// Get maximum upload size in bytes
    pub fn max_upload_size_bytes(&self) -> usize {
        usize::try_from(self.max_upload_size_mb)
            .unwrap_or(usize::MAX)
            .saturating_mul(1024 * 1024)
    }

    /// Default log filter when RUST_LOG is unset
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}
