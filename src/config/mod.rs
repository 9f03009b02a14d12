//! Configuration management for modhost
//!
//! Handles configuration loading (TOML or JSON), environment overrides and
//! validation.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::http::server::DEFAULT_MAX_REQUEST_BYTES;
use crate::module::context::DEFAULT_JSON_BODY_LIMIT;
use crate::utils::env::{env_int, env_opt};

/// HTTP host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Listening address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Maximum size of any request body
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// Limit applied by the JSON body parser mounted on module prefixes
    #[serde(default = "default_json_body_limit")]
    pub json_body_limit: usize,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8570))
}

fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

fn default_json_body_limit() -> usize {
    DEFAULT_JSON_BODY_LIMIT
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_request_bytes: default_max_request_bytes(),
            json_body_limit: default_json_body_limit(),
        }
    }
}

/// Module system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// List of enabled modules (empty = every catalog module)
    #[serde(default)]
    pub enabled_modules: Vec<String>,

    /// Directory for module data (installer output, state)
    #[serde(default = "default_modules_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for module static assets
    #[serde(default = "default_modules_assets_dir")]
    pub assets_dir: PathBuf,

    /// Module-specific configuration overrides
    #[serde(default)]
    pub module_configs: HashMap<String, HashMap<String, String>>,
}

fn default_modules_data_dir() -> PathBuf {
    PathBuf::from("data/modules")
}

fn default_modules_assets_dir() -> PathBuf {
    PathBuf::from("modules")
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled_modules: Vec::new(),
            data_dir: default_modules_data_dir(),
            assets_dir: default_modules_assets_dir(),
            module_configs: HashMap::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "modhost=debug"
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Host configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub modules: ModuleConfig,

    pub logging: Option<LoggingConfig>,
}

impl HostConfig {
    /// Load configuration from a TOML or JSON file, chosen by extension
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON config {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("invalid TOML config {}", path.display()))?,
        };
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `MODHOST_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Some(addr) = env_opt("MODHOST_LISTEN_ADDR") {
            self.http.listen_addr = addr
                .parse()
                .with_context(|| format!("invalid MODHOST_LISTEN_ADDR: {}", addr))?;
        }
        if let Some(bytes) = env_int::<usize>("MODHOST_MAX_REQUEST_BYTES") {
            self.http.max_request_bytes = bytes;
        }
        if let Some(bytes) = env_int::<usize>("MODHOST_JSON_BODY_LIMIT") {
            self.http.json_body_limit = bytes;
        }
        if let Some(dir) = env_opt("MODHOST_DATA_DIR") {
            self.modules.data_dir = PathBuf::from(dir);
        }
        if let Some(list) = env_opt("MODHOST_ENABLED_MODULES") {
            self.modules.enabled_modules = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http.max_request_bytes == 0 {
            return Err(anyhow::anyhow!("max_request_bytes must be greater than 0"));
        }
        if self.http.json_body_limit == 0 {
            return Err(anyhow::anyhow!("json_body_limit must be greater than 0"));
        }
        if self.http.json_body_limit > self.http.max_request_bytes {
            return Err(anyhow::anyhow!(
                "json_body_limit ({}) cannot exceed max_request_bytes ({})",
                self.http.json_body_limit,
                self.http.max_request_bytes
            ));
        }
        if let Some(name) = self.modules.enabled_modules.iter().find(|n| n.trim().is_empty()) {
            return Err(anyhow::anyhow!("enabled_modules contains an empty name: {:?}", name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_KEYS: &[&str] = &[
        "MODHOST_LISTEN_ADDR",
        "MODHOST_MAX_REQUEST_BYTES",
        "MODHOST_JSON_BODY_LIMIT",
        "MODHOST_DATA_DIR",
        "MODHOST_ENABLED_MODULES",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.http.listen_addr.port(), 8570);
        assert_eq!(config.http.max_request_bytes, 1_048_576);
        assert_eq!(config.http.json_body_limit, 100 * 1024);
        assert_eq!(config.modules.data_dir, PathBuf::from("data/modules"));
        assert!(config.modules.enabled_modules.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("modhost.toml");
        std::fs::write(
            &path,
            r#"
[modules]
enabled_modules = ["echo"]

[modules.module_configs.echo]
greeting = "hi"
"#,
        )
        .unwrap();

        let config = HostConfig::from_file(&path).unwrap();
        assert_eq!(config.modules.enabled_modules, vec!["echo"]);
        assert_eq!(config.modules.module_configs["echo"]["greeting"], "hi");
        assert_eq!(config.http, HttpConfig::default());
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_json_file_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("modhost.json");

        let mut config = HostConfig::default();
        config.modules.enabled_modules = vec!["host".to_string()];
        config.logging = Some(LoggingConfig {
            filter: Some("debug".to_string()),
            json_format: false,
        });
        config.to_json_file(&path).unwrap();

        assert_eq!(HostConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "[http\nlisten_addr = ").unwrap();
        let err = HostConfig::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.toml"));
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let mut config = HostConfig::default();
        config.http.json_body_limit = config.http.max_request_bytes + 1;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.http.max_request_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("MODHOST_LISTEN_ADDR", "0.0.0.0:9000");
        std::env::set_var("MODHOST_JSON_BODY_LIMIT", "2048");
        std::env::set_var("MODHOST_ENABLED_MODULES", "echo, host,,");

        let mut config = HostConfig::default();
        config.apply_env_overrides().unwrap();
        clear_env();

        assert_eq!(config.http.listen_addr.port(), 9000);
        assert_eq!(config.http.json_body_limit, 2048);
        assert_eq!(config.modules.enabled_modules, vec!["echo", "host"]);
        assert_eq!(config.http.max_request_bytes, DEFAULT_MAX_REQUEST_BYTES);
    }

    #[test]
    #[serial]
    fn test_env_override_bad_addr() {
        clear_env();
        std::env::set_var("MODHOST_LISTEN_ADDR", "not-an-addr");
        let mut config = HostConfig::default();
        let result = config.apply_env_overrides();
        clear_env();
        assert!(result.is_err());
    }
}
