//! Configuration shared by the node binary and the CLI.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use vlei_core::ProtocolConfig;
use vlei_credentials::FlowVariant;

/// Top-level `vlei.toml`. Every section and field may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Agent endpoints, witnesses and polling budgets.
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub setup: SetupConfig,
}

/// Where the verification API binds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Holds identities.json, credentials.json, registries.json and
    /// connections.json.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_filter")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    #[serde(default = "default_plan_path")]
    pub plan_path: PathBuf,
    /// Issuance topology for setup, and the chain shape verification expects.
    #[serde(default)]
    pub flow: FlowVariant,
}

fn default_listen_addr() -> String {
    String::from("127.0.0.1")
}

fn default_port() -> u16 {
    9001
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_filter() -> String {
    String::from("info")
}

fn default_plan_path() -> PathBuf {
    PathBuf::from("config/setup-plan.toml")
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_filter(),
            format: LogFormat::default(),
        }
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            plan_path: default_plan_path(),
            flow: FlowVariant::default(),
        }
    }
}

impl NodeConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)
            .with_context(|| format!("writing config {}", path.display()))
    }

    pub fn api_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.api.listen_addr, self.api.port);
        addr.parse()
            .with_context(|| format!("invalid API address {}", addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.api_addr().unwrap().port(), 9001);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.setup.flow, FlowVariant::Official);
        assert_eq!(config.protocol.operation_timeout_ms, 120_000);
        assert_eq!(config.protocol.witness_policy.threshold, 1);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = NodeConfig::load(Path::new("/nonexistent/vlei.toml")).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_saved_config_reloads() {
        let dir = std::env::temp_dir().join(format!("vlei-config-{}", rand::random::<u64>()));
        let path = dir.join("vlei.toml");
        let mut config = NodeConfig::default();
        config.setup.flow = FlowVariant::Direct;
        config.logging.format = LogFormat::Json;
        config.save(&path).unwrap();

        let reloaded = NodeConfig::load(&path).unwrap();
        assert_eq!(reloaded.setup.flow, FlowVariant::Direct);
        assert_eq!(reloaded.logging.format, LogFormat::Json);
        assert_eq!(reloaded.protocol, config.protocol);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_sections() {
        let config: NodeConfig = toml::from_str(
            r#"
[setup]
flow = "direct"

[logging]
format = "json"

[protocol]
operation_timeout_ms = 5000

[protocol.record_retry]
attempts = 3
delay_ms = 100
"#,
        )
        .unwrap();
        assert_eq!(config.setup.flow, FlowVariant::Direct);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.protocol.operation_timeout_ms, 5000);
        assert_eq!(config.protocol.record_retry.attempts, 3);
        assert_eq!(config.protocol.notification_retry.attempts, 5);
        assert_eq!(config.api.port, 9001);
    }

    #[test]
    fn test_bad_listen_addr() {
        let mut config = NodeConfig::default();
        config.api.listen_addr = "not an address".into();
        assert!(config.api_addr().is_err());
    }

    #[test]
    fn test_unknown_flow_rejected() {
        assert!(toml::from_str::<NodeConfig>("[setup]\nflow = \"sideways\"\n").is_err());
    }
}
