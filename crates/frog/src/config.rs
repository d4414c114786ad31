//! Configuration management for the `frog` binary.
//!
//! Loads the TOML file, applies defaults for missing sections and converts the
//! result into the library configuration types of the server and the client.

use frog_client::ConnectionConfig;
use frog_map::MapConfig;
use frog_server::{available_handlers, ServerConfig, DEFAULT_HANDLERS};
use frog_types::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub plugins: PluginSettings,
    #[serde(default)]
    pub client: ConnectionConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Network and scheduling settings of the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    pub max_connections: usize,
    /// Worker pool size, 0 for one worker per CPU
    pub worker_threads: usize,
    /// World tick interval in milliseconds (0 to disable)
    pub tick_interval_ms: u64,
    /// Read timeout of connection sockets in milliseconds
    pub read_poll_interval_ms: u64,
    /// How long a reply write may block before the client is dropped
    pub write_timeout_ms: u64,
    /// Replies queued per connection before a slow client is dropped
    pub outbox_capacity: usize,
    /// Longest request line accepted
    pub max_line_bytes: usize,
    pub protocol_version: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind_address: defaults.bind_address.to_string(),
            max_connections: defaults.max_connections,
            worker_threads: defaults.worker_threads,
            tick_interval_ms: defaults.tick_interval_ms,
            read_poll_interval_ms: defaults.read_poll_interval_ms,
            write_timeout_ms: defaults.write_timeout_ms,
            outbox_capacity: defaults.outbox_capacity,
            max_line_bytes: defaults.max_line_bytes,
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }
}

/// Which request handlers the server loads, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub handlers: Vec<String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            handlers: DEFAULT_HANDLERS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Checks the values the server cannot start with.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", self.server.bind_address));
        }

        if self.server.outbox_capacity == 0 || self.server.max_line_bytes == 0 {
            return Err("outbox_capacity and max_line_bytes must be positive".to_string());
        }

        if self.map.chunk_columns == 0 || self.map.chunk_rows == 0 {
            return Err("Chunk size must be at least one tile in each direction".to_string());
        }
        if self.map.layers == 0 {
            return Err("The map needs at least one layer".to_string());
        }
        if self.map.max_chunk_columns == 0 || self.map.max_chunk_rows == 0 {
            return Err("The chunk grid limit must allow at least one chunk".to_string());
        }
        let (width, height) = self.map.tile_extent();
        if width > u32::MAX as usize || height > u32::MAX as usize {
            return Err(format!("Map extent {width}x{height} exceeds the tile coordinate range"));
        }

        if self.plugins.handlers.is_empty() {
            return Err("At least one handler must be configured".to_string());
        }
        let known = available_handlers();
        if let Some(unknown) = self.plugins.handlers.iter().find(|h| !known.contains(&h.as_str())) {
            return Err(format!("Unknown handler: {unknown}. Available: {known:?}"));
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LEVELS:?}",
                self.logging.level
            ));
        }

        Ok(())
    }

    pub fn to_server_config(&self) -> anyhow::Result<ServerConfig> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            worker_threads: self.server.worker_threads,
            tick_interval_ms: self.server.tick_interval_ms,
            read_poll_interval_ms: self.server.read_poll_interval_ms,
            write_timeout_ms: self.server.write_timeout_ms,
            outbox_capacity: self.server.outbox_capacity,
            max_line_bytes: self.server.max_line_bytes,
            protocol_version: self.server.protocol_version.clone(),
            map: self.map,
            handlers: self.plugins.handlers.clone(),
        })
    }

    pub fn to_connection_config(&self) -> ConnectionConfig {
        self.client.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let server = config.to_server_config().unwrap();
        assert_eq!(server.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(server.max_connections, 1000);
        assert_eq!(server.tick_interval_ms, 50);
        assert_eq!(server.handlers, DEFAULT_HANDLERS);
        assert_eq!(server.outbox_capacity, 256);
        assert_eq!(server.map.max_chunk_rows, 256);

        let client = config.to_connection_config();
        assert_eq!(client.dial_retries, 10);
        assert_eq!(client.retry_delay_ms, 1000);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.outbox_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.map.chunk_rows = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.map.layers = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.map.max_chunk_rows = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.map.max_chunk_columns = usize::MAX;
        assert!(config.validate().unwrap_err().contains("extent"));

        let mut config = AppConfig::default();
        config.plugins.handlers.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.plugins.handlers.push("weather".to_string());
        assert!(config.validate().unwrap_err().contains("weather"));

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frog.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frog.toml");
        tokio::fs::write(
            &path,
            r#"
[server]
bind_address = "0.0.0.0:3000"
worker_threads = 4
tick_interval_ms = 0

[map]
tile_width = 16
tile_height = 16
chunk_columns = 8
chunk_rows = 8
layers = 2

[plugins]
handlers = ["protocol_version", "connect"]

[client]
dial_retries = 3

[logging]
level = "debug"
json_format = true
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.map.layers, 2);
        assert_eq!(config.plugins.handlers, vec!["protocol_version", "connect"]);
        assert_eq!(config.client.dial_retries, 3);
        assert_eq!(config.client.retry_delay_ms, 1000);
        assert!(config.logging.json_format);

        let server = config.to_server_config().unwrap();
        assert_eq!(server.worker_threads, 4);
        assert!(server.tick_interval().is_none());
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        tokio::fs::write(&path, "[server\nbind_address = 1").await.unwrap();

        assert!(AppConfig::load_from_file(&path).await.is_err());
    }
}
