use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::db::{ConnectionConfig, LogStore, DEFAULT_LOG_CAPACITY};
use crate::sql::Dialect;

pub const DEFAULT_PAGE_LIMIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_dialect: Dialect,
    /// Rows per page when browsing a table.
    pub page_limit: u64,
    /// Log entries kept per connection; 0 keeps everything.
    pub log_capacity: usize,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    pub connections: Vec<ConnectionConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_dialect: Dialect::Postgres,
            page_limit: DEFAULT_PAGE_LIMIT,
            log_capacity: DEFAULT_LOG_CAPACITY,
            log_filter: None,
            connections: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("polysql")
            .join("config.toml")
    }

    /// Load from the default location, falling back to defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Look up a saved connection by id, then by case-insensitive name.
    pub fn connection(&self, key: &str) -> Option<&ConnectionConfig> {
        self.connections
            .iter()
            .find(|c| c.id == key)
            .or_else(|| self.connections.iter().find(|c| c.name.eq_ignore_ascii_case(key)))
    }

    pub fn log_store(&self) -> LogStore {
        LogStore::with_capacity(Some(self.log_capacity).filter(|&cap| cap > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
default_dialect = "mysql"

[[connections]]
id = "local"
name = "Local PG"
dialect = "postgres"
connection_string = "host=localhost user=postgres"
"#,
        )
        .unwrap();
        assert_eq!(config.default_dialect, Dialect::MySql);
        assert_eq!(config.page_limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(config.log_capacity, DEFAULT_LOG_CAPACITY);
        assert_eq!(config.connection("local").unwrap().name, "Local PG");
        assert_eq!(config.connection("local pg").unwrap().id, "local");
        assert!(config.connection("other").is_none());
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("polysql-test-missing").join("config.toml");
        assert_eq!(AppConfig::load_from(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("polysql-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");
        let mut config = AppConfig {
            log_filter: Some("polysql=debug".into()),
            ..Default::default()
        };
        config
            .connections
            .push(ConnectionConfig::new("ch", Dialect::ClickHouse, "http://localhost:8123"));

        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let config = AppConfig {
            log_capacity: 0,
            ..Default::default()
        };
        let store = config.log_store();
        for i in 0..(DEFAULT_LOG_CAPACITY + 5) {
            store.append("c", &format!("SELECT {}", i), &[]);
        }
        assert_eq!(store.entries("c").len(), DEFAULT_LOG_CAPACITY + 5);
    }
}
