//! Configuration: the table catalog plus server and client settings.
//!
//! ```toml
//! tables = ["PENGUMUMAN", "UANG KAS", "IURAN BULANAN", "JADWAL RONDA"]
//! boolean_tables = ["IURAN BULANAN", "JADWAL RONDA"]
//!
//! [headers]
//! "JADWAL RONDA" = ["Nama", "Hari", "Status"]
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! data_file = "sheetbridge-data.json"
//!
//! [client]
//! api_url = "http://127.0.0.1:8080/"
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "SHEETBRIDGE_CONFIG";
/// Configuration file used when [`CONFIG_ENV`] is unset
pub const DEFAULT_CONFIG_FILE: &str = "sheetbridge.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The fixed set of valid tables and the subset rendered as boolean tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCatalog {
    tables: Vec<String>,
    boolean_tables: Vec<String>,
}

impl TableCatalog {
    pub fn new<S: Into<String>>(tables: impl IntoIterator<Item = S>) -> Self {
        TableCatalog {
            tables: tables.into_iter().map(Into::into).collect(),
            boolean_tables: Vec::new(),
        }
    }

    pub fn with_boolean_tables<S: Into<String>>(mut self, tables: impl IntoIterator<Item = S>) -> Self {
        self.boolean_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t == name)
    }

    pub fn is_boolean(&self, name: &str) -> bool {
        self.boolean_tables.iter().any(|t| t == name)
    }

    pub fn first(&self) -> Option<&str> {
        self.tables.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Workbook file; the workbook lives in memory only when unset
    pub data_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_url: "http://127.0.0.1:8080/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tables: Vec<String>,
    #[serde(alias = "booleanTables")]
    pub boolean_tables: Vec<String>,
    /// Header rows seeded into tables that do not exist yet
    pub headers: BTreeMap<String, Vec<String>>,
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Load from `$SHEETBRIDGE_CONFIG` (or `sheetbridge.toml`), then apply the
    /// `HOST` and `PORT` environment overrides.
    pub fn from_env() -> Result<Config, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::from_file(Path::new(&path))?;

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT must be a number, got {:?}", port)))?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tables.is_empty() {
            return Err(ConfigError::Invalid("at least one table is required".to_string()));
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if table.trim().is_empty() {
                return Err(ConfigError::Invalid("table names must not be blank".to_string()));
            }
            if !seen.insert(table.as_str()) {
                return Err(ConfigError::Invalid(format!("table \"{}\" is listed twice", table)));
            }
        }

        for table in &self.boolean_tables {
            if !seen.contains(table.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "boolean table \"{}\" is not one of the configured tables",
                    table
                )));
            }
        }

        for table in self.headers.keys() {
            if !seen.contains(table.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "headers given for unknown table \"{}\"",
                    table
                )));
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> TableCatalog {
        TableCatalog::new(self.tables.iter().cloned())
            .with_boolean_tables(self.boolean_tables.iter().cloned())
    }
}
