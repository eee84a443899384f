//! Configuration schema (tablesync.toml)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extraction method for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMethod {
    /// Extract every row of the table
    #[serde(alias = "FULL_EXTRACT")]
    FullExtract,
}

impl ExtractMethod {
    /// Tag reported back to the caller on success
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullExtract => "FULL_EXTRACT",
        }
    }
}

impl Default for ExtractMethod {
    fn default() -> Self {
        Self::FullExtract
    }
}

impl fmt::Display for ExtractMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FULL_EXTRACT" => Ok(Self::FullExtract),
            other => Err(ConfigError::InvalidValue(format!(
                "Unsupported extract method: {}",
                other
            ))),
        }
    }
}

/// What to extract and where to write it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Table name, optionally schema-qualified (`SCHEMA.TABLE`)
    pub table: String,

    /// Extraction method
    #[serde(default)]
    pub method: ExtractMethod,

    /// Records per row group of the columnar output
    #[serde(default = "default_shard_size")]
    pub shard_size: usize,

    /// Output file; defaults to `<table>.parquet`
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_shard_size() -> usize {
    10_000
}

impl JobConfig {
    /// Create a full-extract job for a table with default settings
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            method: ExtractMethod::default(),
            shard_size: default_shard_size(),
            output: None,
        }
    }

    /// Resolve the output file path
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.parquet", self.table)))
    }
}

/// Oracle connection settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub host: String,

    #[serde(default = "default_oracle_port")]
    pub port: u16,

    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Instance SID
    #[serde(default)]
    pub sid: Option<String>,

    /// Service name, used when no SID is given
    #[serde(default)]
    pub service_name: Option<String>,

    /// ODBC driver name override
    #[serde(default)]
    pub driver: Option<String>,
}

fn default_oracle_port() -> u16 {
    1521
}

impl OracleConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            sid: None,
            service_name: None,
            driver: None,
        }
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("sid", &self.sid)
            .field("service_name", &self.service_name)
            .field("driver", &self.driver)
            .finish()
    }
}

/// DB2 for LUW connection settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Db2Config {
    pub host: String,

    #[serde(default = "default_db2_port")]
    pub port: u16,

    pub database: String,

    pub user: String,

    #[serde(default)]
    pub password: String,

    /// ODBC driver name override
    #[serde(default)]
    pub driver: Option<String>,
}

fn default_db2_port() -> u16 {
    50000
}

impl Db2Config {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: password.into(),
            driver: None,
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }
}

impl fmt::Debug for Db2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db2Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("driver", &self.driver)
            .finish()
    }
}

/// Source database connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Oracle(OracleConfig),
    Db2(Db2Config),
}

impl SourceConfig {
    /// Dialect name of this source
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Oracle(_) => "oracle",
            Self::Db2(_) => "db2",
        }
    }

    /// Password currently configured for the source
    pub fn password(&self) -> &str {
        match self {
            Self::Oracle(c) => &c.password,
            Self::Db2(c) => &c.password,
        }
    }

    /// Replace the source password
    pub fn set_password(&mut self, password: impl Into<String>) {
        match self {
            Self::Oracle(c) => c.password = password.into(),
            Self::Db2(c) => c.password = password.into(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub job: JobConfig,
    pub source: SourceConfig,
}

impl Config {
    pub fn new(job: JobConfig, source: SourceConfig) -> Self {
        Self { job, source }
    }

    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check the values a job cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.job.table.trim().is_empty() {
            return Err(ConfigError::InvalidValue("job.table must not be empty".to_string()));
        }

        if self.job.shard_size == 0 {
            return Err(ConfigError::InvalidValue(
                "job.shard_size must be a positive integer".to_string(),
            ));
        }

        match &self.source {
            SourceConfig::Oracle(c) => {
                if c.sid.is_none() && c.service_name.is_none() {
                    return Err(ConfigError::InvalidValue(
                        "oracle source requires either sid or service_name".to_string(),
                    ));
                }
            }
            SourceConfig::Db2(c) => {
                if c.database.trim().is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "db2 source requires a database".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),
}
