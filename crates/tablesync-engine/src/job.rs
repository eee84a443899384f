//! Sync job definition and lifecycle states

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tablesync_core::{Config, ConfigError, ExtractMethod};
use tablesync_dialect::{from_source_config, Dialect};

/// Records per row group when nothing else is configured
pub const DEFAULT_SHARD_SIZE: usize = 10_000;

/// One extraction of one table from one source
pub struct SyncJob {
    /// Table to extract, optionally schema-qualified
    pub table_name: String,
    pub method: ExtractMethod,
    /// Records per row group of the output
    pub shard_size: usize,
    pub dialect: Box<dyn Dialect>,
}

impl SyncJob {
    pub fn new(table_name: impl Into<String>, dialect: Box<dyn Dialect>) -> Self {
        Self {
            table_name: table_name.into(),
            method: ExtractMethod::default(),
            shard_size: DEFAULT_SHARD_SIZE,
            dialect,
        }
    }

    pub fn with_method(mut self, method: ExtractMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_shard_size(mut self, shard_size: usize) -> Self {
        self.shard_size = shard_size;
        self
    }

    /// Build a job from a validated config, picking the dialect from the
    /// source section
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self::new(config.job.table.clone(), from_source_config(&config.source))
            .with_method(config.job.method)
            .with_shard_size(config.job.shard_size))
    }

    /// Event payload identifying this job
    pub(crate) fn event_payload(&self) -> BTreeMap<String, String> {
        let mut payload = BTreeMap::new();
        payload.insert("table".to_string(), self.table_name.clone());
        payload.insert("method".to_string(), self.method.to_string());
        payload.insert("dialect".to_string(), self.dialect.name().to_string());
        payload
    }
}

impl fmt::Debug for SyncJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncJob")
            .field("table_name", &self.table_name)
            .field("method", &self.method)
            .field("shard_size", &self.shard_size)
            .field("dialect", &self.dialect.name())
            .finish()
    }
}

/// Where a running job is in its lifecycle
///
/// ```text
/// Idle -> Connected -> SchemaBuilt -> QueryBuilt -> Executing -> Streaming -> Closed
/// ```
///
/// Any error moves the job to `Failed`. Both `Closed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Connected,
    SchemaBuilt,
    QueryBuilt,
    Executing,
    Streaming,
    Closed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Closed | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Connected => "connected",
            JobState::SchemaBuilt => "schema_built",
            JobState::QueryBuilt => "query_built",
            JobState::Executing => "executing",
            JobState::Streaming => "streaming",
            JobState::Closed => "closed",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
