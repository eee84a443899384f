//! tablesync core
//!
//! Core domain model shared by the dialects, the extraction engine and the CLI:
//! column metadata, the output schema, schema-driven records, configuration
//! and lifecycle events.

pub mod schema;
pub mod record;
pub mod config;
pub mod event;

pub use schema::{
    ColumnMetadata, Field, OutputSchema, ValueType, AUDIT_COLUMN, EXCLUDED_MARKERS,
    ROW_HASH_COLUMN, is_excluded,
};
pub use record::{Record, ScanError, SourceRow, Value};
pub use config::{Config, ConfigError, Db2Config, ExtractMethod, JobConfig, OracleConfig, SourceConfig};
pub use event::{EventSink, EventType, NoopEventSink, SyncEvent, TracingEventSink, SCHEMA_VERSION};
