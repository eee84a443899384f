//! tablesync engine - extraction pipeline
//!
//! This crate implements the extraction logic:
//! - Output schema construction
//! - The sync job state machine (connect, introspect, query, stream, close)
//! - Columnar sinks (Parquet, in-memory)

pub mod error;
pub mod job;
pub mod pipeline;
pub mod schema_builder;
pub mod sink;

pub use error::{ErrorKind, SyncError};
pub use job::{JobState, SyncJob};
pub use pipeline::{plan_sync_job, run_sync_job, ExtractionPlan, SyncReport};
pub use schema_builder::{build_schema, SchemaConflict};
pub use sink::{MemorySink, ParquetSinkFactory, RecordSink, SinkError, SinkFactory};
