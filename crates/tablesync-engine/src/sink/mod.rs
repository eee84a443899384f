//! Record sinks
//!
//! A [`SinkFactory`] opens one [`RecordSink`] per job once the output schema
//! is known. The sink accepts records in order and makes them durable when
//! closed.

mod memory;
mod parquet;

pub use self::memory::MemorySink;
pub use self::parquet::{arrow_schema, ParquetSinkFactory};

use tablesync_core::{OutputSchema, Record, ScanError};

/// Sink error types
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("Record rejected: {0}")]
    Schema(#[from] ScanError),

    #[error("Sink error: {0}")]
    Other(String),
}

/// Ordered, append-only destination for the records of one job
pub trait RecordSink {
    /// Append one record. The record must conform to the schema the sink was
    /// opened with.
    fn write(&mut self, record: &Record) -> Result<(), SinkError>;

    /// Flush buffered records and release the destination. Every record
    /// accepted by `write` is durable once this returns `Ok`.
    fn close(self: Box<Self>) -> Result<(), SinkError>;
}

/// Opens sinks for a given output schema
pub trait SinkFactory {
    /// Open a sink for records of `schema`. `shard_size` is the number of
    /// records per row group; sinks without row groups ignore it.
    fn open(&self, schema: &OutputSchema, shard_size: usize)
        -> Result<Box<dyn RecordSink>, SinkError>;
}
