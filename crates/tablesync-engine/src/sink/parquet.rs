//! Parquet file sink
//!
//! Records are buffered into Arrow column builders and written as one row
//! group per `shard_size` records. Float64 fields become `DOUBLE` columns and
//! String fields become `UTF8` columns; optional fields are nullable.

use super::{RecordSink, SinkError, SinkFactory};
use arrow_array::builder::{Float64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tablesync_core::{Field as OutputField, OutputSchema, Record, ScanError, Value, ValueType};

/// Upper bound on rows preallocated per column builder
const MAX_PREALLOCATED_ROWS: usize = 8192;

/// Arrow schema for an output schema, field for field
pub fn arrow_schema(schema: &OutputSchema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            let data_type = match f.value_type {
                ValueType::Float64 => DataType::Float64,
                ValueType::String => DataType::Utf8,
            };
            Field::new(f.name.as_str(), data_type, f.optional)
        })
        .collect();

    Schema::new(fields)
}

/// Writes each job to a single Parquet file
#[derive(Debug, Clone)]
pub struct ParquetSinkFactory {
    path: PathBuf,
    compression: Compression,
}

impl ParquetSinkFactory {
    /// Snappy-compressed output at `path`. An existing file is replaced.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            compression: Compression::SNAPPY,
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SinkFactory for ParquetSinkFactory {
    fn open(
        &self,
        schema: &OutputSchema,
        shard_size: usize,
    ) -> Result<Box<dyn RecordSink>, SinkError> {
        let row_group_size = shard_size.max(1);
        let arrow_schema: SchemaRef = Arc::new(arrow_schema(schema));

        let file = File::create(&self.path)?;
        let sync_handle = file.try_clone()?;

        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(row_group_size)
            .build();
        let writer = ArrowWriter::try_new(file, Arc::clone(&arrow_schema), Some(props))?;

        tracing::debug!(
            "Opened Parquet sink {} ({} fields, {} records per row group)",
            self.path.display(),
            schema.len(),
            row_group_size
        );

        Ok(Box::new(ParquetSink {
            path: self.path.clone(),
            schema: schema.clone(),
            columns: schema
                .fields()
                .iter()
                .map(|f| ColumnBuilder::new(f, row_group_size))
                .collect(),
            arrow_schema,
            writer,
            sync_handle,
            buffered: 0,
            row_group_size,
        }))
    }
}

enum Builder {
    Float64(Float64Builder),
    String(StringBuilder),
}

/// Arrow builder for one output field
struct ColumnBuilder {
    name: String,
    optional: bool,
    builder: Builder,
}

impl ColumnBuilder {
    fn new(field: &OutputField, capacity: usize) -> Self {
        let builder = match field.value_type {
            ValueType::Float64 => Builder::Float64(Float64Builder::with_capacity(capacity.min(MAX_PREALLOCATED_ROWS))),
            ValueType::String => Builder::String(StringBuilder::new()),
        };
        Self {
            name: field.name.clone(),
            optional: field.optional,
            builder,
        }
    }

    /// Append one value; nothing is appended when it does not fit the field
    fn append(&mut self, value: &Value) -> Result<(), ScanError> {
        match (&mut self.builder, value) {
            (Builder::Float64(b), Value::Float64(v)) => b.append_value(*v),
            (Builder::String(b), Value::String(s)) => b.append_value(s),
            (Builder::Float64(b), Value::Null) if self.optional => b.append_null(),
            (Builder::String(b), Value::Null) if self.optional => b.append_null(),
            (_, Value::Null) => {
                return Err(ScanError::NullInRequiredField {
                    field: self.name.clone(),
                })
            }
            (Builder::Float64(_), _) => {
                return Err(ScanError::TypeMismatch {
                    field: self.name.clone(),
                    expected: ValueType::Float64,
                })
            }
            (Builder::String(_), _) => {
                return Err(ScanError::TypeMismatch {
                    field: self.name.clone(),
                    expected: ValueType::String,
                })
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        match &mut self.builder {
            Builder::Float64(b) => Arc::new(b.finish()),
            Builder::String(b) => Arc::new(b.finish()),
        }
    }
}

struct ParquetSink {
    path: PathBuf,
    schema: OutputSchema,
    arrow_schema: SchemaRef,
    columns: Vec<ColumnBuilder>,
    writer: ArrowWriter<File>,
    sync_handle: File,
    buffered: usize,
    row_group_size: usize,
}

impl ParquetSink {
    /// Write buffered records as one row group
    fn flush_row_group(&mut self) -> Result<(), SinkError> {
        if self.buffered == 0 {
            return Ok(());
        }

        let arrays: Vec<ArrayRef> = self.columns.iter_mut().map(ColumnBuilder::finish).collect();
        let batch = RecordBatch::try_new(Arc::clone(&self.arrow_schema), arrays)?;

        self.writer.write(&batch)?;
        self.writer.flush()?;

        tracing::trace!("Flushed row group of {} records", self.buffered);
        self.buffered = 0;
        Ok(())
    }
}

impl RecordSink for ParquetSink {
    fn write(&mut self, record: &Record) -> Result<(), SinkError> {
        record.conforms_to(&self.schema)?;

        for (column, value) in self.columns.iter_mut().zip(record.values()) {
            column.append(value)?;
        }
        self.buffered += 1;

        if self.buffered >= self.row_group_size {
            self.flush_row_group()?;
        }
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), SinkError> {
        self.flush_row_group()?;

        let ParquetSink {
            path,
            writer,
            sync_handle,
            ..
        } = *self;

        writer.close()?;
        sync_handle.sync_all()?;

        tracing::debug!("Closed Parquet sink {}", path.display());
        Ok(())
    }
}
