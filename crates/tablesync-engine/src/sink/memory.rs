//! In-memory sink
//!
//! Collects records in a shared buffer so a test (or a dry run) can inspect
//! what a job produced. Clones share state, so the handle kept by the caller
//! sees everything written through the sinks it opened.

use super::{RecordSink, SinkError, SinkFactory};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tablesync_core::{OutputSchema, Record};

#[derive(Default)]
struct MemoryState {
    schema: Option<OutputSchema>,
    shard_size: Option<usize>,
    records: Vec<Record>,
    opens: usize,
    closed: bool,
    /// 1-based record position whose write fails
    fail_write_at: Option<usize>,
    fail_close: bool,
    fail_open: bool,
}

/// Sink factory that keeps every record in memory
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail opening the sink
    pub fn with_open_failure(self) -> Self {
        self.state().fail_open = true;
        self
    }

    /// Fail the write of record `position` (1-based)
    pub fn with_write_failure_at(self, position: usize) -> Self {
        self.state().fail_write_at = Some(position);
        self
    }

    /// Fail when the sink is closed
    pub fn with_close_failure(self) -> Self {
        self.state().fail_close = true;
        self
    }

    /// Records accepted so far
    pub fn records(&self) -> Vec<Record> {
        self.state().records.clone()
    }

    /// Schema of the last opened sink
    pub fn schema(&self) -> Option<OutputSchema> {
        self.state().schema.clone()
    }

    /// Shard size passed to the last open
    pub fn shard_size(&self) -> Option<usize> {
        self.state().shard_size
    }

    pub fn open_count(&self) -> usize {
        self.state().opens
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

impl SinkFactory for MemorySink {
    fn open(
        &self,
        schema: &OutputSchema,
        shard_size: usize,
    ) -> Result<Box<dyn RecordSink>, SinkError> {
        let mut state = self.state();
        if state.fail_open {
            return Err(SinkError::Other("open failed".to_string()));
        }

        state.opens += 1;
        state.schema = Some(schema.clone());
        state.shard_size = Some(shard_size);
        state.records.clear();
        state.closed = false;

        Ok(Box::new(MemoryWriter {
            schema: schema.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryWriter {
    schema: OutputSchema,
    state: Arc<Mutex<MemoryState>>,
}

impl RecordSink for MemoryWriter {
    fn write(&mut self, record: &Record) -> Result<(), SinkError> {
        record.conforms_to(&self.schema)?;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(SinkError::Other("sink is closed".to_string()));
        }
        if state.fail_write_at == Some(state.records.len() + 1) {
            return Err(SinkError::Other(format!(
                "write failed at record {}",
                state.records.len() + 1
            )));
        }

        state.records.push(record.clone());
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), SinkError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;

        if state.fail_close {
            return Err(SinkError::Other("close failed".to_string()));
        }
        Ok(())
    }
}
