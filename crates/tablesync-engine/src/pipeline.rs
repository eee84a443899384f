//! Extraction pipeline
//!
//! Runs one [`SyncJob`] to completion:
//!
//! 1. Connect through the job's dialect
//! 2. Introspect the table's columns and build the output schema
//! 3. Generate the extraction query (column list plus the audit expression)
//! 4. Execute it and open the sink
//! 5. Scan each row into a record and write it to the sink, in order
//! 6. Close the sink, then the connection
//!
//! The first error aborts the job. Records already written stay in the sink;
//! nothing is rolled back. The sink and the connection are closed on every
//! path once they have been opened.

use crate::error::SyncError;
use crate::job::{JobState, SyncJob};
use crate::schema_builder::build_schema;
use crate::sink::{RecordSink, SinkFactory};
use serde::Serialize;
use std::time::Instant;
use tablesync_core::{
    ColumnMetadata, EventSink, ExtractMethod, OutputSchema, Record, SyncEvent, TracingEventSink,
};
use tablesync_dialect::{Connection, RowCursor};
use tracing::{debug, error, info, warn};

/// Log streaming progress every this many records
const PROGRESS_INTERVAL: u64 = 100_000;

/// Outcome of a successful job
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub table_name: String,
    pub method: ExtractMethod,
    pub rows_written: u64,
    pub schema: OutputSchema,
    pub query: String,
    pub final_state: JobState,
}

/// What a job would run, without running it
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionPlan {
    /// Introspected columns followed by the audit column
    pub columns: Vec<ColumnMetadata>,
    pub schema: OutputSchema,
    pub query: String,
}

impl SyncJob {
    /// Run the job, logging lifecycle events
    pub fn run(&self, sinks: &dyn SinkFactory) -> Result<SyncReport, SyncError> {
        run_sync_job(self, sinks, &TracingEventSink)
    }

    /// Connect, introspect and generate the query without extracting
    pub fn plan(&self) -> Result<ExtractionPlan, SyncError> {
        plan_sync_job(self)
    }
}

/// Run a job to completion, writing its records through `sinks`.
///
/// `sync_start` is emitted before connecting and `sync_complete` after the
/// job reaches [`JobState::Closed`]. Failed jobs emit no completion event.
pub fn run_sync_job(
    job: &SyncJob,
    sinks: &dyn SinkFactory,
    events: &dyn EventSink,
) -> Result<SyncReport, SyncError> {
    info!(
        "Starting {} of {} from {}",
        job.method,
        job.table_name,
        job.dialect.name()
    );
    let started = Instant::now();

    events.emit(&SyncEvent::sync_start(job.event_payload()));

    let mut run = Extraction::new(job);
    match run.execute(sinks) {
        Ok(report) => {
            let mut payload = job.event_payload();
            payload.insert("rows".to_string(), report.rows_written.to_string());
            events.emit(&SyncEvent::sync_complete(payload));

            info!(
                "Extracted {} rows from {} in {:.2?}",
                report.rows_written,
                job.table_name,
                started.elapsed()
            );
            Ok(report)
        }
        Err(e) => {
            run.fail(&e);
            Err(e)
        }
    }
}

/// Build the extraction plan for a job. Opens and closes a connection but
/// never runs the extraction query.
pub fn plan_sync_job(job: &SyncJob) -> Result<ExtractionPlan, SyncError> {
    let mut run = Extraction::new(job);

    let result = run.connect().and_then(|mut conn| {
        let plan = run.prepare(conn.as_mut());
        run.release(conn);
        plan
    });

    if let Err(e) = &result {
        run.fail(e);
    }
    result
}

/// State of one job execution
struct Extraction<'a> {
    job: &'a SyncJob,
    state: JobState,
}

impl<'a> Extraction<'a> {
    fn new(job: &'a SyncJob) -> Self {
        Self {
            job,
            state: JobState::Idle,
        }
    }

    fn transition(&mut self, next: JobState) {
        debug!(table = %self.job.table_name, "Job state {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: &SyncError) {
        error!(
            table = %self.job.table_name,
            kind = %err.kind(),
            "Job failed in state {}: {}",
            self.state,
            err
        );
        self.transition(JobState::Failed);
    }

    fn connect(&mut self) -> Result<Box<dyn Connection>, SyncError> {
        let conn = self.job.dialect.connect().map_err(SyncError::Connection)?;
        self.transition(JobState::Connected);
        Ok(conn)
    }

    /// Close the connection. Failures are logged only.
    fn release(&self, conn: Box<dyn Connection>) {
        if let Err(e) = conn.close() {
            warn!(
                "Failed to close {} connection: {}",
                self.job.dialect.name(),
                e
            );
        }
    }

    fn execute(&mut self, sinks: &dyn SinkFactory) -> Result<SyncReport, SyncError> {
        let mut conn = self.connect()?;

        let result = self.extract(conn.as_mut(), sinks);
        self.release(conn);

        let (plan, rows_written) = result?;
        self.transition(JobState::Closed);

        Ok(SyncReport {
            table_name: self.job.table_name.clone(),
            method: self.job.method,
            rows_written,
            schema: plan.schema,
            query: plan.query,
            final_state: self.state,
        })
    }

    /// Introspect, build the schema and generate the query
    fn prepare(&mut self, conn: &mut dyn Connection) -> Result<ExtractionPlan, SyncError> {
        let dialect = self.job.dialect.as_ref();

        let mut columns = dialect
            .introspect_columns(conn, &self.job.table_name)
            .map_err(SyncError::Introspection)?;
        info!("Found {} columns in {}", columns.len(), self.job.table_name);

        let schema = build_schema(&columns, dialect)?;
        for field in schema.fields() {
            debug!("  {}", field);
        }
        self.transition(JobState::SchemaBuilt);

        columns.push(ColumnMetadata::audit());
        let query = dialect.generate_extract_query(&columns, &self.job.table_name);
        info!("Extraction query: {}", query);
        self.transition(JobState::QueryBuilt);

        Ok(ExtractionPlan {
            columns,
            schema,
            query,
        })
    }

    fn extract(
        &mut self,
        conn: &mut dyn Connection,
        sinks: &dyn SinkFactory,
    ) -> Result<(ExtractionPlan, u64), SyncError> {
        let plan = self.prepare(conn)?;

        let mut cursor = conn
            .query(&plan.query, &[])
            .map_err(SyncError::QueryExecution)?;
        self.transition(JobState::Executing);

        let mut sink = sinks
            .open(&plan.schema, self.job.shard_size)
            .map_err(SyncError::SinkOpen)?;
        self.transition(JobState::Streaming);

        let streamed = stream_rows(cursor.as_mut(), &plan.schema, sink.as_mut());
        drop(cursor);

        match (streamed, sink.close()) {
            (Ok(rows), Ok(())) => Ok((plan, rows)),
            (Ok(rows), Err(e)) => {
                warn!("{} rows were written before the sink failed to close", rows);
                Err(SyncError::SinkClose(e))
            }
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!("Failed to close sink after error: {}", close_err);
                Err(e)
            }
        }
    }
}

/// Scan and write every row of the cursor. Returns the number of records
/// written. Stops at the first row that fails.
fn stream_rows(
    cursor: &mut dyn RowCursor,
    schema: &OutputSchema,
    sink: &mut dyn RecordSink,
) -> Result<u64, SyncError> {
    let mut written: u64 = 0;

    loop {
        let row = written + 1;

        let Some(cells) = cursor
            .next_row()
            .map_err(|source| SyncError::RowFetch { row, source })?
        else {
            break;
        };

        let record =
            Record::scan(schema, &cells).map_err(|source| SyncError::RowScan { row, source })?;
        sink.write(&record)
            .map_err(|source| SyncError::SinkWrite { row, source })?;

        written = row;
        if written % PROGRESS_INTERVAL == 0 {
            info!("{} rows written", written);
        }
    }

    Ok(written)
}
