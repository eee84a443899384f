//! Mock dialect for testing
//!
//! Wraps a real dialect and replaces its connection with a scripted one.
//! Type mapping and query generation go to the wrapped dialect; every query
//! sent to the mock connection is answered by the next scripted response.
//! It's useful for:
//! - Unit testing catalog introspection without a database
//! - Driving the extraction pipeline end to end in tests
//! - Simulating connection, query, fetch and close failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tablesync_dialect::{MockDialect, OracleDialect};
//!
//! let dialect = MockDialect::new(OracleDialect::new(config))
//!     .with_catalog(&[ColumnMetadata::new("ID", "NUMBER", false)])
//!     .with_rows(vec![vec![Some("1".into()), Some("2024-05-01".into())]]);
//!
//! // Clones share state, so a handle kept by the test can inspect what ran
//! let handle = dialect.clone();
//! run_job(Box::new(dialect));
//! assert_eq!(handle.executed_queries().len(), 2);
//! ```

use crate::dialect::{Connection, Dialect, DialectError, RowCursor};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tablesync_core::{ColumnMetadata, SourceRow, ValueType};

/// A query received by the mock connection
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub sql: String,
    pub params: Vec<String>,

    /// Rows handed out by the cursor of this query
    pub rows_fetched: usize,
}

enum Response {
    Rows {
        rows: Vec<SourceRow>,
        /// 1-based row position whose fetch fails
        fail_at: Option<usize>,
    },
    Error(String),
}

#[derive(Default)]
struct MockState {
    responses: VecDeque<Response>,
    executed: Vec<ExecutedQuery>,
    connection_failure: Option<String>,
    close_failure: bool,
    connects: usize,
    closes: usize,
}

/// Mock dialect backed by scripted responses
#[derive(Clone)]
pub struct MockDialect {
    inner: Arc<dyn Dialect>,
    state: Arc<Mutex<MockState>>,
}

impl MockDialect {
    /// Create a mock around a real dialect with nothing scripted
    pub fn new(inner: impl Dialect + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script a catalog response listing the given columns
    pub fn with_catalog(self, columns: &[ColumnMetadata]) -> Self {
        let rows = columns
            .iter()
            .map(|c| {
                vec![
                    Some(c.name.clone()),
                    Some(c.native_type.clone()),
                    Some(if c.nullable { "Y" } else { "N" }.to_string()),
                ]
            })
            .collect();
        self.with_rows(rows)
    }

    /// Script a result set
    pub fn with_rows(self, rows: Vec<SourceRow>) -> Self {
        self.state()
            .responses
            .push_back(Response::Rows { rows, fail_at: None });
        self
    }

    /// Script a result set whose cursor fails when fetching row `position`
    /// (1-based)
    pub fn with_rows_failing_at(self, rows: Vec<SourceRow>, position: usize) -> Self {
        self.state().responses.push_back(Response::Rows {
            rows,
            fail_at: Some(position),
        });
        self
    }

    /// Script a query that the database rejects
    pub fn with_query_error(self, message: impl Into<String>) -> Self {
        self.state()
            .responses
            .push_back(Response::Error(message.into()));
        self
    }

    /// Fail every connection attempt
    pub fn with_connection_failure(self) -> Self {
        self.state().connection_failure = Some("connection refused".to_string());
        self
    }

    /// Fail when the connection is closed
    pub fn with_close_failure(self) -> Self {
        self.state().close_failure = true;
        self
    }

    /// Queries received so far, in order
    pub fn executed_queries(&self) -> Vec<ExecutedQuery> {
        self.state().executed.clone()
    }

    /// Number of connections opened
    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    /// Number of connections closed
    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    /// Scripted responses not consumed yet
    pub fn pending_responses(&self) -> usize {
        self.state().responses.len()
    }
}

impl Dialect for MockDialect {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn connect(&self) -> Result<Box<dyn Connection>, DialectError> {
        let mut state = self.state();
        if let Some(message) = &state.connection_failure {
            return Err(DialectError::ConnectionError(message.clone()));
        }
        state.connects += 1;

        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }

    fn introspect_columns(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
    ) -> Result<Vec<ColumnMetadata>, DialectError> {
        self.inner.introspect_columns(conn, table_name)
    }

    fn map_type(&self, native_type: &str) -> ValueType {
        self.inner.map_type(native_type)
    }

    fn generate_extract_query(&self, columns: &[ColumnMetadata], table_name: &str) -> String {
        self.inner.generate_extract_query(columns, table_name)
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl Connection for MockConnection {
    fn query(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<Box<dyn RowCursor + '_>, DialectError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state.executed.push(ExecutedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
            rows_fetched: 0,
        });
        let index = state.executed.len() - 1;

        match state.responses.pop_front() {
            Some(Response::Rows { rows, fail_at }) => Ok(Box::new(MockCursor {
                state: Arc::clone(&self.state),
                index,
                rows: rows.into(),
                fail_at,
            })),
            Some(Response::Error(message)) => Err(DialectError::QueryError(message)),
            None => Err(DialectError::QueryError(format!(
                "No scripted response for query: {}",
                sql
            ))),
        }
    }

    fn close(self: Box<Self>) -> Result<(), DialectError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closes += 1;

        if state.close_failure {
            return Err(DialectError::ConnectionError("close failed".to_string()));
        }
        Ok(())
    }
}

struct MockCursor {
    state: Arc<Mutex<MockState>>,
    index: usize,
    rows: VecDeque<SourceRow>,
    fail_at: Option<usize>,
}

impl RowCursor for MockCursor {
    fn next_row(&mut self) -> Result<Option<SourceRow>, DialectError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let fetched = &mut state.executed[self.index].rows_fetched;

        if self.fail_at == Some(*fetched + 1) {
            return Err(DialectError::FetchError(format!(
                "fetch failed at row {}",
                *fetched + 1
            )));
        }

        match self.rows.pop_front() {
            Some(row) => {
                *fetched += 1;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }
}
