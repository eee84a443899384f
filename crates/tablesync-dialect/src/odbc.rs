//! ODBC-backed connection shared by the Oracle and DB2 dialects
//!
//! **Requirements:**
//! - The `odbc` feature must be enabled
//! - An ODBC driver manager (unixODBC on Linux/macOS, built in on Windows)
//! - The vendor driver: Oracle Instant Client ODBC or the IBM Data Server
//!   Driver for ODBC and CLI
//!
//! Result sets are fetched in blocks of text cells and handed out one row at a
//! time, so memory stays bounded by the block size however large the table is.
//! A value that does not fit its cell buffer fails the fetch.

use crate::cells::decode_row;
use crate::dialect::{Connection, DialectError, RowCursor};
use odbc_api::buffers::TextRowSet;
use odbc_api::{BlockCursor, ConnectionOptions, Cursor, IntoParameter};
use std::collections::VecDeque;
use tablesync_core::SourceRow;

/// Rows fetched per round trip
const FETCH_BATCH_SIZE: usize = 500;

/// Upper bound for a single text cell, in bytes. Columns reporting no size
/// (CLOB, LONG) get a buffer this large.
const MAX_CELL_BYTES: usize = 32_768;

/// An open ODBC connection
pub struct OdbcConnection {
    conn: odbc_api::Connection<'static>,
}

impl OdbcConnection {
    /// Connect with a full ODBC connection string
    pub fn open(connection_string: &str) -> Result<Self, DialectError> {
        let env = odbc_api::environment().map_err(|e| {
            DialectError::ConnectionError(format!(
                "Failed to create ODBC environment: {}. Make sure an ODBC driver manager is installed.",
                e
            ))
        })?;

        let conn = env
            .connect_with_connection_string(connection_string, ConnectionOptions::default())
            .map_err(|e| DialectError::ConnectionError(e.to_string()))?;

        Ok(Self { conn })
    }
}

impl Connection for OdbcConnection {
    fn query(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<Box<dyn RowCursor + '_>, DialectError> {
        let params: Vec<_> = params.iter().map(|p| p.as_str().into_parameter()).collect();

        let cursor = self
            .conn
            .execute(sql, params.as_slice())
            .map_err(|e| DialectError::QueryError(format!("{} - SQL: {}", e, sql)))?;

        let Some(mut cursor) = cursor else {
            return Err(DialectError::QueryError(format!(
                "Statement produced no result set - SQL: {}",
                sql
            )));
        };

        let buffer = TextRowSet::for_cursor(FETCH_BATCH_SIZE, &mut cursor, Some(MAX_CELL_BYTES))
            .map_err(|e| DialectError::QueryError(format!("Failed to create row buffer: {}", e)))?;

        let block = cursor
            .bind_buffer(buffer)
            .map_err(|e| DialectError::QueryError(format!("Failed to bind buffer: {}", e)))?;

        Ok(Box::new(OdbcRowCursor {
            block,
            pending: VecDeque::new(),
            exhausted: false,
            rows_fetched: 0,
        }))
    }

    fn close(self: Box<Self>) -> Result<(), DialectError> {
        drop(self.conn);
        Ok(())
    }
}

struct OdbcRowCursor<C: Cursor> {
    block: BlockCursor<C, TextRowSet>,
    pending: VecDeque<SourceRow>,
    exhausted: bool,
    rows_fetched: u64,
}

impl<C: Cursor> RowCursor for OdbcRowCursor<C> {
    fn next_row(&mut self) -> Result<Option<SourceRow>, DialectError> {
        if self.pending.is_empty() && !self.exhausted {
            let batch = self
                .block
                .fetch_with_truncation_check(true)
                .map_err(|e| {
                    DialectError::FetchError(format!(
                        "{} (cell limit is {} bytes)",
                        e, MAX_CELL_BYTES
                    ))
                })?;

            match batch {
                Some(batch) => {
                    for row in 0..batch.num_rows() {
                        let row_index = self.rows_fetched + row as u64 + 1;
                        let cells = (0..batch.num_cols()).map(|col| batch.at(col, row));
                        self.pending.push_back(decode_row(row_index, cells, MAX_CELL_BYTES)?);
                    }
                    self.rows_fetched += batch.num_rows() as u64;
                }
                None => self.exhausted = true,
            }
        }

        Ok(self.pending.pop_front())
    }
}
