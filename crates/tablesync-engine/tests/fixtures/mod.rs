//! Test fixtures for pipeline integration tests
//!
//! Column lists and source rows for a few representative tables, plus an
//! event sink that records what the pipeline emitted.

#![allow(dead_code)]

use std::sync::Mutex;
use tablesync_core::{
    ColumnMetadata, Db2Config, EventSink, OracleConfig, SourceRow, SyncEvent,
};
use tablesync_dialect::{Db2Dialect, MockDialect, OracleDialect};

pub const AUDIT_VALUE: &str = "2024-05-01 10:15:30.123456";

pub fn oracle() -> OracleDialect {
    OracleDialect::new(OracleConfig::new("localhost", 1521, "system", "welcome123").with_sid("xe"))
}

pub fn db2() -> Db2Dialect {
    Db2Dialect::new(Db2Config::new("localhost", 50000, "SAMPLE", "db2inst1", "secret"))
}

/// Two-column table: a required number and a nullable string
pub fn id_name_columns() -> Vec<ColumnMetadata> {
    vec![
        ColumnMetadata::new("ID", "NUMBER", false),
        ColumnMetadata::new("NAME", "VARCHAR", true),
    ]
}

/// Sakila-style film table
///
/// Represents a typical source table with:
/// - Numeric key and price
/// - Text columns, one of them nullable
/// - A temporal column carried as text
pub fn film_columns() -> Vec<ColumnMetadata> {
    vec![
        ColumnMetadata::new("film_id", "NUMBER", false),
        ColumnMetadata::new("title", "VARCHAR2", false),
        ColumnMetadata::new("description", "CLOB", true),
        ColumnMetadata::new("rental_rate", "NUMBER", true),
        ColumnMetadata::new("last_update", "DATE", false),
    ]
}

/// A source row of text cells; `None` is SQL NULL
pub fn row(cells: &[Option<&str>]) -> SourceRow {
    cells.iter().map(|c| c.map(str::to_string)).collect()
}

/// `count` rows for [`id_name_columns`], each ending with the audit value
pub fn id_name_rows(count: usize) -> Vec<SourceRow> {
    (1..=count)
        .map(|i| {
            let id = i.to_string();
            let name = format!("name-{}", i);
            row(&[Some(&id), Some(&name), Some(AUDIT_VALUE)])
        })
        .collect()
}

/// Mock Oracle source answering the catalog query and then the extraction
pub fn oracle_source(columns: &[ColumnMetadata], rows: Vec<SourceRow>) -> MockDialect {
    MockDialect::new(oracle()).with_catalog(columns).with_rows(rows)
}

/// Event sink keeping every event it receives
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: &SyncEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
