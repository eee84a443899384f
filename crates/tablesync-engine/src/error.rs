//! Error types for sync jobs

use crate::schema_builder::SchemaConflict;
use crate::sink::SinkError;
use tablesync_core::ScanError;
use tablesync_dialect::DialectError;

/// Failure category of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Introspection,
    SchemaConflict,
    QueryExecution,
    SinkOpen,
    RowScan,
    SinkWrite,
    SinkClose,
}

impl ErrorKind {
    /// Whether retrying the whole job may succeed without operator action
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Connection)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Introspection => "introspection",
            ErrorKind::SchemaConflict => "schema_conflict",
            ErrorKind::QueryExecution => "query_execution",
            ErrorKind::SinkOpen => "sink_open",
            ErrorKind::RowScan => "row_scan",
            ErrorKind::SinkWrite => "sink_write",
            ErrorKind::SinkClose => "sink_close",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that aborts a sync job
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Unable to connect: {0}")]
    Connection(#[source] DialectError),

    #[error("Unable to get table columns: {0}")]
    Introspection(#[source] DialectError),

    #[error(transparent)]
    SchemaConflict(#[from] SchemaConflict),

    #[error("Extraction query failed: {0}")]
    QueryExecution(#[source] DialectError),

    /// The cursor failed while fetching a row after the query started
    #[error("Unable to fetch row {row}: {source}")]
    RowFetch {
        row: u64,
        #[source]
        source: DialectError,
    },

    #[error("Unable to open sink: {0}")]
    SinkOpen(#[source] SinkError),

    #[error("Row {row} does not match the output schema: {source}")]
    RowScan {
        row: u64,
        #[source]
        source: ScanError,
    },

    #[error("Unable to write row {row}: {source}")]
    SinkWrite {
        row: u64,
        #[source]
        source: SinkError,
    },

    #[error("Unable to close sink: {0}")]
    SinkClose(#[source] SinkError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Connection(_) => ErrorKind::Connection,
            SyncError::Introspection(_) => ErrorKind::Introspection,
            SyncError::SchemaConflict(_) => ErrorKind::SchemaConflict,
            SyncError::QueryExecution(_) | SyncError::RowFetch { .. } => ErrorKind::QueryExecution,
            SyncError::SinkOpen(_) => ErrorKind::SinkOpen,
            SyncError::RowScan { .. } => ErrorKind::RowScan,
            SyncError::SinkWrite { .. } => ErrorKind::SinkWrite,
            SyncError::SinkClose(_) => ErrorKind::SinkClose,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }

    /// 1-based position of the offending row, for streaming failures
    pub fn row(&self) -> Option<u64> {
        match self {
            SyncError::RowFetch { row, .. }
            | SyncError::RowScan { row, .. }
            | SyncError::SinkWrite { row, .. } => Some(*row),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_failures_are_transient() {
        let connection = SyncError::Connection(DialectError::ConnectionError("refused".into()));
        assert!(connection.is_transient());

        let query = SyncError::QueryExecution(DialectError::QueryError("ORA-00942".into()));
        assert!(!query.is_transient());

        let scan = SyncError::RowScan {
            row: 7,
            source: ScanError::NullInRequiredField {
                field: "ID".to_string(),
            },
        };
        assert!(!scan.is_transient());
        assert_eq!(scan.kind(), ErrorKind::RowScan);
        assert_eq!(scan.row(), Some(7));
    }

    #[test]
    fn fetch_failures_count_as_query_execution() {
        let err = SyncError::RowFetch {
            row: 3,
            source: DialectError::FetchError("network".into()),
        };
        assert_eq!(err.kind(), ErrorKind::QueryExecution);
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn schema_conflict_message_names_column() {
        let err: SyncError = SchemaConflict {
            column: "sync_extract_date".to_string(),
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::SchemaConflict);
        assert!(err.to_string().contains("sync_extract_date"));
        assert_eq!(err.row(), None);
    }
}
