//! Decoding of fetched text cells into source rows

use crate::dialect::DialectError;
use tablesync_core::SourceRow;

/// Decode one fetched row of text cells.
///
/// `max_cell_bytes` is the size of the bound buffer. A longer cell fails
/// instead of being passed on, and so does a cell that is not valid UTF-8.
pub(crate) fn decode_row<'a, I>(row_index: u64, cells: I, max_cell_bytes: usize) -> Result<SourceRow, DialectError>
where
    I: IntoIterator<Item = Option<&'a [u8]>>,
{
    cells
        .into_iter()
        .enumerate()
        .map(|(col, cell)| decode_cell(row_index, col, cell, max_cell_bytes))
        .collect()
}

fn decode_cell(
    row_index: u64,
    col: usize,
    cell: Option<&[u8]>,
    max_cell_bytes: usize,
) -> Result<Option<String>, DialectError> {
    let Some(bytes) = cell else {
        return Ok(None);
    };

    if bytes.len() > max_cell_bytes {
        return Err(DialectError::FetchError(format!(
            "Row {}, column {}: value of {} bytes exceeds the {} byte cell limit",
            row_index,
            col + 1,
            bytes.len(),
            max_cell_bytes
        )));
    }

    std::str::from_utf8(bytes).map(|s| Some(s.to_string())).map_err(|e| {
        DialectError::FetchError(format!(
            "Row {}, column {}: value is not valid UTF-8: {}",
            row_index,
            col + 1,
            e
        ))
    })
}
