//! Row-to-struct mapping for the task table.

use chrono::{DateTime, Utc};
use fr_core::{Task, TaskId, TaskStatus};

/// Column list matching the field order expected by [`task_from_row`].
pub(crate) const TASK_COLS: &str =
    "id, status, input_file, output_format, created_at, updated_at, result_url, error, retry_count";

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Parse an RFC 3339 timestamp from a text column.
fn parse_datetime(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

/// Construct a [`Task`] from a row selected with [`TASK_COLS`].
pub fn task_from_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let id: String = row.get(0)?;
    let status: String = row.get(1)?;

    Ok(Task {
        task_id: id.parse::<TaskId>().map_err(|e| conversion_err(0, e))?,
        status: status
            .parse::<TaskStatus>()
            .map_err(|e| conversion_err(1, e))?,
        input_file: row.get(2)?,
        output_format: row.get(3)?,
        created_at: parse_datetime(row, 4)?,
        updated_at: parse_datetime(row, 5)?,
        result_url: row.get(6)?,
        error: row.get(7)?,
        retry_count: row.get(8)?,
    })
}
