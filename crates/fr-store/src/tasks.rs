//! Task table queries.
//!
//! Free functions over a borrowed connection. Every read filters on
//! `expires_at` so an expired row is indistinguishable from a deleted one;
//! callers pass the current timestamp explicitly, which keeps the functions
//! deterministic under test.

use fr_core::{Error, Result, Task, TaskStatus};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::models::{task_from_row, TASK_COLS};

/// Per-status row counts over live (non-expired) tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub queued: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub timeout: u64,
    pub total: u64,
}

/// Insert a freshly created task row.
pub fn insert_task(conn: &Connection, task: &Task, expires_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO tasks (id, status, input_file, output_format, created_at, updated_at,
                            result_url, error, retry_count, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            task.task_id.as_str(),
            task.status.as_str(),
            task.input_file,
            task.output_format,
            task.created_at.to_rfc3339(),
            task.updated_at.to_rfc3339(),
            task.result_url,
            task.error,
            task.retry_count,
            expires_at,
        ],
    )
    .map_err(|e| Error::database(format!("Failed to insert task: {e}")))?;
    Ok(())
}

/// Fetch a live task by id. Expired rows read as absent.
pub fn get_task(conn: &Connection, id: &str, now: &str) -> Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {TASK_COLS} FROM tasks WHERE id = ?1 AND expires_at > ?2"),
        params![id, now],
        task_from_row,
    )
    .optional()
    .map_err(|e| Error::database(format!("Failed to fetch task: {e}")))
}

/// Atomically claim a queued task for processing.
///
/// The conditional `UPDATE` is the single mutual-exclusion point: of any
/// number of concurrent claimants for the same id, exactly one sees an
/// affected row. Claiming also refreshes the row's deadline.
pub fn claim_task(conn: &Connection, id: &str, now: &str, expires_at: &str) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE tasks
             SET status = 'PROCESSING', updated_at = ?2, expires_at = ?3
             WHERE id = ?1 AND status = 'QUEUED' AND expires_at > ?2",
            params![id, now, expires_at],
        )
        .map_err(|e| Error::database(format!("Failed to claim task: {e}")))?;
    Ok(n > 0)
}

/// Update a live task's status, merging in result/error fields.
///
/// `result_url` and `error` only overwrite when provided; a status-only
/// update leaves previously recorded values intact. Returns `false` when the
/// row is gone or expired.
pub fn update_task(
    conn: &Connection,
    id: &str,
    status: TaskStatus,
    result_url: Option<&str>,
    error: Option<&str>,
    now: &str,
    expires_at: &str,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE tasks
             SET status = ?2,
                 updated_at = ?3,
                 expires_at = ?4,
                 result_url = COALESCE(?5, result_url),
                 error = COALESCE(?6, error)
             WHERE id = ?1 AND expires_at > ?3",
            params![id, status.as_str(), now, expires_at, result_url, error],
        )
        .map_err(|e| Error::database(format!("Failed to update task: {e}")))?;
    Ok(n > 0)
}

/// Put a failed task back on the queue if it has retries left.
///
/// Increments `retry_count` in the same statement; returns `false` when the
/// task is not in FAILED, has exhausted its retries, or has expired.
pub fn requeue_task(
    conn: &Connection,
    id: &str,
    max_retries: u32,
    now: &str,
    expires_at: &str,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE tasks
             SET status = 'QUEUED', retry_count = retry_count + 1,
                 updated_at = ?2, expires_at = ?3
             WHERE id = ?1 AND status = 'FAILED'
               AND retry_count < ?4 AND expires_at > ?2",
            params![id, now, expires_at, max_retries],
        )
        .map_err(|e| Error::database(format!("Failed to requeue task: {e}")))?;
    Ok(n > 0)
}

/// Oldest live queued task, if any. FIFO by creation time.
pub fn next_queued(conn: &Connection, now: &str) -> Result<Option<Task>> {
    conn.query_row(
        &format!(
            "SELECT {TASK_COLS} FROM tasks
             WHERE status = 'QUEUED' AND expires_at > ?1
             ORDER BY created_at ASC, id ASC
             LIMIT 1"
        ),
        params![now],
        task_from_row,
    )
    .optional()
    .map_err(|e| Error::database(format!("Failed to fetch next queued task: {e}")))
}

/// Live queued tasks in FIFO order, bounded by `limit`.
pub fn list_queued(conn: &Connection, now: &str, limit: u32) -> Result<Vec<Task>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TASK_COLS} FROM tasks
             WHERE status = 'QUEUED' AND expires_at > ?1
             ORDER BY created_at ASC, id ASC
             LIMIT ?2"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map(params![now, limit], task_from_row)
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(format!("Failed to list queued tasks: {e}")))
}

/// Count live tasks per status.
pub fn queue_stats(conn: &Connection, now: &str) -> Result<QueueStats> {
    let mut stmt = conn
        .prepare(
            "SELECT status, COUNT(*) FROM tasks
             WHERE expires_at > ?1
             GROUP BY status",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map(params![now], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })
        .map_err(|e| Error::database(e.to_string()))?;

    let mut stats = QueueStats::default();
    for row in rows {
        let (status, count) = row.map_err(|e| Error::database(e.to_string()))?;
        match status.as_str() {
            "QUEUED" => stats.queued = count,
            "PROCESSING" => stats.processing = count,
            "COMPLETED" => stats.completed = count,
            "FAILED" => stats.failed = count,
            "TIMEOUT" => stats.timeout = count,
            _ => {}
        }
        stats.total += count;
    }
    Ok(stats)
}

/// Delete expired rows. Returns the number removed.
pub fn purge_expired(conn: &Connection, now: &str) -> Result<usize> {
    conn.execute("DELETE FROM tasks WHERE expires_at <= ?1", params![now])
        .map_err(|e| Error::database(format!("Failed to purge expired tasks: {e}")))
}

/// Delete rows created before `cutoff`, regardless of status.
pub fn purge_older_than(conn: &Connection, cutoff: &str) -> Result<usize> {
    conn.execute("DELETE FROM tasks WHERE created_at < ?1", params![cutoff])
        .map_err(|e| Error::database(format!("Failed to purge aged tasks: {e}")))
}
