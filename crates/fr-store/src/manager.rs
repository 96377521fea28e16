//! Task lifecycle manager.
//!
//! [`TaskManager`] is the sole writer of task records. It owns the state
//! machine (QUEUED -> PROCESSING -> COMPLETED | FAILED | TIMEOUT, with
//! FAILED -> QUEUED on a bounded requeue) and attaches the configured TTL
//! to every write, so no row outlives its deadline unrefreshed.

use chrono::{Duration, Utc};
use fr_core::config::StoreConfig;
use fr_core::{Error, Result, Task, TaskId, TaskStatus};

use crate::pool::{get_conn, DbPool};
use crate::tasks::{self, QueueStats};

#[derive(Clone)]
pub struct TaskManager {
    pool: DbPool,
    config: StoreConfig,
}

impl TaskManager {
    pub fn new(pool: DbPool, config: StoreConfig) -> Self {
        Self { pool, config }
    }

    fn now_str(&self) -> String {
        Utc::now().to_rfc3339()
    }

    fn deadline_str(&self) -> String {
        (Utc::now() + Duration::seconds(self.config.task_ttl_secs as i64)).to_rfc3339()
    }

    /// Create a new task in QUEUED state and persist it.
    pub fn create_task(&self, input_file: &str, output_format: &str) -> Result<Task> {
        if input_file.trim().is_empty() {
            return Err(Error::Validation("input_file must not be empty".into()));
        }
        if output_format.trim().is_empty() {
            return Err(Error::Validation("output_format must not be empty".into()));
        }

        let now = Utc::now();
        let task = Task {
            task_id: TaskId::generate(),
            status: TaskStatus::Queued,
            input_file: input_file.to_string(),
            output_format: output_format.trim().to_lowercase(),
            created_at: now,
            updated_at: now,
            result_url: None,
            error: None,
            retry_count: 0,
        };

        let conn = get_conn(&self.pool)?;
        tasks::insert_task(&conn, &task, &self.deadline_str())?;
        tracing::info!(task_id = %task.task_id, output_format = %task.output_format, "Task created");
        Ok(task)
    }

    /// Fetch a live task; expired records read as absent.
    pub fn get(&self, id: &str) -> Result<Option<Task>> {
        let conn = get_conn(&self.pool)?;
        tasks::get_task(&conn, id, &self.now_str())
    }

    /// Fetch a live task or fail with NotFound.
    pub fn require(&self, id: &str) -> Result<Task> {
        self.get(id)?
            .ok_or_else(|| Error::not_found("task", id))
    }

    /// Atomically claim a queued task. Exactly one of any set of concurrent
    /// claimants succeeds; losing claimants get `false`, never an error.
    /// A successful claim refreshes the record's deadline.
    pub fn claim(&self, id: &str) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        let won = tasks::claim_task(&conn, id, &self.now_str(), &self.deadline_str())?;
        if won {
            tracing::info!(task_id = %id, "Task claimed");
        } else {
            tracing::debug!(task_id = %id, "Claim lost (not queued or expired)");
        }
        Ok(won)
    }

    /// Record a status transition on a live task.
    ///
    /// A terminal task only accepts an idempotent re-write of the same
    /// status; anything else is a conflict. Returns `false` when the record
    /// has already expired, which callers tolerate as a late update.
    pub fn update_status(
        &self,
        id: &str,
        status: TaskStatus,
        result_url: Option<&str>,
        error: Option<&str>,
    ) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        let now = self.now_str();

        if let Some(current) = tasks::get_task(&conn, id, &now)? {
            if current.status.is_terminal() && current.status != status {
                return Err(Error::Conflict(format!(
                    "task {id} is already {}",
                    current.status.as_str()
                )));
            }
        }

        let applied = tasks::update_task(
            &conn,
            id,
            status,
            result_url,
            error,
            &now,
            &self.deadline_str(),
        )?;
        if applied {
            tracing::info!(task_id = %id, status = status.as_str(), "Task updated");
        } else {
            tracing::warn!(task_id = %id, status = status.as_str(), "Late update ignored; record expired");
        }
        Ok(applied)
    }

    /// Put a FAILED task back on the queue if it has retries left.
    pub fn requeue(&self, id: &str) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        let requeued = tasks::requeue_task(
            &conn,
            id,
            self.config.max_retries,
            &self.now_str(),
            &self.deadline_str(),
        )?;
        if requeued {
            tracing::info!(task_id = %id, "Task requeued");
        }
        Ok(requeued)
    }

    /// Oldest live queued task, if any.
    pub fn next_queued(&self) -> Result<Option<Task>> {
        let conn = get_conn(&self.pool)?;
        tasks::next_queued(&conn, &self.now_str())
    }

    /// Live queued tasks in FIFO order, bounded by `limit`. For
    /// introspection only; dispatch goes through `claim`.
    pub fn list_queued(&self, limit: u32) -> Result<Vec<Task>> {
        let conn = get_conn(&self.pool)?;
        tasks::list_queued(&conn, &self.now_str(), limit)
    }

    /// Per-status counts over live records.
    pub fn stats(&self) -> Result<QueueStats> {
        let conn = get_conn(&self.pool)?;
        tasks::queue_stats(&conn, &self.now_str())
    }

    /// Housekeeping: drop expired records and records older than the
    /// configured age. Returns (expired, aged) counts.
    pub fn cleanup(&self) -> Result<(usize, usize)> {
        let conn = get_conn(&self.pool)?;
        let expired = tasks::purge_expired(&conn, &self.now_str())?;
        let cutoff =
            (Utc::now() - Duration::days(self.config.cleanup_age_days as i64)).to_rfc3339();
        let aged = tasks::purge_older_than(&conn, &cutoff)?;
        if expired > 0 || aged > 0 {
            tracing::info!(expired, aged, "Task housekeeping");
        }
        Ok((expired, aged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    fn manager() -> TaskManager {
        TaskManager::new(init_memory_pool().unwrap(), StoreConfig::default())
    }

    fn manager_with(config: StoreConfig) -> TaskManager {
        TaskManager::new(init_memory_pool().unwrap(), config)
    }

    #[test]
    fn create_normalizes_format_and_queues() {
        let mgr = manager();
        let task = mgr.create_task("http://files.local/part.step", "STL").unwrap();

        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.output_format, "stl");

        let fetched = mgr.require(task.task_id.as_str()).unwrap();
        assert_eq!(fetched.status, TaskStatus::Queued);
    }

    #[test]
    fn create_rejects_empty_fields() {
        let mgr = manager();
        assert!(matches!(
            mgr.create_task("", "stl"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            mgr.create_task("http://files.local/part.step", "  "),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn require_missing_is_not_found() {
        let mgr = manager();
        assert!(matches!(
            mgr.require("100-1-deadbeef"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn full_lifecycle_to_completed() {
        let mgr = manager();
        let task = mgr.create_task("http://files.local/part.step", "stl").unwrap();
        let id = task.task_id.as_str();

        assert!(mgr.claim(id).unwrap());
        assert!(mgr
            .update_status(
                id,
                TaskStatus::Completed,
                Some("http://files.local/out/ab12_part.stl"),
                None,
            )
            .unwrap());

        let done = mgr.require(id).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.result_url.is_some());
    }

    #[test]
    fn terminal_tasks_reject_conflicting_updates() {
        let mgr = manager();
        let task = mgr.create_task("http://files.local/part.step", "stl").unwrap();
        let id = task.task_id.as_str();

        mgr.claim(id).unwrap();
        mgr.update_status(id, TaskStatus::Completed, None, None)
            .unwrap();

        // idempotent re-write of the same terminal status is fine
        assert!(mgr
            .update_status(id, TaskStatus::Completed, None, None)
            .unwrap());

        assert!(matches!(
            mgr.update_status(id, TaskStatus::Failed, None, Some("boom")),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn requeue_until_retries_exhausted() {
        let mut config = StoreConfig::default();
        config.max_retries = 1;
        let mgr = manager_with(config);

        let task = mgr.create_task("http://files.local/part.step", "stl").unwrap();
        let id = task.task_id.as_str();

        mgr.claim(id).unwrap();
        mgr.update_status(id, TaskStatus::Failed, None, Some("tool exited 1"))
            .unwrap();
        assert!(mgr.requeue(id).unwrap());

        mgr.claim(id).unwrap();
        mgr.update_status(id, TaskStatus::Failed, None, Some("tool exited 1"))
            .unwrap();
        assert!(!mgr.requeue(id).unwrap());

        let stuck = mgr.require(id).unwrap();
        assert_eq!(stuck.status, TaskStatus::Failed);
        assert_eq!(stuck.retry_count, 1);
    }

    #[test]
    fn expired_task_invisible_and_update_tolerated() {
        let mut config = StoreConfig::default();
        config.task_ttl_secs = 0;
        let mgr = manager_with(config);

        let task = mgr.create_task("http://files.local/part.step", "stl").unwrap();
        let id = task.task_id.as_str();

        assert!(mgr.get(id).unwrap().is_none());
        assert!(!mgr.claim(id).unwrap());
        // late update on an expired record: tolerated, reported as not applied
        assert!(!mgr
            .update_status(id, TaskStatus::Completed, None, None)
            .unwrap());
    }

    #[test]
    fn stats_and_cleanup() {
        let mgr = manager();
        let a = mgr.create_task("http://files.local/a.step", "stl").unwrap();
        mgr.create_task("http://files.local/b.step", "obj").unwrap();
        mgr.claim(a.task_id.as_str()).unwrap();

        let stats = mgr.stats().unwrap();
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.total, 2);

        let (expired, aged) = mgr.cleanup().unwrap();
        assert_eq!(expired, 0);
        assert_eq!(aged, 0);
    }
}
