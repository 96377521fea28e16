//! Task record and status state machine.
//!
//! Status transitions: `QUEUED -> PROCESSING -> {COMPLETED, FAILED, TIMEOUT}`,
//! plus `FAILED -> QUEUED` via an explicit requeue bounded by a retry
//! ceiling. `PENDING` is a reserved value that current logic never targets.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::TaskId;
use crate::{Error, Result};

/// Lifecycle state of a conversion task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Submitted and waiting for a worker to claim it.
    Queued,
    /// Reserved; not a transition target of current logic.
    Pending,
    /// Claimed by exactly one worker and being converted.
    Processing,
    /// Finished successfully; `result_url` is populated.
    Completed,
    /// Finished unsuccessfully; `error` is populated. May be requeued.
    Failed,
    /// An external deadline elapsed; `error` is populated. Terminal.
    Timeout,
}

impl TaskStatus {
    /// Stable string form stored in the database and exposed over the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Pending => "PENDING",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Timeout => "TIMEOUT",
        }
    }

    /// All known status values, in state-machine order.
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Queued,
        TaskStatus::Pending,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Timeout,
    ];

    /// Whether this status ends the lifecycle.
    ///
    /// `FAILED` is terminal too unless something explicitly requeues the task.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Timeout
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "QUEUED" => Ok(TaskStatus::Queued),
            "PENDING" => Ok(TaskStatus::Pending),
            "PROCESSING" => Ok(TaskStatus::Processing),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            "TIMEOUT" => Ok(TaskStatus::Timeout),
            other => Err(Error::Validation(format!("unknown task status: {other}"))),
        }
    }
}

/// A single requested file conversion and its tracked state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Globally unique opaque identifier.
    pub task_id: TaskId,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// URI/handle of the source artifact; resolved by the artifact store.
    pub input_file: String,
    /// Requested target format identifier (lower case).
    pub output_format: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Populated only on `COMPLETED`.
    pub result_url: Option<String>,
    /// Populated only on `FAILED` / `TIMEOUT`.
    pub error: Option<String>,
    /// Number of times the task has been requeued.
    pub retry_count: u32,
}
