//! Task identifier type.
//!
//! A [`TaskId`] is an opaque string composed of a coarse unix timestamp, a
//! process-wide monotonic counter, and a short random suffix. The three
//! parts together keep ids unique even across concurrent creators without
//! coordinating through the store.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process-wide counter feeding the middle segment of generated ids.
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a conversion task.
///
/// Generated ids look like `1747281355-12-b5e4830d`. The encoding is an
/// implementation detail; consumers must treat the value as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a new unique id.
    #[must_use]
    pub fn generate() -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        let secs = Utc::now().timestamp();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{secs}-{n}-{}", &suffix[..8]))
    }

    /// View the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(crate::Error::Validation("task id must not be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_shape() {
        let id = TaskId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<i64>().is_ok());
        assert!(parts[1].parse::<u64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn counter_is_monotonic() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        let n = |id: &TaskId| id.as_str().split('-').nth(1).unwrap().parse::<u64>().unwrap();
        assert!(n(&b) > n(&a));
    }

    #[test]
    fn display_and_from_str() {
        let id = TaskId::generate();
        let s = id.to_string();
        let parsed: TaskId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn empty_from_str_rejected() {
        let result = "".parse::<TaskId>();
        assert!(result.is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let id = TaskId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
