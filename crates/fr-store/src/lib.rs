//! fr-store: SQLite-backed task store and lifecycle manager.
//!
//! The store holds one row per task with a bounded lifetime (`expires_at`);
//! every read treats expired rows as absent. [`TaskManager`] owns the task
//! state machine and is the sole writer of task records. The atomic claim,
//! a single conditional `UPDATE`, is the only mutual-exclusion point in the
//! whole system.

pub mod manager;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod tasks;

pub use manager::TaskManager;
pub use pool::{init_memory_pool, init_pool, DbPool};
pub use tasks::QueueStats;
