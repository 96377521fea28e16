//! fr-core: shared types, task model, errors, and configuration.
//!
//! This crate is the foundational dependency for all other fr-* crates,
//! providing the task identifier and record types, the unified error type,
//! and application configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod task;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::TaskId;
pub use task::{Task, TaskStatus};
