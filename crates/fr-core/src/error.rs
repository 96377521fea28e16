//! Unified error type for the formrelay application.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for API handlers to derive an HTTP status code via
//! [`Error::http_status`]. Routing and step failures are ordinary result
//! values so callers can always inspect which hop of a pipeline broke.

use std::fmt;

/// Unified error type covering all failure modes in formrelay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found (including expired tasks).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "task").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A claim was attempted on a task that is not claimable.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No conversion path exists between two formats within the hop bound.
    #[error("No conversion path from '{from}' to '{to}'")]
    Routing {
        /// Source format.
        from: String,
        /// Target format.
        to: String,
    },

    /// A specific step of a multi-hop conversion path failed.
    #[error("Conversion step {index} ({from} -> {to}) failed: {message}")]
    Step {
        /// 1-based index of the failed step within the path.
        index: usize,
        /// Input format of the failed step.
        from: String,
        /// Output format of the failed step.
        to: String,
        /// Human-readable error description.
        message: String,
    },

    /// Transfer of a source or result artifact failed.
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// An external deadline elapsed before the task completed.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool invocation failed.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Conflict(_) => 409,
            Error::Routing { .. } => 422,
            Error::Step { .. } => 500,
            Error::Artifact(_) => 502,
            Error::Timeout(_) => 504,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Routing`].
    pub fn routing(from: impl Into<String>, to: impl Into<String>) -> Self {
        Error::Routing {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Convenience constructor for [`Error::Step`].
    pub fn step(
        index: usize,
        from: impl Into<String>,
        to: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Step {
            index,
            from: from.into(),
            to: to.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("task", "1747281355-1-b5e4830d");
        assert_eq!(err.to_string(), "task not found: 1747281355-1-b5e4830d");
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("unsupported output format".into());
        assert_eq!(
            err.to_string(),
            "Validation error: unsupported output format"
        );
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn conflict_display() {
        let err = Error::Conflict("task already claimed".into());
        assert_eq!(err.to_string(), "Conflict: task already claimed");
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn routing_display() {
        let err = Error::routing("stl", "catpart");
        assert_eq!(err.to_string(), "No conversion path from 'stl' to 'catpart'");
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn step_carries_index_and_formats() {
        let err = Error::step(2, "brep", "stl", "mesher crashed");
        assert_eq!(
            err.to_string(),
            "Conversion step 2 (brep -> stl) failed: mesher crashed"
        );
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn artifact_display() {
        let err = Error::Artifact("download failed: 403".into());
        assert_eq!(err.to_string(), "Artifact error: download failed: 403");
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn timeout_display() {
        let err = Error::Timeout("deadline of 60s elapsed".into());
        assert_eq!(err.http_status(), 504);
    }

    #[test]
    fn database_display() {
        let err = Error::database("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("freecadcmd", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [freecadcmd]: exit code 1");
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);
    }
}
