//! formrelay: asynchronous CAD/mesh file-conversion service.
//!
//! Tasks come in over HTTP, land in a SQLite-backed queue with a bounded
//! lifetime, and are picked up by worker loops that claim atomically, route
//! the conversion through the format graph, and report a terminal status.

pub mod artifacts;
pub mod context;
pub mod server;
pub mod worker;

pub use context::AppContext;
