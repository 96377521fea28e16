//! fr-router: format-graph routing and multi-step conversion execution.
//!
//! The [`FormatGraph`] is a directed multigraph over format identifiers,
//! derived from whatever the converter registry actually registered.
//! [`Router`] plans a path through it (direct edges win outright, otherwise
//! cheapest-first search bounded by a hop limit) and executes each step with
//! intermediates confined to a scoped temp directory.

pub mod graph;
pub mod router;

pub use graph::{Edge, FormatGraph, PathStep};
pub use router::Router;
