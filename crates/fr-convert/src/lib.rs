//! fr-convert: converter trait, registry, and external tool plumbing.
//!
//! A [`Converter`] turns a file of one format into another. Converters are
//! held in a [`ConverterRegistry`] keyed by `"{input}_to_{output}"`; the
//! registry is built from an explicit registration table at startup, never
//! by scanning or reflection. External CLI tools (freecadcmd, assimp,
//! meshlabserver) are located once by [`ToolRegistry`] and invoked through
//! [`ToolCommand`].

pub mod builtin;
pub mod command;
pub mod converter;
pub mod registry;
pub mod tools;

pub use builtin::{build_registry, default_specs, CopyConverter, ToolConverter};
pub use command::{ToolCommand, ToolOutput};
pub use converter::Converter;
pub use registry::{converter_key, ConverterRegistry};
pub use tools::{ToolInfo, ToolRegistry};
