//! External tool detection.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools conversions shell out to (freecadcmd, assimp, meshlabserver)
//! and provides lookups for the rest of the crate.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use fr_core::config::ToolsConfig;
use fr_core::{Error, Result};

/// Tool names the registry manages.
pub const KNOWN_TOOLS: &[&str] = &["freecadcmd", "assimp", "meshlabserver"];

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `--version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool locations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH`, honoring config overrides.
    ///
    /// An override that points at a nonexistent file falls back to `PATH`
    /// lookup; tools found nowhere are omitted from the registry.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "freecadcmd" => tools_config.freecadcmd_path.as_deref(),
                "assimp" => tools_config.assimp_path.as_deref(),
                "meshlabserver" => tools_config.meshlabserver_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                _ => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tracing::debug!(tool = name, path = %path.display(), "Tool located");
                tools.insert(name.to_string(), path);
            }
        }

        Self { tools }
    }

    /// Build a registry from an explicit name-to-path map (tests).
    pub fn from_paths(paths: impl IntoIterator<Item = (String, PathBuf)>) -> Self {
        Self {
            tools: paths.into_iter().collect(),
        }
    }

    /// Resolved path of `name`, or [`Error::Tool`] when it was not found.
    pub fn require(&self, name: &str) -> Result<&PathBuf> {
        self.tools.get(name).ok_or_else(|| {
            Error::tool(name, format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Whether `name` was found during discovery.
    pub fn is_available(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> --version` and return the first line of stdout.
fn detect_version(path: &PathBuf) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("--version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_with_default_config() {
        let registry = ToolRegistry::discover(&ToolsConfig::default());
        // no tool is guaranteed in CI; the call itself must not panic
        let _ = registry.check_all();
    }

    #[test]
    fn require_missing_tool_returns_error() {
        let registry = ToolRegistry::discover(&ToolsConfig::default());
        assert!(registry.require("nonexistent_tool_xyz").is_err());
    }

    #[test]
    fn check_all_covers_known_tools() {
        let registry = ToolRegistry::discover(&ToolsConfig::default());
        let names: Vec<String> = registry.check_all().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["freecadcmd", "assimp", "meshlabserver"]);
    }

    #[test]
    fn from_paths_resolves() {
        let registry = ToolRegistry::from_paths([(
            "assimp".to_string(),
            PathBuf::from("/usr/bin/assimp"),
        )]);
        assert!(registry.is_available("assimp"));
        assert_eq!(
            registry.require("assimp").unwrap(),
            &PathBuf::from("/usr/bin/assimp")
        );
    }
}
