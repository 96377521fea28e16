//! Built-in converters and the startup registration table.
//!
//! Two converter kinds cover everything: [`ToolConverter`] shells out to an
//! external CLI tool with `{input}`/`{output}` substituted into an argument
//! template, and [`CopyConverter`] byte-copies between alias formats that
//! share an on-disk representation (step/stp, iges/igs).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use fr_core::config::ConverterSpec;
use fr_core::{Error, Result};

use crate::command::ToolCommand;
use crate::converter::Converter;
use crate::registry::ConverterRegistry;
use crate::tools::ToolRegistry;

/// Alias format pairs whose files are byte-identical.
pub const ALIAS_PAIRS: &[(&str, &str)] = &[("step", "stp"), ("iges", "igs")];

// ---------------------------------------------------------------------------
// CopyConverter
// ---------------------------------------------------------------------------

/// Converter for alias formats: a plain file copy.
#[derive(Debug, Clone)]
pub struct CopyConverter {
    input: String,
    output: String,
}

impl CopyConverter {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

#[async_trait]
impl Converter for CopyConverter {
    fn input_format(&self) -> &str {
        &self.input
    }

    fn output_format(&self) -> &str {
        &self.output
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ToolConverter
// ---------------------------------------------------------------------------

/// Converter that runs an external CLI tool.
///
/// The argument template comes from a [`ConverterSpec`]; every occurrence of
/// `{input}` and `{output}` in it is replaced with the actual paths.
#[derive(Debug, Clone)]
pub struct ToolConverter {
    input: String,
    output: String,
    tool: String,
    program: std::path::PathBuf,
    args: Vec<String>,
}

impl ToolConverter {
    pub fn from_spec(spec: &ConverterSpec, tools: &ToolRegistry) -> Result<Self> {
        let program = tools.require(&spec.tool)?.clone();
        Ok(Self {
            input: spec.input.clone(),
            output: spec.output.clone(),
            tool: spec.tool.clone(),
            program,
            args: spec.args.clone(),
        })
    }
}

#[async_trait]
impl Converter for ToolConverter {
    fn input_format(&self) -> &str {
        &self.input
    }

    fn output_format(&self) -> &str {
        &self.output
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let input_str = input.to_string_lossy();
        let output_str = output.to_string_lossy();

        let args = self.args.iter().map(|a| {
            a.replace("{input}", &input_str)
                .replace("{output}", &output_str)
        });

        tracing::debug!(
            tool = %self.tool,
            from = %self.input,
            to = %self.output,
            "Running conversion tool"
        );

        ToolCommand::new(self.program.clone())
            .args(args)
            .execute()
            .await?;

        if !output.exists() {
            return Err(Error::tool(
                self.tool.clone(),
                format!("exited successfully but produced no output file: {output_str}"),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registration table
// ---------------------------------------------------------------------------

fn spec(input: &str, output: &str, tool: &str, args: &[&str]) -> ConverterSpec {
    ConverterSpec {
        input: input.to_string(),
        output: output.to_string(),
        tool: tool.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
    }
}

/// The built-in tool-backed conversion table.
///
/// CAD conversions go through FreeCAD's headless binary, mesh conversions
/// through assimp, and mesh repair/export fallbacks through meshlabserver.
pub fn default_specs() -> Vec<ConverterSpec> {
    const FREECAD_BREP: &str =
        "import Part; s = Part.Shape(); s.read('{input}'); s.exportBrep('{output}')";
    const FREECAD_STEP: &str =
        "import Part; s = Part.Shape(); s.read('{input}'); s.exportStep('{output}')";
    const FREECAD_IGES: &str =
        "import Part; s = Part.Shape(); s.read('{input}'); s.exportIges('{output}')";
    const FREECAD_STL: &str = "import Part, Mesh; s = Part.Shape(); s.read('{input}'); \
         m = Mesh.Mesh(); m.addFacets(s.tessellate(0.1)); m.write('{output}')";

    vec![
        spec("step", "brep", "freecadcmd", &["-c", FREECAD_BREP]),
        spec("brep", "step", "freecadcmd", &["-c", FREECAD_STEP]),
        spec("step", "iges", "freecadcmd", &["-c", FREECAD_IGES]),
        spec("step", "stl", "freecadcmd", &["-c", FREECAD_STL]),
        spec("brep", "stl", "freecadcmd", &["-c", FREECAD_STL]),
        spec("stl", "obj", "assimp", &["export", "{input}", "{output}"]),
        spec("obj", "stl", "assimp", &["export", "{input}", "{output}"]),
        spec("stl", "glb", "assimp", &["export", "{input}", "{output}"]),
        spec("glb", "stl", "assimp", &["export", "{input}", "{output}"]),
        spec("stl", "ply", "meshlabserver", &["-i", "{input}", "-o", "{output}"]),
        spec("ply", "stl", "meshlabserver", &["-i", "{input}", "-o", "{output}"]),
    ]
}

/// Build the registry from the built-in table plus config-supplied extras.
///
/// Alias copy pairs register first (both directions), then the built-in
/// table, then `extra_specs`; later registrations for the same pair win.
/// Specs whose tool was not discovered are skipped with a warning rather
/// than failing startup.
pub fn build_registry(tools: &ToolRegistry, extra_specs: &[ConverterSpec]) -> ConverterRegistry {
    let mut registry = ConverterRegistry::new();

    for &(a, b) in ALIAS_PAIRS {
        registry.register(Arc::new(CopyConverter::new(a, b)));
        registry.register(Arc::new(CopyConverter::new(b, a)));
    }

    for spec in default_specs().iter().chain(extra_specs) {
        match ToolConverter::from_spec(spec, tools) {
            Ok(converter) => registry.register(Arc::new(converter)),
            Err(e) => {
                tracing::warn!(
                    from = %spec.input,
                    to = %spec.output,
                    "Skipping converter: {e}"
                );
            }
        }
    }

    registry
}
