//! Path planning plus multi-step execution.

use std::path::{Path, PathBuf};

use fr_core::{Error, Result};
use fr_convert::ConverterRegistry;

use crate::graph::{FormatGraph, PathStep};

/// Plans conversion paths and runs them step by step.
///
/// Intermediates of a multi-step run live in a scoped temp directory that is
/// removed when execution ends, successfully or not; only the final output
/// lands outside it.
pub struct Router {
    registry: ConverterRegistry,
    graph: FormatGraph,
}

impl Router {
    pub fn new(registry: ConverterRegistry, max_hops: usize) -> Self {
        let graph = FormatGraph::from_registry(&registry, max_hops);
        Self { registry, graph }
    }

    pub fn graph(&self) -> &FormatGraph {
        &self.graph
    }

    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<PathStep>> {
        self.graph.find_path(from, to)
    }

    /// All formats some registered converter touches, sorted.
    pub fn formats(&self) -> Vec<String> {
        self.graph.formats()
    }

    /// Formats reachable from `from` within the hop bound.
    pub fn possible_conversions(&self, from: &str) -> Vec<String> {
        self.graph.reachable_from(from)
    }

    /// Run a planned path, reading `input` and writing the final `output`.
    ///
    /// An empty path is the identity conversion: a plain copy. A failing
    /// step aborts the run with the 1-based step index and its formats;
    /// later steps never run.
    pub async fn execute(&self, path: &[PathStep], input: &Path, output: &Path) -> Result<()> {
        if path.is_empty() {
            // copying a file onto itself would truncate it
            if input != output {
                tokio::fs::copy(input, output).await?;
            }
            return Ok(());
        }

        let scratch = tempfile::tempdir()?;
        let last = path.len() - 1;
        let mut current = input.to_path_buf();

        for (i, step) in path.iter().enumerate() {
            let index = i + 1;
            let converter = self.registry.get(&step.from, &step.to).ok_or_else(|| {
                Error::step(index, &step.from, &step.to, "no converter registered")
            })?;

            let step_output = if i == last {
                output.to_path_buf()
            } else {
                scratch.path().join(format!("step_{index}.{}", step.to))
            };

            tracing::debug!(
                step = index,
                total = path.len(),
                from = %step.from,
                to = %step.to,
                "Running conversion step"
            );

            converter
                .convert(&current, &step_output)
                .await
                .map_err(|e| Error::step(index, &step.from, &step.to, e.to_string()))?;

            current = step_output;
        }

        Ok(())
    }

    /// Convert `input` into `output_format`, writing the result into
    /// `output_dir` as `{stem}.{output_format}`.
    ///
    /// The source format is inferred from the input's extension (lower
    /// cased). Same source and target is a plain copy; an unroutable pair
    /// fails before anything runs.
    pub async fn convert(
        &self,
        input: &Path,
        output_format: &str,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let source_format = input
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                Error::Validation(format!(
                    "cannot infer source format: {} has no extension",
                    input.display()
                ))
            })?;

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let output = output_dir.join(format!("{stem}.{output_format}"));

        let path = self
            .find_path(&source_format, output_format)
            .ok_or_else(|| Error::routing(&source_format, output_format))?;

        tracing::info!(
            from = %source_format,
            to = %output_format,
            steps = path.len(),
            "Converting"
        );

        self.execute(&path, input, &output).await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fr_convert::Converter;
    use std::sync::{Arc, Mutex};

    /// Writes a marker to the output and records where it wrote.
    struct FakeOk {
        from: String,
        to: String,
        outputs: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl FakeOk {
        fn new(from: &str, to: &str, outputs: Arc<Mutex<Vec<PathBuf>>>) -> Self {
            Self {
                from: from.into(),
                to: to.into(),
                outputs,
            }
        }
    }

    #[async_trait]
    impl Converter for FakeOk {
        fn input_format(&self) -> &str {
            &self.from
        }
        fn output_format(&self) -> &str {
            &self.to
        }
        async fn convert(&self, _input: &Path, output: &Path) -> Result<()> {
            tokio::fs::write(output, format!("{}->{}", self.from, self.to)).await?;
            self.outputs.lock().unwrap().push(output.to_path_buf());
            Ok(())
        }
    }

    /// Always fails without producing output.
    struct FakeFail {
        from: String,
        to: String,
    }

    #[async_trait]
    impl Converter for FakeFail {
        fn input_format(&self) -> &str {
            &self.from
        }
        fn output_format(&self) -> &str {
            &self.to
        }
        async fn convert(&self, _input: &Path, _output: &Path) -> Result<()> {
            Err(Error::tool("fake", "synthetic failure"))
        }
    }

    fn write_input(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"ISO-10303-21;").unwrap();
        path
    }

    #[tokio::test]
    async fn identity_conversion_copies() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "part.step");

        let router = Router::new(ConverterRegistry::new(), 3);
        let output = router.convert(&input, "step", dir.path()).await.unwrap();

        assert_eq!(output, dir.path().join("part.step"));
        assert!(output.exists());
    }

    #[tokio::test]
    async fn unroutable_pair_fails_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "part.step");

        let router = Router::new(ConverterRegistry::new(), 3);
        let err = router.convert(&input, "stl", dir.path()).await.unwrap_err();

        assert!(matches!(err, Error::Routing { .. }));
        assert!(!dir.path().join("part.stl").exists());
    }

    #[tokio::test]
    async fn extension_inference_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "Part.STEP");

        let outputs = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(FakeOk::new("step", "stl", outputs)));

        let router = Router::new(registry, 3);
        let output = router.convert(&input, "stl", dir.path()).await.unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn missing_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "noext");

        let router = Router::new(ConverterRegistry::new(), 3);
        let err = router.convert(&input, "stl", dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn two_step_path_runs_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "part.step");

        let outputs = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(FakeOk::new("step", "brep", outputs.clone())));
        registry.register(Arc::new(FakeOk::new("brep", "stl", outputs.clone())));

        let router = Router::new(registry, 3);
        let output = router.convert(&input, "stl", out_dir.path()).await.unwrap();

        assert!(output.exists());
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "brep->stl"
        );

        // the intermediate .brep was written somewhere else and is gone now
        let recorded = outputs.lock().unwrap().clone();
        assert_eq!(recorded.len(), 2);
        let intermediate = &recorded[0];
        assert!(intermediate.to_string_lossy().ends_with(".brep"));
        assert!(!intermediate.exists());
    }

    #[tokio::test]
    async fn failure_at_second_step_aborts_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "part.step");

        let outputs = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(FakeOk::new("step", "brep", outputs.clone())));
        registry.register(Arc::new(FakeFail {
            from: "brep".into(),
            to: "stl".into(),
        }));

        let router = Router::new(registry, 3);
        let err = router.convert(&input, "stl", out_dir.path()).await.unwrap_err();

        match err {
            Error::Step { index, from, to, .. } => {
                assert_eq!(index, 2);
                assert_eq!(from, "brep");
                assert_eq!(to, "stl");
            }
            other => panic!("expected step error, got {other}"),
        }

        // no final output, and the step-1 intermediate is gone
        assert!(!out_dir.path().join("part.stl").exists());
        let recorded = outputs.lock().unwrap().clone();
        assert_eq!(recorded.len(), 1);
        assert!(!recorded[0].exists());
    }

    #[tokio::test]
    async fn unregistered_step_is_a_step_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "part.step");
        let output = dir.path().join("part.stl");

        let router = Router::new(ConverterRegistry::new(), 3);
        let path = vec![PathStep {
            from: "step".into(),
            to: "stl".into(),
        }];
        let err = router.execute(&path, &input, &output).await.unwrap_err();
        assert!(matches!(err, Error::Step { index: 1, .. }));
    }
}
