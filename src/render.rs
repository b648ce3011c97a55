//! Diagram rendering.
//!
//! The renderer turns a [`FlowGraph`] into an artifact on disk. The default
//! pipes DOT text to the Graphviz `dot` program for SVG output; [`DotRenderer`]
//! writes the DOT text itself and needs no external tools.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::flow::{to_dot, FlowGraph};

/// Error type for rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Spawning the renderer or writing the artifact failed.
    #[error("Rendering to {path} failed: {source}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The renderer exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    ExitStatus {
        /// Renderer program.
        program: String,
        /// Exit status.
        status: std::process::ExitStatus,
        /// Captured standard error.
        stderr: String,
    },
}

impl RenderError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Trait for diagram renderers.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Render `graph` to `path`.
    async fn render(&self, graph: &FlowGraph, path: &Path) -> Result<(), RenderError>;
}

/// Renders SVG via the Graphviz `dot` program.
#[derive(Debug, Clone)]
pub struct GraphvizRenderer {
    program: String,
    format: String,
}

impl Default for GraphvizRenderer {
    fn default() -> Self {
        Self {
            program: "dot".to_string(),
            format: "svg".to_string(),
        }
    }
}

impl GraphvizRenderer {
    /// Create a renderer using `dot` on the `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific Graphviz layout program.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The program invoked.
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl DiagramRenderer for GraphvizRenderer {
    async fn render(&self, graph: &FlowGraph, path: &Path) -> Result<(), RenderError> {
        let dot = to_dot(graph);

        let mut child = Command::new(&self.program)
            .arg(format!("-T{}", self.format))
            .arg("-o")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::io(path, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(dot.as_bytes())
                .await
                .map_err(|e| RenderError::io(path, e))?;
            // Close stdin so dot sees EOF
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RenderError::io(path, e))?;

        if !output.status.success() {
            return Err(RenderError::ExitStatus {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!(path = %path.display(), program = %self.program, "Rendered diagram");
        Ok(())
    }
}

/// Writes the DOT source instead of rendering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotRenderer;

#[async_trait]
impl DiagramRenderer for DotRenderer {
    async fn render(&self, graph: &FlowGraph, path: &Path) -> Result<(), RenderError> {
        tokio::fs::write(path, to_dot(graph))
            .await
            .map_err(|e| RenderError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::flow::FlowGraphBuilder;
    use crate::types::{NominalParent, Threshold, VariantUnit, WitnessRow};

    fn lone_graph() -> FlowGraph {
        let rows = vec![WitnessRow::new("A", "a", NominalParent::Absent)];
        FlowGraphBuilder::new(true)
            .build(&VariantUnit::from("1:1"), Threshold::new(3).unwrap(), &rows, &BTreeMap::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_dot_renderer_writes_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.dot");

        DotRenderer.render(&lone_graph(), &path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"A (a)\""));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = GraphvizRenderer::new().with_program("textual-flow-no-such-renderer");

        let err = renderer
            .render(&lone_graph(), &dir.path().join("flow.svg"))
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Io { .. }));
    }
}
