//! Artifact naming and existence checks.

use std::path::{Path, PathBuf};

use crate::types::{Threshold, VariantUnit};

/// File name of the diagram for `unit` at `threshold`.
///
/// `B04K1V1/2` at 499 with suffix `_x` gives `textual_flow_B04K1V1_2_c499_x.svg`.
pub fn artifact_name(unit: &VariantUnit, threshold: Threshold, suffix: &str) -> String {
    format!("textual_flow_{}_c{}{}.svg", unit.file_stem(), threshold, suffix)
}

/// Where rendered diagrams are kept.
pub trait ArtifactStore: Send + Sync {
    /// Whether an artifact with this name already exists.
    fn exists(&self, name: &str) -> bool;

    /// Path an artifact with this name is written to.
    fn path_for(&self, name: &str) -> PathBuf;
}

/// Artifacts stored as files in one directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Store artifacts under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
