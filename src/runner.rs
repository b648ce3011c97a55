//! Top-level textual flow run.
//!
//! For every requested variant unit:
//!
//! ```text
//! artifacts present? ─► rows ─► Dispatcher::run (barrier) ─► per threshold:
//!                                                           build ─► render
//! ```
//!
//! Units are processed one after another. After the last unit the dispatcher
//! is shut down, on the error path as well.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::artifact::{artifact_name, ArtifactStore};
use crate::dispatch::{DispatchError, DispatchMode, Dispatcher};
use crate::flow::FlowGraphBuilder;
use crate::render::DiagramRenderer;
use crate::store::WitnessSource;
use crate::types::{Threshold, VariantUnit, WitnessId};

/// Error type for a run.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// No threshold was requested.
    #[error("No connectivity thresholds given")]
    NoThresholds,
    /// The data source could not list variant units.
    #[error("Data source error: {0}")]
    Source(String),
    /// The dispatcher failed; the run cannot continue.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl FlowError {
    /// Create a source error from any error type.
    pub fn from_source<E: std::error::Error>(e: E) -> Self {
        Self::Source(e.to_string())
    }
}

/// Which variant units to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitSelection {
    /// Every unit the data source knows.
    All,
    /// The named units, in order.
    Named(Vec<VariantUnit>),
}

/// Parameters of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRequest {
    /// Units to process.
    pub units: UnitSelection,
    /// Connectivity thresholds, in caller order.
    pub thresholds: Vec<Threshold>,
    /// Fail a (unit, threshold) on any orphan other than the initial text.
    pub perfect_only: bool,
    /// Appended to artifact names before the extension.
    pub suffix: String,
}

impl FlowRequest {
    /// Request for `units` at `thresholds`, lenient, no suffix.
    pub fn new(units: UnitSelection, thresholds: Vec<Threshold>) -> Self {
        Self {
            units,
            thresholds,
            perfect_only: false,
            suffix: String::new(),
        }
    }

    /// Set strict mode.
    pub fn with_perfect_only(mut self, perfect_only: bool) -> Self {
        self.perfect_only = perfect_only;
        self
    }

    /// Set the artifact name suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

/// What happened to one (unit, threshold) artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Rendered to this path.
    Written(PathBuf),
    /// Already present at this path.
    Skipped(PathBuf),
    /// Strict mode found an orphan.
    ForestViolation(String),
    /// The renderer failed.
    RenderFailed(String),
    /// The unit's rows could not be read.
    UnitFailed(String),
    /// The data source does not know the unit.
    UnknownUnit,
}

/// Outcome of one (unit, threshold).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactOutcome {
    /// Variant unit.
    pub unit: VariantUnit,
    /// Threshold.
    pub threshold: Threshold,
    /// Result.
    pub status: ArtifactStatus,
}

/// Summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// How selection work was executed.
    pub mode: DispatchMode,
    /// One entry per (unit, threshold), in processing order.
    pub outcomes: Vec<ArtifactOutcome>,
    /// Witnesses whose parents could not be resolved, per unit.
    pub failed_witnesses: BTreeMap<VariantUnit, BTreeSet<WitnessId>>,
}

impl RunSummary {
    fn new(mode: DispatchMode) -> Self {
        Self {
            mode,
            outcomes: Vec::new(),
            failed_witnesses: BTreeMap::new(),
        }
    }

    fn record(&mut self, unit: &VariantUnit, threshold: Threshold, status: ArtifactStatus) {
        self.outcomes.push(ArtifactOutcome {
            unit: unit.clone(),
            threshold,
            status,
        });
    }

    /// Paths of artifacts written in this run.
    pub fn written(&self) -> Vec<&PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                ArtifactStatus::Written(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Outcome for a (unit, threshold).
    pub fn outcome(&self, unit: &str, threshold: u32) -> Option<&ArtifactStatus> {
        self.outcomes
            .iter()
            .find(|o| o.unit.as_str() == unit && o.threshold.get() == threshold)
            .map(|o| &o.status)
    }

    /// Number of outcomes that are not `Written` or `Skipped`.
    pub fn error_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.status, ArtifactStatus::Written(_) | ArtifactStatus::Skipped(_)))
            .count()
    }
}

/// Textual flow runner.
///
/// Owns its collaborators for the length of one run; [`TextualFlow::run`]
/// consumes it because the dispatcher is shut down at the end.
pub struct TextualFlow<S: WitnessSource> {
    source: S,
    dispatcher: Box<dyn Dispatcher>,
    renderer: Box<dyn DiagramRenderer>,
    artifacts: Box<dyn ArtifactStore>,
}

impl<S: WitnessSource> TextualFlow<S> {
    /// Create a runner.
    pub fn new(
        source: S,
        dispatcher: Box<dyn Dispatcher>,
        renderer: Box<dyn DiagramRenderer>,
        artifacts: Box<dyn ArtifactStore>,
    ) -> Self {
        Self {
            source,
            dispatcher,
            renderer,
            artifacts,
        }
    }

    /// Process every requested unit, then shut the dispatcher down.
    pub async fn run(mut self, request: &FlowRequest) -> Result<RunSummary, FlowError> {
        let mut summary = RunSummary::new(self.dispatcher.mode());

        let result = self.run_units(request, &mut summary).await;
        let shutdown = self.dispatcher.shutdown().await;
        result?;
        shutdown?;

        tracing::info!(
            mode = %summary.mode,
            outcomes = summary.outcomes.len(),
            written = summary.written().len(),
            errors = summary.error_count(),
            "Textual flow run complete"
        );
        Ok(summary)
    }

    async fn run_units(&mut self, request: &FlowRequest, summary: &mut RunSummary) -> Result<(), FlowError> {
        let thresholds = dedup_thresholds(&request.thresholds);
        if thresholds.is_empty() {
            return Err(FlowError::NoThresholds);
        }

        let known = self.source.variant_units().await.map_err(FlowError::from_source)?;
        let units = match &request.units {
            UnitSelection::All => known.clone(),
            UnitSelection::Named(units) => units.clone(),
        };
        let known: BTreeSet<VariantUnit> = known.into_iter().collect();
        let builder = FlowGraphBuilder::new(request.perfect_only);

        tracing::info!(
            units = units.len(),
            thresholds = thresholds.len(),
            perfect_only = request.perfect_only,
            mode = %self.dispatcher.mode(),
            "Starting textual flow run"
        );

        for unit in &units {
            if !known.contains(unit) {
                tracing::error!(unit = %unit, "Unknown variant unit");
                for &threshold in &thresholds {
                    summary.record(unit, threshold, ArtifactStatus::UnknownUnit);
                }
                continue;
            }

            let mut pending = Vec::with_capacity(thresholds.len());
            for &threshold in &thresholds {
                let name = artifact_name(unit, threshold, &request.suffix);
                if self.artifacts.exists(&name) {
                    let path = self.artifacts.path_for(&name);
                    tracing::info!(unit = %unit, threshold = threshold.get(), path = %path.display(), "Artifact already exists, skipping");
                    summary.record(unit, threshold, ArtifactStatus::Skipped(path));
                } else {
                    pending.push(threshold);
                }
            }
            if pending.is_empty() {
                continue;
            }

            let rows = match self.source.witnesses_for_unit(unit).await {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::error!(unit = %unit, error = %e, "Couldn't read witnesses, skipping unit");
                    for &threshold in &pending {
                        summary.record(unit, threshold, ArtifactStatus::UnitFailed(e.to_string()));
                    }
                    continue;
                }
            };

            tracing::info!(unit = %unit, witnesses = rows.len(), "Processing variant unit");
            let resolution = self.dispatcher.run(unit, &rows, &pending).await?;
            if !resolution.failed.is_empty() {
                summary
                    .failed_witnesses
                    .insert(unit.clone(), resolution.failed.clone());
            }

            for threshold in pending {
                let graph = match builder.build(unit, threshold, &rows, &resolution.parent_maps) {
                    Ok(graph) => graph,
                    Err(e) => {
                        tracing::error!(unit = %unit, threshold = threshold.get(), error = %e, "Forest violation");
                        summary.record(unit, threshold, ArtifactStatus::ForestViolation(e.to_string()));
                        continue;
                    }
                };

                let path = self
                    .artifacts
                    .path_for(&artifact_name(unit, threshold, &request.suffix));
                match self.renderer.render(&graph, &path).await {
                    Ok(()) => {
                        tracing::info!(unit = %unit, threshold = threshold.get(), path = %path.display(), "Written textual flow diagram");
                        summary.record(unit, threshold, ArtifactStatus::Written(path));
                    }
                    Err(e) => {
                        tracing::error!(unit = %unit, threshold = threshold.get(), error = %e, "Rendering failed");
                        summary.record(unit, threshold, ArtifactStatus::RenderFailed(e.to_string()));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Drop repeated thresholds, keeping first occurrences in order.
fn dedup_thresholds(thresholds: &[Threshold]) -> Vec<Threshold> {
    let mut seen = BTreeSet::new();
    thresholds.iter().copied().filter(|t| seen.insert(*t)).collect()
}
