//! Task dispatch: distributing best-parent selection across witnesses.
//!
//! Two interchangeable modes share the [`Dispatcher`] contract:
//!
//! ```text
//!                  ┌────────────── Direct: rows in order, one at a time
//! rows ─► Dispatcher
//!                  └────────────── Pool: task queue ─► N workers ─► results
//!                                          per-unit barrier, shutdown barrier
//! ```
//!
//! Either way the caller gets back one [`UnitResolution`] per unit, with a
//! parent map for every witness that resolved and the set of those that
//! did not.

pub mod direct;
pub mod pool;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{ParentMap, ParentSelection, Threshold, VariantUnit, WitnessId, WitnessRow};

pub use direct::DirectDispatcher;
pub use pool::{PoolConfig, PoolDispatcher, PoolStats};

/// Error type for dispatcher operations.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Every worker has exited while results were outstanding.
    #[error("Worker pool closed with {outstanding} result(s) outstanding for {unit}")]
    PoolClosed {
        /// Unit being resolved.
        unit: VariantUnit,
        /// Results still missing.
        outstanding: usize,
    },
    /// The dispatcher was used after shutdown.
    #[error("Dispatcher already shut down")]
    AlreadyShutDown,
    /// One or more workers panicked.
    #[error("{0} worker(s) panicked")]
    WorkerPanicked(usize),
}

/// How selection work is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DispatchMode {
    /// Sequentially on the controller.
    Direct,
    /// On a fixed pool of workers.
    Pool {
        /// Number of workers.
        workers: usize,
    },
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Pool { workers } => write!(f, "pool({})", workers),
        }
    }
}

/// Aggregated selection results for one variant unit.
///
/// Keyed by witness id, so aggregation order does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitResolution {
    /// Parent map per resolved witness.
    pub parent_maps: BTreeMap<WitnessId, ParentMap>,
    /// Witnesses with no parent map available.
    pub failed: BTreeSet<WitnessId>,
}

impl UnitResolution {
    /// Create an empty resolution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved witness.
    pub fn resolved(&mut self, witness: WitnessId, parent_map: ParentMap) {
        self.failed.remove(&witness);
        self.parent_maps.insert(witness, parent_map);
    }

    /// Record a witness that could not be resolved.
    pub fn abandoned(&mut self, witness: WitnessId) {
        self.parent_maps.remove(&witness);
        self.failed.insert(witness);
    }

    /// Selection of `witness` at `threshold`, if any.
    pub fn selection(&self, witness: &WitnessId, threshold: Threshold) -> Option<&ParentSelection> {
        self.parent_maps.get(witness).and_then(|m| m.get(threshold))
    }

    /// Number of witnesses accounted for, resolved or not.
    pub fn len(&self) -> usize {
        self.parent_maps.len() + self.failed.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows of `unit` with repeated witnesses removed, keeping the first row of
/// each witness in order.
pub fn unique_rows<'a>(unit: &VariantUnit, rows: &'a [WitnessRow]) -> Vec<&'a WitnessRow> {
    let mut seen: BTreeSet<&'a WitnessId> = BTreeSet::new();
    let mut unique = Vec::with_capacity(rows.len());
    for row in rows {
        if seen.insert(&row.witness) {
            unique.push(row);
        } else {
            tracing::warn!(unit = %unit, witness = %row.witness, "Duplicate witness row ignored");
        }
    }
    unique
}

/// Trait for task dispatchers.
///
/// Both modes resolve the rows returned by [`unique_rows`]: a witness that
/// appears twice is resolved once, from its first row.
///
/// `run` returns only once every row of the unit is accounted for. Units are
/// processed one at a time; `shutdown` releases any workers and must be
/// called after the last unit.
#[async_trait]
pub trait Dispatcher: Send {
    /// Resolve every witness row of `unit` at `thresholds`.
    async fn run(
        &mut self,
        unit: &VariantUnit,
        rows: &[WitnessRow],
        thresholds: &[Threshold],
    ) -> Result<UnitResolution, DispatchError>;

    /// Final barrier: stop and join all workers.
    async fn shutdown(&mut self) -> Result<(), DispatchError>;

    /// The execution mode.
    fn mode(&self) -> DispatchMode;
}
