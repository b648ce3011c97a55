//! # textual-flow
//!
//! Best-parent selection and textual flow diagrams for coherence-based
//! genealogical analysis.
//!
//! A textual flow diagram answers, for one variant unit and one connectivity
//! threshold: which witness did each witness most plausibly inherit its
//! reading from?
//!
//! ## Architecture
//!
//! ```text
//! WitnessSource → rows → Dispatcher ─┬─ BestParentSelector ─ CoherenceProvider
//!                                    │          └─ CombinationRanker
//!                                    ↓
//!                              UnitResolution → FlowGraphBuilder → DiagramRenderer
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Providers return combinations in a stable order and ties keep the first
//! - Parent maps are keyed by witness id, so worker completion order is irrelevant
//! - Identical inputs give identical graph fingerprints

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod canonical;
pub mod coherence;
pub mod config;
pub mod dispatch;
pub mod flow;
pub mod policy;
pub mod render;
pub mod runner;
pub mod selector;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use artifact::{artifact_name, ArtifactStore, FsArtifactStore};
pub use coherence::{CoherenceProvider, StaticCoherenceProvider};
pub use config::{ConfigError, FlowConfig, RendererKind};
pub use dispatch::{
    DirectDispatcher, DispatchError, DispatchMode, Dispatcher, PoolConfig, PoolDispatcher, PoolStats,
    UnitResolution,
};
pub use flow::{FlowGraph, FlowGraphBuilder, ForestError};
pub use policy::CombinationRanker;
pub use render::{DiagramRenderer, DotRenderer, GraphvizRenderer, RenderError};
pub use runner::{ArtifactOutcome, ArtifactStatus, FlowError, FlowRequest, RunSummary, TextualFlow, UnitSelection};
pub use selector::{BestParentSelector, SelectorError};
pub use store::{InMemoryWitnessSource, WitnessSource};
pub use types::*;

#[cfg(feature = "sqlite")]
pub use coherence::SqliteCoherenceProvider;
#[cfg(feature = "sqlite")]
pub use store::{SqliteConfig, SqliteWitnessSource};
