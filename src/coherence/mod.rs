//! Coherence data providers.
//!
//! A provider answers: which combinations of ancestors could explain this
//! witness's reading at this connectivity threshold? How it searches is its
//! own business; callers only rely on the order of the returned list.

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use crate::types::{Combination, NominalParent, Threshold, VariantUnit, WitnessId};

/// Trait for coherence data providers.
///
/// Implementations must return combinations in a stable order: the ranker
/// keeps the earliest combination on ties.
#[async_trait]
pub trait CoherenceProvider: Send + Sync {
    /// Error type for provider operations.
    type Error: std::error::Error + Send + Sync;

    /// Candidate ancestor combinations for `witness` at `unit`.
    async fn parent_combinations(
        &self,
        unit: &VariantUnit,
        witness: &WitnessId,
        reading: &str,
        nominal_parent: &NominalParent,
        threshold: Threshold,
    ) -> Result<Vec<Combination>, Self::Error>;
}

pub use memory::StaticCoherenceProvider;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCoherenceProvider;
