//! Relational data sources for witness rows.

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use crate::types::{VariantUnit, WitnessRow};

/// Trait for witness data sources.
///
/// Read-only; safe to share across workers. Implementations must return
/// rows in a stable order.
#[async_trait]
pub trait WitnessSource: Send + Sync {
    /// Error type for source operations.
    type Error: std::error::Error + Send + Sync;

    /// Every (witness, reading, parent) row of a variant unit.
    async fn witnesses_for_unit(&self, unit: &VariantUnit) -> Result<Vec<WitnessRow>, Self::Error>;

    /// All variant units known to the source.
    async fn variant_units(&self) -> Result<Vec<VariantUnit>, Self::Error>;
}

pub use memory::InMemoryWitnessSource;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConfig, SqliteWitnessSource};
