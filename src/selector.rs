//! Best-parent selection for one witness across thresholds.
//!
//! For each threshold the selector asks the coherence provider for candidate
//! ancestor combinations and lets the ranker pick one.

use std::sync::Arc;

use crate::coherence::CoherenceProvider;
use crate::policy::CombinationRanker;
use crate::types::{ParentMap, Threshold, VariantUnit, WitnessId, WitnessRow};

/// Error type for selector operations.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// The coherence provider failed; the whole witness is abandoned.
    #[error("Couldn't get parent combinations for {witness} at {unit} (connectivity {threshold}): {message}")]
    Provider {
        /// Variant unit.
        unit: VariantUnit,
        /// Witness being resolved.
        witness: WitnessId,
        /// Threshold that failed.
        threshold: Threshold,
        /// Provider error text.
        message: String,
    },
}

impl SelectorError {
    /// Create a provider error from any error type.
    pub fn from_provider<E: std::error::Error>(
        unit: &VariantUnit,
        witness: &WitnessId,
        threshold: Threshold,
        e: E,
    ) -> Self {
        Self::Provider {
            unit: unit.clone(),
            witness: witness.clone(),
            threshold,
            message: e.to_string(),
        }
    }

    /// The witness the error belongs to.
    pub fn witness(&self) -> &WitnessId {
        match self {
            Self::Provider { witness, .. } => witness,
        }
    }
}

/// Resolves the best parents of a witness at every requested threshold.
///
/// ## Algorithm
///
/// For each threshold, in caller order:
///
/// 1. Fetch candidate combinations from the coherence provider
/// 2. Rank them (fresh ranker state per threshold)
/// 3. Record the selection in the parent map
///
/// A provider failure at any threshold aborts the witness: no partial map is
/// returned.
pub struct BestParentSelector<P: CoherenceProvider> {
    provider: Arc<P>,
    ranker: CombinationRanker,
}

impl<P: CoherenceProvider> Clone for BestParentSelector<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            ranker: self.ranker,
        }
    }
}

impl<P: CoherenceProvider> BestParentSelector<P> {
    /// Create a selector with the default ranker.
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_ranker(provider, CombinationRanker::default())
    }

    /// Create a selector with a custom ranker.
    pub fn with_ranker(provider: Arc<P>, ranker: CombinationRanker) -> Self {
        Self { provider, ranker }
    }

    /// Resolve the parent map of one witness row.
    pub async fn resolve(
        &self,
        unit: &VariantUnit,
        row: &WitnessRow,
        thresholds: &[Threshold],
    ) -> Result<ParentMap, SelectorError> {
        tracing::info!(unit = %unit, witness = %row.witness, "Getting best parent(s)");

        let mut parent_map = ParentMap::new();
        for &threshold in thresholds {
            let combinations = self
                .provider
                .parent_combinations(unit, &row.witness, &row.reading, &row.parent, threshold)
                .await
                .map_err(|e| SelectorError::from_provider(unit, &row.witness, threshold, e))?;

            tracing::debug!(
                unit = %unit,
                witness = %row.witness,
                threshold = threshold.get(),
                combinations = combinations.len(),
                "Searching parent combinations"
            );

            let selection = self.ranker.select(&combinations, &row.parent);
            if selection.is_empty() {
                tracing::info!(
                    unit = %unit,
                    witness = %row.witness,
                    reading = %row.reading,
                    threshold = threshold.get(),
                    "Couldn't find any parent combination"
                );
            } else {
                tracing::info!(
                    unit = %unit,
                    witness = %row.witness,
                    threshold = threshold.get(),
                    parents = %selection,
                    "Found best parents"
                );
            }

            parent_map.insert(threshold, selection);
        }

        Ok(parent_map)
    }

    /// The ranker in use.
    pub fn ranker(&self) -> &CombinationRanker {
        &self.ranker
    }

    /// The coherence provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coherence::StaticCoherenceProvider;
    use crate::types::{Combination, NominalParent, ParentCandidate};

    fn threshold(v: u32) -> Threshold {
        Threshold::new(v).unwrap()
    }

    fn single(ancestor: &str, rank: i32, generation: u32) -> Vec<Combination> {
        vec![Combination::new(vec![ParentCandidate::new(ancestor, rank, generation)])]
    }

    #[tokio::test]
    async fn test_one_selection_per_threshold() {
        let provider = StaticCoherenceProvider::new()
            .with_combinations("B", single("A", 1, 1))
            .with_threshold_combinations("B", threshold(1), vec![]);
        let selector = BestParentSelector::new(Arc::new(provider));
        let row = WitnessRow::new("B", "b", NominalParent::Reading("a".to_string()));

        let map = selector
            .resolve(&VariantUnit::from("1:1"), &row, &[threshold(1), threshold(3), threshold(5)])
            .await
            .unwrap();

        assert_eq!(map.len(), 3);
        assert!(map.get(threshold(1)).unwrap().is_empty());
        assert_eq!(map.get(threshold(3)).unwrap(), &single("A", 1, 1)[0]);
    }

    #[tokio::test]
    async fn test_thresholds_evaluated_in_caller_order() {
        let provider = Arc::new(StaticCoherenceProvider::new());
        let selector = BestParentSelector::new(Arc::clone(&provider));
        let row = WitnessRow::new("B", "b", NominalParent::Initial);

        selector
            .resolve(&VariantUnit::from("1:1"), &row, &[threshold(5), threshold(2)])
            .await
            .unwrap();

        let order: Vec<_> = provider.calls().into_iter().map(|(_, t)| t.get()).collect();
        assert_eq!(order, vec![5, 2]);
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_witness() {
        let provider = Arc::new(
            StaticCoherenceProvider::new()
                .with_combinations("B", single("A", 1, 1))
                .with_failure("B", threshold(3)),
        );
        let selector = BestParentSelector::new(Arc::clone(&provider));
        let row = WitnessRow::new("B", "b", NominalParent::Initial);

        let result = selector
            .resolve(&VariantUnit::from("1:1"), &row, &[threshold(1), threshold(3), threshold(5)])
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.witness().as_str(), "B");
        // Stops at the failing threshold
        assert_eq!(provider.call_count(&WitnessId::from("B")), 2);
    }

    #[tokio::test]
    async fn test_overlap_fallback_per_threshold() {
        let provider = StaticCoherenceProvider::new();
        let selector = BestParentSelector::new(Arc::new(provider));
        let row = WitnessRow::new("C", "a", NominalParent::OverlapTop);

        let map = selector
            .resolve(&VariantUnit::from("1:1"), &row, &[threshold(3)])
            .await
            .unwrap();

        assert_eq!(map.get(threshold(3)).unwrap(), &Combination::overlap_parent());
    }
}
