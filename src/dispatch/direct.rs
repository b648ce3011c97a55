//! Sequential dispatcher.

use async_trait::async_trait;

use crate::coherence::CoherenceProvider;
use crate::selector::BestParentSelector;
use crate::types::{Threshold, VariantUnit, WitnessRow};
use super::{unique_rows, DispatchError, DispatchMode, Dispatcher, UnitResolution};

/// Resolves witnesses one after another on the calling task.
pub struct DirectDispatcher<P: CoherenceProvider> {
    selector: BestParentSelector<P>,
}

impl<P: CoherenceProvider> DirectDispatcher<P> {
    /// Create a direct dispatcher.
    pub fn new(selector: BestParentSelector<P>) -> Self {
        Self { selector }
    }
}

#[async_trait]
impl<P: CoherenceProvider + 'static> Dispatcher for DirectDispatcher<P> {
    async fn run(
        &mut self,
        unit: &VariantUnit,
        rows: &[WitnessRow],
        thresholds: &[Threshold],
    ) -> Result<UnitResolution, DispatchError> {
        let mut resolution = UnitResolution::new();
        let rows = unique_rows(unit, rows);

        for (i, row) in rows.iter().enumerate() {
            tracing::debug!(unit = %unit, witness = %row.witness, "Calculating parents {}/{}", i + 1, rows.len());

            match self.selector.resolve(unit, row, thresholds).await {
                Ok(parent_map) => resolution.resolved(row.witness.clone(), parent_map),
                Err(e) => {
                    tracing::error!(unit = %unit, witness = %row.witness, error = %e, "Parent resolution failed");
                    resolution.abandoned(row.witness.clone());
                }
            }
        }

        Ok(resolution)
    }

    async fn shutdown(&mut self) -> Result<(), DispatchError> {
        Ok(())
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::coherence::StaticCoherenceProvider;
    use crate::types::{Combination, NominalParent, ParentCandidate, WitnessId};

    #[tokio::test]
    async fn test_direct_resolves_all_rows() {
        let t = Threshold::new(3).unwrap();
        let provider = StaticCoherenceProvider::new()
            .with_combinations("B", vec![Combination::new(vec![ParentCandidate::new("A", 1, 1)])])
            .with_failure("C", t);
        let mut dispatcher = DirectDispatcher::new(BestParentSelector::new(Arc::new(provider)));

        let rows = vec![
            WitnessRow::new("A", "a", NominalParent::Initial),
            WitnessRow::new("B", "b", NominalParent::Reading("a".to_string())),
            WitnessRow::new("C", "a", NominalParent::Initial),
        ];

        let resolution = dispatcher.run(&VariantUnit::from("1:1"), &rows, &[t]).await.unwrap();

        assert_eq!(resolution.parent_maps.len(), 2);
        assert!(resolution.failed.contains(&WitnessId::from("C")));
        assert_eq!(dispatcher.mode(), DispatchMode::Direct);
        dispatcher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_rows_resolved_once() {
        let t = Threshold::new(3).unwrap();
        let provider = Arc::new(StaticCoherenceProvider::new());
        let mut dispatcher = DirectDispatcher::new(BestParentSelector::new(Arc::clone(&provider)));

        let rows = vec![
            WitnessRow::new("B", "b", NominalParent::OverlapTop),
            WitnessRow::new("B", "c", NominalParent::Initial),
        ];

        let resolution = dispatcher.run(&VariantUnit::from("1:1"), &rows, &[t]).await.unwrap();

        // The first row wins: its overlap parent yields the synthetic selection
        assert_eq!(resolution.selection(&WitnessId::from("B"), t), Some(&Combination::overlap_parent()));
        assert_eq!(provider.call_count(&WitnessId::from("B")), 1);
    }
}
