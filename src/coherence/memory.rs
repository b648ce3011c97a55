//! Table-driven coherence provider for testing and fixtures.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::{Combination, NominalParent, Threshold, VariantUnit, WitnessId};
use super::CoherenceProvider;

/// Error type for the static provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StaticProviderError {
    /// A failure was configured for this witness and threshold.
    #[error("Coherence unavailable for {witness} at {unit} (connectivity {threshold})")]
    Unavailable {
        /// Variant unit.
        unit: VariantUnit,
        /// Witness.
        witness: WitnessId,
        /// Threshold.
        threshold: Threshold,
    },
}

/// Coherence provider answering from fixed tables.
///
/// Answers are looked up by witness, with per-threshold overrides taking
/// precedence. Unknown witnesses get no combinations. Every call is recorded
/// so tests can check evaluation order.
#[derive(Debug, Default)]
pub struct StaticCoherenceProvider {
    /// Combinations per witness, for every threshold.
    answers: BTreeMap<WitnessId, Vec<Combination>>,
    /// Combinations per witness and threshold.
    overrides: BTreeMap<(WitnessId, Threshold), Vec<Combination>>,
    /// Witness/threshold pairs that fail.
    failures: BTreeSet<(WitnessId, Threshold)>,
    /// Artificial latency per witness.
    delays: BTreeMap<WitnessId, Duration>,
    /// Calls seen, in order.
    calls: Mutex<Vec<(WitnessId, Threshold)>>,
}

impl StaticCoherenceProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `combinations` for `witness` at every threshold.
    pub fn with_combinations(mut self, witness: impl Into<WitnessId>, combinations: Vec<Combination>) -> Self {
        self.answers.insert(witness.into(), combinations);
        self
    }

    /// Answer `combinations` for `witness` at one threshold only.
    pub fn with_threshold_combinations(
        mut self,
        witness: impl Into<WitnessId>,
        threshold: Threshold,
        combinations: Vec<Combination>,
    ) -> Self {
        self.overrides.insert((witness.into(), threshold), combinations);
        self
    }

    /// Fail for `witness` at `threshold`.
    pub fn with_failure(mut self, witness: impl Into<WitnessId>, threshold: Threshold) -> Self {
        self.failures.insert((witness.into(), threshold));
        self
    }

    /// Sleep for `delay` before answering for `witness`.
    pub fn with_delay(mut self, witness: impl Into<WitnessId>, delay: Duration) -> Self {
        self.delays.insert(witness.into(), delay);
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<(WitnessId, Threshold)> {
        self.calls.lock().clone()
    }

    /// Number of calls received for `witness`.
    pub fn call_count(&self, witness: &WitnessId) -> usize {
        self.calls.lock().iter().filter(|(w, _)| w == witness).count()
    }
}

#[async_trait]
impl CoherenceProvider for StaticCoherenceProvider {
    type Error = StaticProviderError;

    async fn parent_combinations(
        &self,
        unit: &VariantUnit,
        witness: &WitnessId,
        _reading: &str,
        _nominal_parent: &NominalParent,
        threshold: Threshold,
    ) -> Result<Vec<Combination>, Self::Error> {
        self.calls.lock().push((witness.clone(), threshold));

        if let Some(delay) = self.delays.get(witness) {
            tokio::time::sleep(*delay).await;
        }

        let key = (witness.clone(), threshold);
        if self.failures.contains(&key) {
            return Err(StaticProviderError::Unavailable {
                unit: unit.clone(),
                witness: witness.clone(),
                threshold,
            });
        }

        Ok(self
            .overrides
            .get(&key)
            .or_else(|| self.answers.get(witness))
            .cloned()
            .unwrap_or_default())
    }
}
