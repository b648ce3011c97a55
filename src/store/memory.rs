//! In-memory witness source for testing.

use std::collections::BTreeMap;
use async_trait::async_trait;

use crate::types::{VariantUnit, WitnessRow};
use super::WitnessSource;

/// Error type for the in-memory source.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Variant unit not found.
    #[error("Variant unit not found: {0}")]
    UnitNotFound(VariantUnit),
}

/// In-memory witness source.
///
/// Units are listed in insertion order; rows keep the order they were added.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWitnessSource {
    /// Units in insertion order.
    units: Vec<VariantUnit>,
    /// Rows per unit.
    rows: BTreeMap<VariantUnit, Vec<WitnessRow>>,
}

impl InMemoryWitnessSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row to a unit.
    pub fn add_row(&mut self, unit: VariantUnit, row: WitnessRow) {
        if !self.rows.contains_key(&unit) {
            self.units.push(unit.clone());
        }
        self.rows.entry(unit).or_default().push(row);
    }

    /// Add all rows of a unit.
    pub fn with_unit(mut self, unit: impl Into<VariantUnit>, rows: Vec<WitnessRow>) -> Self {
        let unit = unit.into();
        for row in rows {
            self.add_row(unit.clone(), row);
        }
        self
    }

    /// Number of units.
    pub fn num_units(&self) -> usize {
        self.units.len()
    }
}

#[async_trait]
impl WitnessSource for InMemoryWitnessSource {
    type Error = InMemoryError;

    async fn witnesses_for_unit(&self, unit: &VariantUnit) -> Result<Vec<WitnessRow>, Self::Error> {
        self.rows
            .get(unit)
            .cloned()
            .ok_or_else(|| InMemoryError::UnitNotFound(unit.clone()))
    }

    async fn variant_units(&self) -> Result<Vec<VariantUnit>, Self::Error> {
        Ok(self.units.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NominalParent;

    #[tokio::test]
    async fn test_rows_keep_insertion_order() {
        let source = InMemoryWitnessSource::new().with_unit(
            "1:1",
            vec![
                WitnessRow::new("C", "a", NominalParent::Initial),
                WitnessRow::new("A", "a", NominalParent::Initial),
                WitnessRow::new("B", "b", NominalParent::Reading("a".to_string())),
            ],
        );

        let rows = source.witnesses_for_unit(&VariantUnit::from("1:1")).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.witness.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn test_units_in_insertion_order() {
        let source = InMemoryWitnessSource::new()
            .with_unit("2:3", vec![WitnessRow::new("A", "a", NominalParent::Initial)])
            .with_unit("1:1", vec![WitnessRow::new("A", "a", NominalParent::Initial)]);

        let units = source.variant_units().await.unwrap();
        assert_eq!(units, vec![VariantUnit::from("2:3"), VariantUnit::from("1:1")]);
    }

    #[tokio::test]
    async fn test_unknown_unit() {
        let source = InMemoryWitnessSource::new();
        let result = source.witnesses_for_unit(&VariantUnit::from("9:9")).await;
        assert!(matches!(result, Err(InMemoryError::UnitNotFound(_))));
    }
}
