//! SQLite coherence provider over precomputed parent combinations.
//!
//! The combinatorial search runs elsewhere; this provider reads its output
//! from the `parent_combinations` table:
//!
//! ```sql
//! CREATE TABLE parent_combinations (
//!     variant_unit TEXT, witness TEXT, connectivity INTEGER,
//!     combination INTEGER, position INTEGER,
//!     ancestor TEXT NULL, rank INTEGER, generation INTEGER
//! );
//! ```
//!
//! Rows sharing `combination` form one combination, ordered by `position`.
//! A NULL ancestor is a candidate the search could not attribute. A rank
//! outside `i32` or a generation outside `u32` is a decode error; generations
//! below 1 read as 1.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::types::{
    Ancestor, Combination, NominalParent, ParentCandidate, Threshold, VariantUnit, WitnessId,
    OL_PARENT,
};
use super::CoherenceProvider;

/// Coherence provider reading the `parent_combinations` table.
#[derive(Debug, Clone)]
pub struct SqliteCoherenceProvider {
    pool: SqlitePool,
}

impl SqliteCoherenceProvider {
    /// Wrap an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CoherenceProvider for SqliteCoherenceProvider {
    type Error = sqlx::Error;

    async fn parent_combinations(
        &self,
        unit: &VariantUnit,
        witness: &WitnessId,
        _reading: &str,
        _nominal_parent: &NominalParent,
        threshold: Threshold,
    ) -> Result<Vec<Combination>, Self::Error> {
        let rows = sqlx::query(
            r#"
            SELECT combination, ancestor, rank, generation
            FROM parent_combinations
            WHERE variant_unit = ?1 AND witness = ?2 AND connectivity = ?3
            ORDER BY combination, position
            "#,
        )
        .bind(unit.as_str())
        .bind(witness.as_str())
        .bind(i64::from(threshold.get()))
        .fetch_all(&self.pool)
        .await?;

        let mut combinations: Vec<Combination> = Vec::new();
        let mut current: Option<(i64, Vec<ParentCandidate>)> = None;

        for r in &rows {
            let index: i64 = r.try_get("combination")?;
            let ancestor: Option<String> = r.try_get("ancestor")?;
            let rank: i64 = r.try_get("rank")?;
            let generation: i64 = r.try_get("generation")?;
            let rank = i32::try_from(rank).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            let generation = u32::try_from(generation.max(1)).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

            let candidate = ParentCandidate {
                ancestor: match ancestor.as_deref() {
                    None => Ancestor::Missing,
                    Some(OL_PARENT) => Ancestor::OverlapParent,
                    Some(w) => Ancestor::Witness(WitnessId::from(w)),
                },
                rank,
                generation,
            };

            match current.as_mut() {
                Some((i, candidates)) if *i == index => candidates.push(candidate),
                _ => {
                    if let Some((_, candidates)) = current.take() {
                        combinations.push(Combination::new(candidates));
                    }
                    current = Some((index, vec![candidate]));
                }
            }
        }

        if let Some((_, candidates)) = current {
            combinations.push(Combination::new(candidates));
        }

        tracing::trace!(
            unit = %unit,
            witness = %witness,
            threshold = threshold.get(),
            combinations = combinations.len(),
            "Loaded parent combinations"
        );

        Ok(combinations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn provider() -> SqliteCoherenceProvider {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE parent_combinations (
                variant_unit TEXT, witness TEXT, connectivity INTEGER,
                combination INTEGER, position INTEGER,
                ancestor TEXT NULL, rank INTEGER, generation INTEGER
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        SqliteCoherenceProvider::new(pool)
    }

    async fn insert(
        provider: &SqliteCoherenceProvider,
        witness: &str,
        combination: i64,
        position: i64,
        ancestor: Option<&str>,
        rank: i64,
        generation: i64,
    ) {
        sqlx::query("INSERT INTO parent_combinations VALUES ('1:1', ?1, 5, ?2, ?3, ?4, ?5, ?6)")
            .bind(witness)
            .bind(combination)
            .bind(position)
            .bind(ancestor)
            .bind(rank)
            .bind(generation)
            .execute(&provider.pool)
            .await
            .unwrap();
    }

    async fn lookup(provider: &SqliteCoherenceProvider, witness: &str) -> Result<Vec<Combination>, sqlx::Error> {
        provider
            .parent_combinations(
                &VariantUnit::from("1:1"),
                &WitnessId::from(witness),
                "a",
                &NominalParent::Initial,
                Threshold::new(5).unwrap(),
            )
            .await
    }

    #[tokio::test]
    async fn test_rows_group_into_combinations() {
        let provider = provider().await;
        insert(&provider, "B", 1, 1, Some("C"), 2, 1).await;
        insert(&provider, "B", 0, 2, None, 3, 0).await;
        insert(&provider, "B", 0, 1, Some("A"), 1, 1).await;
        insert(&provider, "B", 1, 0, Some(OL_PARENT), -1, 1).await;

        let combinations = lookup(&provider, "B").await.unwrap();

        assert_eq!(combinations.len(), 2);
        assert_eq!(
            combinations[0],
            Combination::new(vec![
                ParentCandidate::new("A", 1, 1),
                ParentCandidate { ancestor: Ancestor::Missing, rank: 3, generation: 1 },
            ])
        );
        assert_eq!(combinations[1].candidates()[0].ancestor, Ancestor::OverlapParent);
        assert_eq!(combinations[1].candidates()[1], ParentCandidate::new("C", 2, 1));
        assert!(lookup(&provider, "Z").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_rank_is_decode_error() {
        let provider = provider().await;
        insert(&provider, "B", 0, 0, Some("A"), 5_000_000_000, 1).await;
        insert(&provider, "C", 0, 0, Some("A"), 1, 5_000_000_000).await;

        assert!(matches!(lookup(&provider, "B").await, Err(sqlx::Error::Decode(_))));
        assert!(matches!(lookup(&provider, "C").await, Err(sqlx::Error::Decode(_))));
    }
}
