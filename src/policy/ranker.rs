//! Best-combination ranking for parent selection.

use crate::types::{Combination, NominalParent, ParentSelection};

/// Maximum generation a combination may reach: the witness's own reading or
/// its parent's.
pub const DEFAULT_GENERATION_CAP: u32 = 2;

/// Rank and generation of one combination, with its position in provider order.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCombination<'a> {
    /// The scored combination.
    pub combination: &'a Combination,
    /// Worst rank among its candidates.
    pub rank: i32,
    /// Furthest generation among its candidates.
    pub generation: u32,
}

impl<'a> ScoredCombination<'a> {
    /// Score a combination. Returns `None` for an empty one.
    pub fn new(combination: &'a Combination) -> Option<Self> {
        Some(Self {
            combination,
            rank: combination.max_rank()?,
            generation: combination.max_generation()?,
        })
    }
}

/// Running winners of one ranking pass.
#[derive(Debug, Default)]
struct Trackers<'a> {
    by_generation: Option<ScoredCombination<'a>>,
    by_rank: Option<ScoredCombination<'a>>,
}

impl<'a> Trackers<'a> {
    fn offer(&mut self, scored: ScoredCombination<'a>) {
        let better_generation = match &self.by_generation {
            None => true,
            Some(best) => {
                scored.generation < best.generation
                    || (scored.generation == best.generation && scored.rank < best.rank)
            }
        };
        if better_generation {
            self.by_generation = Some(scored);
        }

        let better_rank = match &self.by_rank {
            None => true,
            Some(best) => scored.rank < best.rank,
        };
        if better_rank {
            self.by_rank = Some(scored);
        }
    }

    fn winner(self) -> Option<ScoredCombination<'a>> {
        match self.by_generation {
            // Direct parents are available, prefer them
            Some(best) if best.generation == 1 => Some(best),
            _ => self.by_rank,
        }
    }
}

/// Picks the best parent combination for one witness at one threshold.
///
/// ## Algorithm
///
/// One pass over the combinations in provider order:
///
/// 1. Skip empty combinations
/// 2. Score by `max(rank)` and `max(generation)`; drop anything over the cap
/// 3. Track the best by generation (rank breaks ties) and the best by rank
/// 4. Use the generation winner if it is generation 1, else the rank winner
///
/// Ties keep the earliest combination. State lives only for one call.
#[derive(Debug, Clone, Copy)]
pub struct CombinationRanker {
    generation_cap: u32,
}

impl CombinationRanker {
    /// Create a ranker with a custom generation cap.
    pub fn new(generation_cap: u32) -> Self {
        Self { generation_cap }
    }

    /// The generation cap in force.
    pub fn generation_cap(&self) -> u32 {
        self.generation_cap
    }

    /// Best surviving combination, without the overlap fallback.
    pub fn best<'a>(&self, combinations: &'a [Combination]) -> Option<ScoredCombination<'a>> {
        let mut trackers = Trackers::default();
        for combination in combinations {
            let Some(scored) = ScoredCombination::new(combination) else {
                continue;
            };
            if scored.generation > self.generation_cap {
                continue;
            }
            trackers.offer(scored);
        }
        trackers.winner()
    }

    /// Select the parent combination for a witness.
    ///
    /// When nothing survives and the nominal parent is `OL_PARENT`, the witness
    /// is the top of an overlapping unit with an omission in the initial text,
    /// and gets the synthetic `(OL_PARENT, -1, 1)` selection.
    pub fn select(&self, combinations: &[Combination], nominal_parent: &NominalParent) -> ParentSelection {
        match self.best(combinations) {
            Some(best) => best.combination.clone(),
            None if nominal_parent.is_overlap_top() => Combination::overlap_parent(),
            None => Combination::empty(),
        }
    }
}

impl Default for CombinationRanker {
    fn default() -> Self {
        Self::new(DEFAULT_GENERATION_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParentCandidate;

    fn combo(parts: &[(&str, i32, u32)]) -> Combination {
        Combination::new(
            parts
                .iter()
                .map(|(a, r, g)| ParentCandidate::new(*a, *r, *g))
                .collect(),
        )
    }

    fn reading_parent() -> NominalParent {
        NominalParent::Reading("a".to_string())
    }

    #[test]
    fn test_generation_one_beats_better_rank() {
        let ranker = CombinationRanker::default();
        let combos = vec![combo(&[("B", 1, 2)]), combo(&[("C", 5, 1)])];

        let selected = ranker.select(&combos, &reading_parent());
        assert_eq!(selected, combo(&[("C", 5, 1)]));
    }

    #[test]
    fn test_generation_one_tie_broken_by_rank() {
        let ranker = CombinationRanker::default();
        let combos = vec![
            combo(&[("B", 4, 1)]),
            combo(&[("C", 2, 1)]),
            combo(&[("D", 2, 1)]),
        ];

        // Strictly lower only: D ties C and does not replace it
        let selected = ranker.select(&combos, &reading_parent());
        assert_eq!(selected, combo(&[("C", 2, 1)]));
    }

    #[test]
    fn test_falls_back_to_best_rank_without_direct_parent() {
        let ranker = CombinationRanker::default();
        let combos = vec![combo(&[("B", 6, 2)]), combo(&[("C", 3, 2)])];

        let selected = ranker.select(&combos, &reading_parent());
        assert_eq!(selected, combo(&[("C", 3, 2)]));
    }

    #[test]
    fn test_generation_cap_discards_whole_combination() {
        let ranker = CombinationRanker::default();
        let combos = vec![combo(&[("B", 1, 1), ("C", 1, 3)])];

        assert!(ranker.select(&combos, &reading_parent()).is_empty());
    }

    #[test]
    fn test_multi_candidate_scored_by_maxima() {
        let ranker = CombinationRanker::default();
        let combos = vec![
            combo(&[("B", 1, 1), ("C", 9, 1)]),
            combo(&[("D", 4, 1)]),
        ];

        // First combination scores rank 9, so D wins
        let selected = ranker.select(&combos, &reading_parent());
        assert_eq!(selected, combo(&[("D", 4, 1)]));
    }

    #[test]
    fn test_empty_combinations_are_skipped() {
        let ranker = CombinationRanker::default();
        let combos = vec![Combination::empty(), combo(&[("B", 2, 1)])];

        assert_eq!(ranker.select(&combos, &reading_parent()), combo(&[("B", 2, 1)]));
    }

    #[test]
    fn test_overlap_fallback() {
        let ranker = CombinationRanker::default();

        let selected = ranker.select(&[], &NominalParent::OverlapTop);
        assert_eq!(selected, Combination::overlap_parent());

        let selected = ranker.select(&[Combination::empty()], &NominalParent::Initial);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_no_state_between_calls() {
        let ranker = CombinationRanker::default();
        let loose = vec![combo(&[("B", 1, 1)])];
        let strict = vec![combo(&[("C", 3, 2)])];

        assert_eq!(ranker.select(&loose, &reading_parent()), combo(&[("B", 1, 1)]));
        assert_eq!(ranker.select(&strict, &reading_parent()), combo(&[("C", 3, 2)]));
    }
}
