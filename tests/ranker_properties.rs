//! Property tests for combination ranking.

use proptest::prelude::*;
use textual_flow::{Combination, CombinationRanker, NominalParent, ParentCandidate};

fn arb_candidate() -> impl Strategy<Value = ParentCandidate> {
    (prop_oneof![Just("A"), Just("P1"), Just("P2"), Just("P3")], 1i32..10, 1u32..5)
        .prop_map(|(ancestor, rank, generation)| ParentCandidate::new(ancestor, rank, generation))
}

fn arb_combination() -> impl Strategy<Value = Combination> {
    prop::collection::vec(arb_candidate(), 0..4).prop_map(Combination::new)
}

fn arb_combinations() -> impl Strategy<Value = Vec<Combination>> {
    prop::collection::vec(arb_combination(), 0..8)
}

fn arb_nominal_parent() -> impl Strategy<Value = NominalParent> {
    prop_oneof![
        Just(NominalParent::Absent),
        Just(NominalParent::Initial),
        Just(NominalParent::OverlapTop),
        Just(NominalParent::Reading("a".to_string())),
    ]
}

/// (index, rank, generation) of every non-empty combination within the cap.
fn survivors(combinations: &[Combination]) -> Vec<(usize, i32, u32)> {
    combinations
        .iter()
        .enumerate()
        .filter_map(|(i, c)| Some((i, c.max_rank()?, c.max_generation()?)))
        .filter(|&(_, _, generation)| generation <= 2)
        .collect()
}

/// First survivor with the lowest rank among `pool`.
fn first_min_rank(pool: &[(usize, i32, u32)]) -> Option<usize> {
    let min = pool.iter().map(|&(_, rank, _)| rank).min()?;
    pool.iter().find(|&&(_, rank, _)| rank == min).map(|&(i, _, _)| i)
}

proptest! {
    #[test]
    fn generation_one_wins_when_present(combinations in arb_combinations()) {
        let survivors = survivors(&combinations);
        let first_generation: Vec<_> = survivors.iter().copied().filter(|&(_, _, g)| g == 1).collect();
        prop_assume!(!first_generation.is_empty());

        let selection = CombinationRanker::default().select(&combinations, &NominalParent::Absent);

        prop_assert_eq!(selection.max_generation(), Some(1));
        let expected = first_min_rank(&first_generation).unwrap();
        prop_assert_eq!(&selection, &combinations[expected]);
    }

    #[test]
    fn lowest_rank_wins_without_generation_one(combinations in arb_combinations()) {
        let survivors = survivors(&combinations);
        prop_assume!(!survivors.is_empty());
        prop_assume!(survivors.iter().all(|&(_, _, g)| g != 1));

        let selection = CombinationRanker::default().select(&combinations, &NominalParent::Absent);

        let expected = first_min_rank(&survivors).unwrap();
        prop_assert_eq!(&selection, &combinations[expected]);
    }

    #[test]
    fn selection_never_exceeds_cap(
        combinations in arb_combinations(),
        parent in arb_nominal_parent(),
    ) {
        let selection = CombinationRanker::default().select(&combinations, &parent);

        if survivors(&combinations).is_empty() {
            if parent.is_overlap_top() {
                prop_assert_eq!(selection, Combination::overlap_parent());
            } else {
                prop_assert!(selection.is_empty());
            }
        } else {
            prop_assert!(selection.max_generation().unwrap() <= 2);
            prop_assert!(combinations.contains(&selection));
        }
    }

    #[test]
    fn select_is_stateless(
        first in arb_combinations(),
        second in arb_combinations(),
        parent in arb_nominal_parent(),
    ) {
        let ranker = CombinationRanker::default();
        let fresh = CombinationRanker::default().select(&second, &parent);

        let _ = ranker.select(&first, &parent);
        prop_assert_eq!(ranker.select(&second, &parent), fresh);
    }
}
