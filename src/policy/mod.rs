//! Parent selection policy.

pub mod ranker;

pub use ranker::{CombinationRanker, ScoredCombination, DEFAULT_GENERATION_CAP};
