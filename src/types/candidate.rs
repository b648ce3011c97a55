//! Parent candidates, combinations and per-threshold parent maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::witness::{Threshold, WitnessId, OL_PARENT};

/// The ancestor a candidate points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ancestor {
    /// A real witness of the same variant unit.
    Witness(WitnessId),
    /// Synthetic initial-text default for the top of an overlapping unit.
    OverlapParent,
    /// The provider found no ancestor for this part of the reading.
    Missing,
}

impl Ancestor {
    /// Whether the ancestor id is null.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// The witness, if the ancestor is a real one.
    pub fn witness(&self) -> Option<&WitnessId> {
        match self {
            Self::Witness(w) => Some(w),
            _ => None,
        }
    }
}

impl fmt::Display for Ancestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Witness(w) => write!(f, "{}", w),
            Self::OverlapParent => f.write_str(OL_PARENT),
            Self::Missing => f.write_str("None"),
        }
    }
}

/// A single potential ancestor for a witness's reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentCandidate {
    /// Ancestor witness.
    pub ancestor: Ancestor,
    /// Closeness rank from the coherence provider, lower is better. `-1` for the
    /// synthetic overlap candidate.
    pub rank: i32,
    /// Derivation steps between the ancestor's reading and this one (>= 1).
    pub generation: u32,
}

impl ParentCandidate {
    /// Candidate pointing at a real witness.
    pub fn new(ancestor: impl Into<WitnessId>, rank: i32, generation: u32) -> Self {
        Self {
            ancestor: Ancestor::Witness(ancestor.into()),
            rank,
            generation,
        }
    }

    /// Candidate with a null ancestor.
    pub fn missing(rank: i32, generation: u32) -> Self {
        Self {
            ancestor: Ancestor::Missing,
            rank,
            generation,
        }
    }

    /// The synthetic `(OL_PARENT, -1, 1)` candidate.
    pub fn overlap_parent() -> Self {
        Self {
            ancestor: Ancestor::OverlapParent,
            rank: -1,
            generation: 1,
        }
    }
}

/// Ordered set of candidates that jointly explain one reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combination(Vec<ParentCandidate>);

/// The combination chosen as best for a (witness, threshold) pair.
///
/// Empty means the witness is an orphan at that threshold.
pub type ParentSelection = Combination;

impl Combination {
    /// Create a combination from candidates, preserving their order.
    pub fn new(candidates: Vec<ParentCandidate>) -> Self {
        Self(candidates)
    }

    /// The empty combination.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// The synthetic overlap-parent selection.
    pub fn overlap_parent() -> Self {
        Self(vec![ParentCandidate::overlap_parent()])
    }

    /// Candidates in provider order.
    pub fn candidates(&self) -> &[ParentCandidate] {
        &self.0
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Worst (highest) rank in the combination.
    pub fn max_rank(&self) -> Option<i32> {
        self.0.iter().map(|c| c.rank).max()
    }

    /// Furthest generation in the combination.
    pub fn max_generation(&self) -> Option<u32> {
        self.0.iter().map(|c| c.generation).max()
    }

    /// True if no candidate names an ancestor (vacuously true when empty).
    pub fn is_root(&self) -> bool {
        self.0.iter().all(|c| c.ancestor.is_missing())
    }

    /// Real ancestor witnesses, in order.
    pub fn ancestor_witnesses(&self) -> impl Iterator<Item = &WitnessId> {
        self.0.iter().filter_map(|c| c.ancestor.witness())
    }
}

impl From<Vec<ParentCandidate>> for Combination {
    fn from(candidates: Vec<ParentCandidate>) -> Self {
        Self(candidates)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({}, {}, {})", c.ancestor, c.rank, c.generation)?;
        }
        f.write_str("]")
    }
}

/// Parent selections for one witness, keyed by threshold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParentMap(BTreeMap<Threshold, ParentSelection>);

impl ParentMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the selection for a threshold.
    pub fn insert(&mut self, threshold: Threshold, selection: ParentSelection) {
        self.0.insert(threshold, selection);
    }

    /// Selection for a threshold.
    pub fn get(&self, threshold: Threshold) -> Option<&ParentSelection> {
        self.0.get(&threshold)
    }

    /// Number of thresholds resolved.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no threshold was resolved.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in ascending threshold order.
    pub fn iter(&self) -> impl Iterator<Item = (&Threshold, &ParentSelection)> {
        self.0.iter()
    }
}
