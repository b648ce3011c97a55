//! Core types for textual flow.

pub mod witness;
pub mod candidate;

pub use witness::{
    NominalParent, Threshold, VariantUnit, WitnessId, WitnessRow,
    INIT, INITIAL_TEXT_WITNESS, OL_PARENT, UNCL,
};
pub use candidate::{Ancestor, Combination, ParentCandidate, ParentMap, ParentSelection};
