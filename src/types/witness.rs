//! Witness, variant unit and threshold types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Witness id of the initial text. It is the only witness allowed to be a root.
pub const INITIAL_TEXT_WITNESS: &str = "A";

/// Nominal parent label for a reading that is the initial text.
pub const INIT: &str = "INIT";

/// Nominal parent label for the top of an overlapping variant unit.
pub const OL_PARENT: &str = "OL_PARENT";

/// Nominal parent label for a reading whose parent is not yet decided.
pub const UNCL: &str = "UNCL";

/// Identifier of a manuscript witness.
///
/// Ordered lexicographically so that aggregated maps iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WitnessId(String);

impl WitnessId {
    /// Create a witness id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the initial-text witness `A`.
    pub fn is_initial_text(&self) -> bool {
        self.0 == INITIAL_TEXT_WITNESS
    }
}

impl fmt::Display for WitnessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WitnessId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WitnessId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a variant unit, e.g. `B04K21V25/47`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantUnit(String);

impl VariantUnit {
    /// Create a variant unit id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form of the id usable inside a file name (`/` replaced by `_`).
    pub fn file_stem(&self) -> String {
        self.0.replace('/', "_")
    }
}

impl fmt::Display for VariantUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariantUnit {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Connectivity threshold: the maximum rank a potential ancestor may have.
///
/// Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Threshold(u32);

impl Threshold {
    /// Create a threshold, rejecting zero.
    pub fn new(value: u32) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// The raw value.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parent reading recorded for a witness's reading in the local stemma.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NominalParent {
    /// No parent recorded.
    Absent,
    /// The reading is the initial text (`INIT`).
    Initial,
    /// Top of an overlapping variant unit (`OL_PARENT`).
    OverlapTop,
    /// Parent not yet decided (`UNCL`).
    Unclear,
    /// Another reading label of the same unit.
    Reading(String),
}

impl NominalParent {
    /// Parse the parent column of a witness row.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None | Some("") => Self::Absent,
            Some(INIT) => Self::Initial,
            Some(OL_PARENT) => Self::OverlapTop,
            Some(UNCL) => Self::Unclear,
            Some(other) => Self::Reading(other.to_string()),
        }
    }

    /// Label as stored by the relational data source.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::Initial => Some(INIT),
            Self::OverlapTop => Some(OL_PARENT),
            Self::Unclear => Some(UNCL),
            Self::Reading(r) => Some(r),
        }
    }

    /// Whether this is the overlapping-unit sentinel.
    pub fn is_overlap_top(&self) -> bool {
        matches!(self, Self::OverlapTop)
    }
}

impl fmt::Display for NominalParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label().unwrap_or("None"))
    }
}

/// One witness at one variant unit, as supplied by the relational data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessRow {
    /// Witness id.
    pub witness: WitnessId,
    /// Reading label attested by the witness (e.g. `a`, `b1`).
    pub reading: String,
    /// Nominal parent of that reading.
    pub parent: NominalParent,
}

impl WitnessRow {
    /// Create a witness row.
    pub fn new(witness: impl Into<WitnessId>, reading: impl Into<String>, parent: NominalParent) -> Self {
        Self {
            witness: witness.into(),
            reading: reading.into(),
            parent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_parent_labels() {
        assert_eq!(NominalParent::from_label(None), NominalParent::Absent);
        assert_eq!(NominalParent::from_label(Some("")), NominalParent::Absent);
        assert_eq!(NominalParent::from_label(Some("INIT")), NominalParent::Initial);
        assert_eq!(NominalParent::from_label(Some("OL_PARENT")), NominalParent::OverlapTop);
        assert_eq!(NominalParent::from_label(Some("UNCL")), NominalParent::Unclear);
        assert_eq!(
            NominalParent::from_label(Some("b")),
            NominalParent::Reading("b".to_string())
        );
        assert_eq!(NominalParent::OverlapTop.as_label(), Some(OL_PARENT));
    }

    #[test]
    fn test_threshold_rejects_zero() {
        assert!(Threshold::new(0).is_none());
        assert_eq!(Threshold::new(499).map(Threshold::get), Some(499));
    }

    #[test]
    fn test_unit_file_stem() {
        let unit = VariantUnit::new("B04K21V25/47");
        assert_eq!(unit.file_stem(), "B04K21V25_47");
    }

    #[test]
    fn test_initial_text_witness() {
        assert!(WitnessId::from("A").is_initial_text());
        assert!(!WitnessId::from("P75").is_initial_text());
    }
}
