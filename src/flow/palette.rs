//! Node colours for textual flow diagrams.
//!
//! Readings are coloured by the first letter of their label, so `b` and `b1`
//! share a colour. Letters step through the pastel table ten entries at a
//! time to keep neighbouring readings visually apart.

use serde::{Deserialize, Serialize};

/// Pastel fill colours.
pub const PALETTE: [&str; 28] = [
    "#FF8A8A", "#FF86E3", "#FF86C2", "#FE8BF0", "#EA8DFE", "#DD88FD", "#AD8BFE",
    "#FFA4FF", "#EAA6EA", "#D698FE", "#CEA8F4", "#BCB4F3", "#A9C5EB", "#8CD1E6",
    "#8C8CFF", "#99C7FF", "#99E0FF", "#63E9FC", "#74FEF8", "#62FDCE", "#72FE95",
    "#4AE371", "#80B584", "#89FC63", "#36F200", "#66FF00", "#DFDF00", "#DFE32D",
];

/// Fill for readings whose label does not start with a lowercase ASCII letter.
pub const DEFAULT_FILL: &str = "#cccccc";

/// Palette step between consecutive letters.
pub const PALETTE_STRIDE: usize = 10;

/// Amount subtracted from each channel for the border colour.
pub const DARKEN_BY: u8 = 75;

/// Fill colour for a reading label.
pub fn fill_color(reading: &str) -> &'static str {
    match reading.chars().next() {
        Some(c @ 'a'..='z') => {
            let position = (c as usize) - ('a' as usize);
            PALETTE[(position * PALETTE_STRIDE) % PALETTE.len()]
        }
        _ => DEFAULT_FILL,
    }
}

/// Darken a `#rrggbb` colour by `by` per channel, flooring at zero.
///
/// Returns `None` if `color` is not a `#rrggbb` string.
pub fn darken(color: &str, by: u8) -> Option<String> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);

    Some(format!(
        "#{:02X}{:02X}{:02X}",
        r.saturating_sub(by),
        g.saturating_sub(by),
        b.saturating_sub(by)
    ))
}

/// Graphviz styling of one witness node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeStyle {
    /// Border colour.
    pub color: String,
    /// Fill colour.
    pub fillcolor: String,
    /// Graphviz style.
    pub style: String,
}

impl NodeStyle {
    /// Style for a node attesting `reading`.
    pub fn for_reading(reading: &str) -> Self {
        let fill = fill_color(reading);
        Self {
            color: darken(fill, DARKEN_BY).unwrap_or_else(|| fill.to_string()),
            fillcolor: fill.to_string(),
            style: "filled".to_string(),
        }
    }
}
